//! WebSocket transport session.
//!
//! # State Machine
//!
//! ```text
//!            connect()            handshake ok
//!   Idle ───────────────► Connecting ──────────► Open
//!    ▲                        │                   │ │
//!    └──── handshake failed ──┘                   │ │ remote close / stream error
//!                             │ disconnect()      │ ▼
//!                             └──────────────► Closed ◄── Closing ◄── disconnect()
//! ```
//!
//! `Closed` is terminal: a session is used for exactly one connection.
//!
//! # Cancellation
//!
//! [`TransportSession::disconnect`] may run concurrently with a pending
//! [`TransportSession::receive`]. The receive is woken through a close signal
//! and returns `Ok(None)`. The same signal cancels in-flight writes, so a peer
//! that stops reading cannot keep the session in `Closing`.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::net::TcpStream;
use tokio::sync::{Mutex as AsyncMutex, watch};
use tokio::time::{Instant, interval_at, timeout};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::error::CapacityError;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::http::header::{
    COOKIE, ORIGIN, SEC_WEBSOCKET_PROTOCOL, USER_AGENT,
};
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;
use tokio_tungstenite::tungstenite::protocol::frame::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async_with_config};
use tracing::{debug, info, trace, warn};

use crate::config::constants::{DEFAULT_BUFFER_SIZE, KEEP_ALIVE_INTERVAL, SUB_PROTOCOL};
use crate::error::{Error, Result};

use super::frame::RawFrame;

// ============================================================================
// Constants
// ============================================================================

/// Upper bound for sending the close frame.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

// ============================================================================
// Types
// ============================================================================

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsWriter = SplitSink<WsStream, Message>;
type WsReader = SplitStream<WsStream>;

// ============================================================================
// SessionState
// ============================================================================

/// Lifecycle state of a [`TransportSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Created, never connected.
    Idle,
    /// Handshake in progress.
    Connecting,
    /// Connected.
    Open,
    /// Local close in progress.
    Closing,
    /// Terminal.
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Closing => "closing",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}

// ============================================================================
// Handshake
// ============================================================================

/// Headers and limits for one connection handshake.
#[derive(Debug, Clone)]
pub struct Handshake {
    /// Accumulated session cookies as one `Cookie` header value.
    pub cookies: Option<String>,
    /// Client identity.
    pub user_agent: String,
    /// `Origin` header.
    pub origin: String,
    /// Upper bound for the whole handshake.
    pub timeout: Duration,
}

// ============================================================================
// TransportSession
// ============================================================================

/// One WebSocket connection with an explicit lifecycle.
pub struct TransportSession {
    state: Arc<Mutex<SessionState>>,
    writer: Arc<AsyncMutex<Option<WsWriter>>>,
    reader: AsyncMutex<Option<WsReader>>,
    close_tx: watch::Sender<bool>,
    buffer_size: usize,
    keep_alive: Duration,
}

impl fmt::Debug for TransportSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportSession")
            .field("state", &self.state())
            .field("buffer_size", &self.buffer_size)
            .field("keep_alive", &self.keep_alive)
            .finish_non_exhaustive()
    }
}

impl Default for TransportSession {
    fn default() -> Self {
        Self::new(DEFAULT_BUFFER_SIZE)
    }
}

// ============================================================================
// TransportSession - Constructors
// ============================================================================

impl TransportSession {
    /// Creates an idle session with a fixed receive buffer size.
    #[must_use]
    pub fn new(buffer_size: usize) -> Self {
        let (close_tx, _) = watch::channel(false);

        Self {
            state: Arc::new(Mutex::new(SessionState::Idle)),
            writer: Arc::new(AsyncMutex::new(None)),
            reader: AsyncMutex::new(None),
            close_tx,
            buffer_size,
            keep_alive: KEEP_ALIVE_INTERVAL,
        }
    }

    /// Overrides the keep-alive ping interval.
    #[inline]
    #[must_use]
    pub fn with_keep_alive(mut self, interval: Duration) -> Self {
        self.keep_alive = interval;
        self
    }
}

// ============================================================================
// TransportSession - Accessors
// ============================================================================

impl TransportSession {
    /// Returns the current state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> SessionState {
        *self.state.lock()
    }

    /// Returns `true` iff the session is `Open`.
    #[inline]
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state() == SessionState::Open
    }

    /// Returns the receive buffer size.
    #[inline]
    #[must_use]
    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }
}

// ============================================================================
// TransportSession - Lifecycle
// ============================================================================

impl TransportSession {
    /// Performs the connection handshake.
    ///
    /// The handshake offers the `echo-protocol` sub-protocol and carries the
    /// cookie, `User-Agent` and `Origin` headers from `handshake`.
    ///
    /// # Errors
    ///
    /// - [`Error::AlreadyConnected`] if the session is connecting or open
    /// - [`Error::InvalidState`] if the session is closed
    /// - [`Error::ConnectFailure`] if the handshake is rejected, times out, or
    ///   is interrupted by [`disconnect`](Self::disconnect)
    pub async fn connect(&self, url: &str, handshake: &Handshake) -> Result<()> {
        {
            let mut state = self.state.lock();
            match *state {
                SessionState::Idle => *state = SessionState::Connecting,
                SessionState::Closed => {
                    return Err(Error::invalid_state("connect", SessionState::Closed));
                }
                _ => return Err(Error::AlreadyConnected),
            }
        }

        debug!(url, "Opening transport");

        let request = match build_request(url, handshake) {
            Ok(request) => request,
            Err(e) => {
                self.revert_to_idle();
                return Err(e);
            }
        };

        let config = WebSocketConfig::default()
            .max_message_size(Some(self.buffer_size))
            .max_frame_size(Some(self.buffer_size));

        let mut close_rx = self.close_tx.subscribe();
        let outcome = tokio::select! {
            result = timeout(handshake.timeout, connect_async_with_config(request, Some(config), false)) => Some(result),
            () = wait_closed(&mut close_rx) => None,
        };

        let stream = match outcome {
            None => {
                return Err(Error::connect_failure(url, "disconnected during handshake"));
            }
            Some(Err(_)) => {
                self.revert_to_idle();
                return Err(Error::connect_failure(
                    url,
                    format!("handshake timed out after {:?}", handshake.timeout),
                ));
            }
            Some(Ok(Err(e))) => {
                self.revert_to_idle();
                warn!(url, error = %e, "Transport handshake failed");
                return Err(Error::connect_failure(url, e.to_string()));
            }
            Some(Ok(Ok((stream, _response)))) => stream,
        };

        let (writer, reader) = stream.split();
        *self.writer.lock().await = Some(writer);
        *self.reader.lock().await = Some(reader);

        let opened = {
            let mut state = self.state.lock();
            if *state == SessionState::Connecting {
                *state = SessionState::Open;
                true
            } else {
                false
            }
        };

        if !opened {
            self.writer.lock().await.take();
            self.reader.lock().await.take();
            return Err(Error::connect_failure(url, "disconnected during handshake"));
        }

        self.spawn_keep_alive();

        info!(buffer_size = self.buffer_size, "Transport open");

        Ok(())
    }

    /// Closes the connection with a normal-closure frame.
    ///
    /// Idempotent. A no-op when the session is idle, closing or closed.
    /// Wakes any pending [`receive`](Self::receive) and cancels in-flight
    /// writes. The close handshake is bounded by a fixed timeout, after which
    /// the session is `Closed` whether or not the peer answered.
    ///
    /// # Errors
    ///
    /// Never fails today; the `Result` leaves room for close handshake errors.
    pub async fn disconnect(&self) -> Result<()> {
        let previous = {
            let mut state = self.state.lock();
            let previous = *state;
            match previous {
                SessionState::Open => *state = SessionState::Closing,
                SessionState::Connecting => *state = SessionState::Closed,
                SessionState::Idle | SessionState::Closing | SessionState::Closed => {
                    return Ok(());
                }
            }
            previous
        };

        self.close_tx.send_replace(true);

        if previous == SessionState::Open {
            if timeout(CLOSE_TIMEOUT, self.close_handshake()).await.is_err() {
                debug!("Close handshake timed out");
                if let Ok(mut reader) = self.reader.try_lock() {
                    reader.take();
                }
            }
            *self.state.lock() = SessionState::Closed;
        }

        info!("Transport closed");

        Ok(())
    }

    /// Sends the close frame and waits for the peer's reply, then drops both
    /// halves of the socket.
    async fn close_handshake(&self) {
        let sink = self.writer.lock().await.take();
        if let Some(mut sink) = sink {
            let frame = CloseFrame {
                code: CloseCode::Normal,
                reason: "".into(),
            };
            match sink.send(Message::Close(Some(frame))).await {
                Ok(()) => trace!("Close frame sent"),
                Err(e) => debug!(error = %e, "Close frame not delivered"),
            }
        }

        let stream = self.reader.lock().await.take();
        if let Some(mut stream) = stream {
            while let Some(Ok(message)) = stream.next().await {
                if let Message::Close(frame) = message {
                    trace!(?frame, "Close acknowledged");
                    break;
                }
            }
        }
    }

    fn revert_to_idle(&self) {
        let mut state = self.state.lock();
        if *state == SessionState::Connecting {
            *state = SessionState::Idle;
        }
    }

    fn mark_closed(&self) {
        *self.state.lock() = SessionState::Closed;
        self.close_tx.send_replace(true);
    }

    /// Flushes the queued close reply after a remote close and drops the
    /// write half.
    async fn finish_remote_close(&self) {
        let flush = async {
            let sink = self.writer.lock().await.take();
            if let Some(mut sink) = sink
                && let Err(e) = sink.close().await
            {
                trace!(error = %e, "Close reply not flushed");
            }
        };
        if timeout(CLOSE_TIMEOUT, flush).await.is_err() {
            debug!("Close reply timed out");
        }
    }
}

// ============================================================================
// TransportSession - I/O
// ============================================================================

impl TransportSession {
    /// Sends one binary message.
    ///
    /// # Errors
    ///
    /// - [`Error::NotConnected`] unless the session is open
    /// - [`Error::ConnectionClosed`] if a [`disconnect`](Self::disconnect)
    ///   interrupts the write
    /// - [`Error::WebSocket`] if the write fails; the session is then closed
    pub async fn send(&self, bytes: impl Into<Bytes>) -> Result<()> {
        if !self.is_connected() {
            return Err(Error::NotConnected);
        }

        let message = Message::Binary(bytes.into());
        let mut close_rx = self.close_tx.subscribe();

        let write = async {
            let mut writer = self.writer.lock().await;
            let sink = writer.as_mut().ok_or(Error::NotConnected)?;
            sink.send(message).await.map_err(Error::from)
        };

        let result = tokio::select! {
            () = wait_closed(&mut close_rx) => {
                trace!("Send interrupted by close");
                return Err(Error::ConnectionClosed);
            }
            result = write => result,
        };

        if let Err(e @ Error::WebSocket(_)) = result {
            self.mark_closed();
            return Err(e);
        }

        result
    }

    /// Waits for the next message.
    ///
    /// Returns `Ok(None)` for anything that is not a binary data frame, for a
    /// remote close, and when a local [`disconnect`](Self::disconnect)
    /// interrupts the wait. Check [`is_connected`](Self::is_connected) to tell
    /// them apart.
    ///
    /// # Errors
    ///
    /// - [`Error::NotConnected`] unless the session is open
    /// - [`Error::FrameTooLarge`] if a message exceeds the buffer size
    /// - [`Error::WebSocket`] on a stream error
    ///
    /// Both stream failures close the session.
    pub async fn receive(&self) -> Result<Option<RawFrame>> {
        if !self.is_connected() {
            return Err(Error::NotConnected);
        }

        let mut close_rx = self.close_tx.subscribe();
        let mut reader = self.reader.lock().await;
        let stream = reader.as_mut().ok_or(Error::NotConnected)?;

        let message = tokio::select! {
            () = wait_closed(&mut close_rx) => {
                trace!("Receive interrupted by close");
                return Ok(None);
            }
            message = stream.next() => message,
        };

        match message {
            Some(Ok(Message::Binary(data))) => {
                if data.len() > self.buffer_size {
                    self.mark_closed();
                    return Err(Error::frame_too_large(data.len(), self.buffer_size));
                }
                trace!(len = data.len(), "Frame received");
                Ok(Some(RawFrame::new(data)))
            }

            Some(Ok(Message::Close(frame))) => {
                debug!(?frame, "Transport closed by remote");
                self.mark_closed();
                reader.take();
                drop(reader);
                self.finish_remote_close().await;
                Ok(None)
            }

            Some(Ok(other)) => {
                trace!(kind = message_kind(&other), "Ignoring non-binary frame");
                Ok(None)
            }

            Some(Err(WsError::Capacity(CapacityError::MessageTooLong { size, max_size }))) => {
                warn!(size, max_size, "Frame exceeds buffer");
                self.mark_closed();
                Err(Error::frame_too_large(size, max_size))
            }

            Some(Err(WsError::ConnectionClosed | WsError::AlreadyClosed)) => {
                debug!("Transport stream closed");
                self.mark_closed();
                Ok(None)
            }

            Some(Err(e)) => {
                warn!(error = %e, "Transport stream error");
                self.mark_closed();
                Err(e.into())
            }

            None => {
                debug!("Transport stream ended");
                self.mark_closed();
                Ok(None)
            }
        }
    }

    fn spawn_keep_alive(&self) {
        let writer = Arc::clone(&self.writer);
        let state = Arc::clone(&self.state);
        let mut close_rx = self.close_tx.subscribe();
        let period = self.keep_alive;

        tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);

            loop {
                tokio::select! {
                    () = wait_closed(&mut close_rx) => break,
                    _ = ticker.tick() => {
                        let open = *state.lock() == SessionState::Open;
                        if !open {
                            break;
                        }

                        let ping = async {
                            let mut guard = writer.lock().await;
                            match guard.as_mut() {
                                Some(sink) => sink.send(Message::Ping(Bytes::new())).await.map(Some),
                                None => Ok(None),
                            }
                        };

                        let sent = tokio::select! {
                            () = wait_closed(&mut close_rx) => break,
                            sent = ping => sent,
                        };

                        match sent {
                            Ok(Some(())) => trace!("Keep-alive ping sent"),
                            Ok(None) => break,
                            Err(e) => {
                                debug!(error = %e, "Keep-alive ping failed");
                                break;
                            }
                        }
                    }
                }
            }

            trace!("Keep-alive stopped");
        });
    }
}

impl Drop for TransportSession {
    fn drop(&mut self) {
        self.close_tx.send_replace(true);
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn build_request(
    url: &str,
    handshake: &Handshake,
) -> Result<tokio_tungstenite::tungstenite::handshake::client::Request> {
    let mut request = url
        .into_client_request()
        .map_err(|e| Error::connect_failure(url, e.to_string()))?;

    let invalid = |name: &str| Error::connect_failure(url, format!("invalid {name} header"));
    let headers = request.headers_mut();

    headers.insert(SEC_WEBSOCKET_PROTOCOL, HeaderValue::from_static(SUB_PROTOCOL));
    headers.insert(
        USER_AGENT,
        HeaderValue::from_str(&handshake.user_agent).map_err(|_| invalid("User-Agent"))?,
    );
    headers.insert(
        ORIGIN,
        HeaderValue::from_str(&handshake.origin).map_err(|_| invalid("Origin"))?,
    );
    if let Some(cookies) = &handshake.cookies {
        headers.insert(
            COOKIE,
            HeaderValue::from_str(cookies).map_err(|_| invalid("Cookie"))?,
        );
    }

    Ok(request)
}

/// Resolves once the close signal is raised or its sender is gone.
async fn wait_closed(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            return;
        }
    }
}

fn message_kind(message: &Message) -> &'static str {
    match message {
        Message::Text(_) => "text",
        Message::Binary(_) => "binary",
        Message::Ping(_) => "ping",
        Message::Pong(_) => "pong",
        Message::Close(_) => "close",
        Message::Frame(_) => "frame",
    }
}

// ============================================================================
// Tests
// ============================================================================
