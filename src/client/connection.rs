//! Live connection handle and receive loop.

// ============================================================================
// Imports
// ============================================================================

use std::collections::VecDeque;
use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::error::{Error, Result};
use crate::protocol::{DecodedMessage, FrameDecoder, encode_ack};
use crate::transport::{SessionState, TransportSession};

// ============================================================================
// Constants
// ============================================================================

/// One frame in flight between the loop and the consumer.
pub(crate) const EVENT_CHANNEL_CAPACITY: usize = 1;

// ============================================================================
// ConnectionEvent
// ============================================================================

/// Event delivered to the consumer of a [`LiveConnection`].
#[derive(Debug)]
pub enum ConnectionEvent {
    /// A decoded data frame.
    Message(DecodedMessage),
    /// One frame failed to decode; streaming continues.
    FrameError(Error),
    /// The connection closed normally. Terminal.
    Closed,
    /// The connection failed. Terminal.
    Failed(Error),
}

impl ConnectionEvent {
    /// Returns `true` for [`Closed`](Self::Closed) and [`Failed`](Self::Failed).
    #[inline]
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed | Self::Failed(_))
    }
}

// ============================================================================
// ConnectionHandle
// ============================================================================

/// Cloneable control handle of a live connection.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    session: Arc<TransportSession>,
}

impl ConnectionHandle {
    pub(crate) fn new(session: Arc<TransportSession>) -> Self {
        Self { session }
    }

    /// Sends one binary message.
    ///
    /// # Errors
    ///
    /// See [`TransportSession::send`].
    pub async fn send(&self, bytes: impl Into<Bytes>) -> Result<()> {
        self.session.send(bytes).await
    }

    /// Closes the connection. Idempotent.
    ///
    /// # Errors
    ///
    /// See [`TransportSession::disconnect`].
    pub async fn disconnect(&self) -> Result<()> {
        self.session.disconnect().await
    }

    /// Returns `true` while the transport is open.
    #[inline]
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.session.is_connected()
    }

    /// Returns the transport state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.session.state()
    }
}

// ============================================================================
// LiveConnection
// ============================================================================

/// Event stream of one connection.
///
/// Dropping it stops the receive loop and closes the transport.
#[derive(Debug)]
pub struct LiveConnection {
    pending: VecDeque<ConnectionEvent>,
    events: mpsc::Receiver<ConnectionEvent>,
    handle: ConnectionHandle,
    task: JoinHandle<()>,
}

impl LiveConnection {
    pub(crate) fn new(
        events: mpsc::Receiver<ConnectionEvent>,
        handle: ConnectionHandle,
        task: JoinHandle<()>,
    ) -> Self {
        Self {
            pending: VecDeque::new(),
            events,
            handle,
            task,
        }
    }

    /// Queues an event ahead of everything the receive loop delivers.
    pub(crate) fn push_front(&mut self, event: ConnectionEvent) {
        self.pending.push_front(event);
    }

    /// Waits for the next event.
    ///
    /// Returns `None` once the terminal event has been consumed.
    pub async fn next_event(&mut self) -> Option<ConnectionEvent> {
        if let Some(event) = self.pending.pop_front() {
            return Some(event);
        }
        self.events.recv().await
    }

    /// Returns a cloneable control handle.
    #[inline]
    #[must_use]
    pub fn handle(&self) -> ConnectionHandle {
        self.handle.clone()
    }

    /// Sends one binary message.
    ///
    /// # Errors
    ///
    /// See [`TransportSession::send`].
    pub async fn send(&self, bytes: impl Into<Bytes>) -> Result<()> {
        self.handle.send(bytes).await
    }

    /// Closes the connection. Idempotent.
    ///
    /// The receive loop then delivers [`ConnectionEvent::Closed`].
    ///
    /// # Errors
    ///
    /// See [`TransportSession::disconnect`].
    pub async fn disconnect(&self) -> Result<()> {
        self.handle.disconnect().await
    }

    /// Returns `true` while the transport is open.
    #[inline]
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.handle.is_connected()
    }

    /// Returns `true` once the receive loop has exited.
    #[inline]
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

// ============================================================================
// Receive Loop
// ============================================================================

/// Receives, decodes and delivers frames until the connection ends.
///
/// Decode failures are delivered as [`ConnectionEvent::FrameError`] and the
/// loop carries on. Any other failure ends the loop with
/// [`ConnectionEvent::Failed`] after closing the transport.
pub(crate) async fn receive_loop(
    session: Arc<TransportSession>,
    decoder: Arc<dyn FrameDecoder>,
    events: mpsc::Sender<ConnectionEvent>,
) {
    debug!("Receive loop started");

    let terminal = loop {
        if !session.is_connected() {
            break ConnectionEvent::Closed;
        }

        let received = tokio::select! {
            received = session.receive() => received,
            () = events.closed() => {
                debug!("Event consumer dropped");
                let _ = session.disconnect().await;
                return;
            }
        };

        let frame = match received {
            Ok(Some(frame)) => frame,
            Ok(None) => continue,
            Err(Error::NotConnected) => break ConnectionEvent::Closed,
            Err(e) => break ConnectionEvent::Failed(e),
        };

        let event = match decoder.decode(&frame) {
            Ok(None) => continue,
            Ok(Some(message)) => {
                if message.needs_ack() {
                    let ack = encode_ack(message.id, &message.response.internal_ext);
                    match session.send(ack).await {
                        Ok(()) => {}
                        Err(Error::ConnectionClosed) => break ConnectionEvent::Closed,
                        Err(e) => break ConnectionEvent::Failed(e),
                    }
                }
                ConnectionEvent::Message(message)
            }
            Err(e) if e.is_per_frame() => {
                warn!(error = %e, len = frame.len(), "Dropping undecodable frame");
                ConnectionEvent::FrameError(e)
            }
            Err(e) => break ConnectionEvent::Failed(e),
        };

        if events.send(event).await.is_err() {
            debug!("Event consumer dropped");
            let _ = session.disconnect().await;
            return;
        }
    };

    match &terminal {
        ConnectionEvent::Failed(e) => {
            error!(error = %e, "Connection failed");
            let _ = session.disconnect().await;
        }
        _ => info!("Connection closed"),
    }

    let _ = events.send(terminal).await;
}

// ============================================================================
// Tests
// ============================================================================
