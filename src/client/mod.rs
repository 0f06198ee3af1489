//! Connection orchestrator.
//!
//! [`WebcastClient`] runs the connection sequence: sign the push URL, open the
//! transport with the signed identity, then hand the session to a receive loop
//! that decodes frames and delivers [`ConnectionEvent`]s.
//!
//! # Example
//!
//! ```no_run
//! use webcast_live::{ConnectionEvent, ConnectionSettings, Result, WebcastClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let client = WebcastClient::new(ConnectionSettings::default())?;
//!     let mut connection = client.connect_room("7301234567890123456").await?;
//!
//!     while let Some(event) = connection.next_event().await {
//!         match event {
//!             ConnectionEvent::Message(message) => {
//!                 println!("{} messages", message.response.messages.len());
//!             }
//!             ConnectionEvent::FrameError(e) => eprintln!("skipped frame: {e}"),
//!             ConnectionEvent::Closed => break,
//!             ConnectionEvent::Failed(e) => return Err(e),
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `connection` | [`LiveConnection`], [`ConnectionEvent`], receive loop |
//! | `registry` | [`ClientRegistry`] sequence numbers and shared headers |

// ============================================================================
// Submodules
// ============================================================================

/// Live connection handle and receive loop.
pub mod connection;

/// Client registry.
pub mod registry;

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, mpsc};
use tracing::{debug, info};

use crate::config::ConnectionSettings;
use crate::config::constants::{ORIGIN, ROOM_FETCH_PATH};
use crate::error::{Error, Result};
use crate::identifiers::{ClientSeq, PushMessageId};
use crate::net::{DefaultHeaders, RequestContext, RequestParameters, WebcastHttpClient};
use crate::protocol::{DecodedMessage, FrameDecoder, ProtobufDecoder, WebcastResponse};
use crate::signing::UrlSigner;
use crate::store::CredentialStore;
use crate::transport::{Handshake, SessionState, TransportSession};

use connection::{ConnectionHandle, EVENT_CHANNEL_CAPACITY, receive_loop};

// ============================================================================
// Re-exports
// ============================================================================

pub use connection::{ConnectionEvent, LiveConnection};
pub use registry::{ClientRegistry, ClientTicket};

// ============================================================================
// WebcastClient
// ============================================================================

/// Client for one broadcast connection at a time.
pub struct WebcastClient {
    settings: ConnectionSettings,
    ticket: ClientTicket,
    store: Arc<CredentialStore>,
    http: WebcastHttpClient,
    decoder: Arc<dyn FrameDecoder>,
    active: Mutex<Option<Arc<TransportSession>>>,
    connect_lock: AsyncMutex<()>,
}

impl fmt::Debug for WebcastClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebcastClient")
            .field("seq", &self.seq())
            .field("settings", &self.settings)
            .field("connected", &self.is_connected())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// WebcastClient - Constructors
// ============================================================================

impl WebcastClient {
    /// Creates a client registered with the process-wide registry.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the settings are invalid.
    pub fn new(settings: ConnectionSettings) -> Result<Self> {
        Self::with_registry(settings, ClientRegistry::global())
    }

    /// Creates a client registered with `registry`.
    ///
    /// Clients of the same registry share the default headers, so a signing
    /// exchange by one updates the `User-Agent` of all.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the settings are invalid or the registry
    /// has no sequence numbers left.
    pub fn with_registry(settings: ConnectionSettings, registry: Arc<ClientRegistry>) -> Result<Self> {
        settings.validate()?;

        let ticket = registry.register()?;
        let store = Arc::new(CredentialStore::new(settings.proxy.as_ref()));
        let context = RequestContext::new(
            registry.headers().clone(),
            Arc::clone(&store),
            settings.timeout,
        );
        let signer = UrlSigner::new(settings.sign_api_url.clone(), ticket.seq(), context.clone());
        let http = WebcastHttpClient::new(&settings, context, signer);

        debug!(seq = %ticket.seq(), "Client created");

        Ok(Self {
            settings,
            ticket,
            store,
            http,
            decoder: Arc::new(ProtobufDecoder::new()),
            active: Mutex::new(None),
            connect_lock: AsyncMutex::new(()),
        })
    }

    /// Replaces the frame decoder.
    #[must_use]
    pub fn with_decoder(mut self, decoder: impl FrameDecoder + 'static) -> Self {
        self.decoder = Arc::new(decoder);
        self
    }
}

// ============================================================================
// WebcastClient - Accessors
// ============================================================================

impl WebcastClient {
    /// Returns the client's sequence number.
    #[inline]
    #[must_use]
    pub fn seq(&self) -> ClientSeq {
        self.ticket.seq()
    }

    /// Returns the settings.
    #[inline]
    #[must_use]
    pub fn settings(&self) -> &ConnectionSettings {
        &self.settings
    }

    /// Returns the credential store.
    #[inline]
    #[must_use]
    pub fn store(&self) -> &Arc<CredentialStore> {
        &self.store
    }

    /// Returns the shared default headers.
    #[inline]
    #[must_use]
    pub fn headers(&self) -> &DefaultHeaders {
        &self.http.context().headers
    }

    /// Returns the webcast HTTP client.
    #[inline]
    #[must_use]
    pub fn http(&self) -> &WebcastHttpClient {
        &self.http
    }

    /// Returns `true` while a connection of this client is open.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.active
            .lock()
            .as_ref()
            .is_some_and(|session| session.is_connected())
    }
}

// ============================================================================
// WebcastClient - Connection
// ============================================================================

impl WebcastClient {
    /// Signs `base_url` with `params`, opens the transport and starts the
    /// receive loop.
    ///
    /// # Errors
    ///
    /// - [`Error::AlreadyConnected`] if this client already has a live connection
    /// - [`Error::SigningFailure`] if the URL cannot be signed
    /// - [`Error::ConnectFailure`] if the transport handshake fails
    pub async fn connect(
        &self,
        base_url: &str,
        params: Option<&RequestParameters>,
    ) -> Result<LiveConnection> {
        let _guard = self.connect_lock.lock().await;
        self.ensure_not_connected()?;

        let signed = self.http.signer().sign(base_url, params).await?;

        let session = Arc::new(TransportSession::new(self.settings.socket_buffer_size));
        let handshake = Handshake {
            cookies: self.store.cookie_header(),
            user_agent: self.headers().user_agent(),
            origin: ORIGIN.to_string(),
            timeout: self.settings.timeout,
        };

        *self.active.lock() = Some(Arc::clone(&session));
        session.connect(&signed.signed_url, &handshake).await?;

        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let task = tokio::spawn(receive_loop(
            Arc::clone(&session),
            Arc::clone(&self.decoder),
            tx,
        ));

        info!(seq = %self.seq(), "Connected");

        Ok(LiveConnection::new(rx, ConnectionHandle::new(session), task))
    }

    /// Resolves the push channel of `room_id` and connects to it.
    ///
    /// The room is fetched with a signed `im/fetch/` request. When
    /// `handle_existing_messages_on_connect` is set and the fetch returned
    /// messages, they are delivered as the first event.
    ///
    /// # Errors
    ///
    /// - [`Error::Protocol`] if the fetch names no push server
    /// - everything [`connect`](Self::connect) and
    ///   [`WebcastHttpClient::get_deserialized_message`] return
    pub async fn connect_room(&self, room_id: &str) -> Result<LiveConnection> {
        self.ensure_not_connected()?;

        let fetch_params = RequestParameters::new().with("room_id", room_id.to_string());
        let response = self
            .http
            .get_deserialized_message(ROOM_FETCH_PATH, Some(&fetch_params), true)
            .await?;

        if response.push_server.is_empty() {
            return Err(Error::protocol(format!(
                "room {room_id} fetch returned no push server"
            )));
        }

        let params = self.push_params(room_id, &response);

        debug!(
            room_id,
            push_server = %response.push_server,
            existing = response.messages.len(),
            "Room resolved"
        );

        let existing = (self.settings.handle_existing_messages_on_connect
            && !response.messages.is_empty())
        .then(|| DecodedMessage {
            id: PushMessageId::default(),
            response: response.clone(),
        });

        let mut connection = self.connect(&response.push_server, Some(&params)).await?;

        if let Some(message) = existing {
            connection.push_front(ConnectionEvent::Message(message));
        }

        Ok(connection)
    }

    /// Closes the active connection, if any. Idempotent.
    ///
    /// # Errors
    ///
    /// See [`TransportSession::disconnect`].
    pub async fn disconnect(&self) -> Result<()> {
        let session = self.active.lock().clone();
        match session {
            Some(session) => session.disconnect().await,
            None => Ok(()),
        }
    }

    fn push_params(&self, room_id: &str, response: &WebcastResponse) -> RequestParameters {
        let mut params = self
            .http
            .client_params()
            .with("room_id", room_id.to_string())
            .with("cursor", response.cursor.clone())
            .with("internal_ext", response.internal_ext.clone());

        for param in &response.ws_param {
            params.insert(param.name.clone(), param.value.clone());
        }

        params
    }

    fn ensure_not_connected(&self) -> Result<()> {
        let live = self.active.lock().as_ref().is_some_and(|session| {
            matches!(
                session.state(),
                SessionState::Connecting | SessionState::Open | SessionState::Closing
            )
        });

        if live {
            return Err(Error::AlreadyConnected);
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
