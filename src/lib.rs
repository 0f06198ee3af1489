//! Webcast Live - Client core for TikTok live broadcast push channels.
//!
//! This library signs broadcast URLs through an external signing service,
//! opens the WebSocket push channel with the signed identity, and decodes the
//! protobuf frames it delivers.
//!
//! # Architecture
//!
//! ```text
//! ConnectionSettings ──► WebcastClient
//!                            │
//!          ┌─────────────────┼──────────────────┐
//!          ▼                 ▼                  ▼
//!      UrlSigner ──► WebcastHttpClient   TransportSession ──► FrameDecoder
//!          │                 │                  │                  │
//!          └─ DefaultHeaders ┴─ CredentialStore ┘                  ▼
//!                                                          ConnectionEvent
//! ```
//!
//! Key design principles:
//!
//! - Signing is the only writer of the shared `User-Agent`
//! - One [`TransportSession`] per connection, with a strict state machine
//! - Decode failures are per-frame; transport failures end the connection
//! - One frame in flight between the receive loop and the consumer
//!
//! # Quick Start
//!
//! ```no_run
//! use webcast_live::{ConnectionEvent, ConnectionSettings, Result, WebcastClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let settings = ConnectionSettings::builder()
//!         .client_language("en-US")
//!         .build()?;
//!
//!     let client = WebcastClient::new(settings)?;
//!     let mut connection = client.connect_room("7301234567890123456").await?;
//!
//!     while let Some(event) = connection.next_event().await {
//!         if let ConnectionEvent::Message(message) = event {
//!             for item in &message.response.messages {
//!                 println!("{}", item.r#type);
//!             }
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
//! | [`client`] | [`WebcastClient`] orchestrator and [`LiveConnection`] |
//! | [`config`] | [`ConnectionSettings`] and endpoint constants |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`net`] | HTTP request builder and webcast API client |
//! | [`protocol`] | Push frame schema and decoder |
//! | [`signing`] | URL signing |
//! | [`store`] | Cookies and proxies |
//! | [`transport`] | WebSocket transport session |

// ============================================================================
// Modules
// ============================================================================

/// Connection orchestrator.
///
/// - [`WebcastClient`] - Signs, connects and runs the receive loop
/// - [`LiveConnection`] - Event stream of one connection
pub mod client;

/// Client configuration.
pub mod config;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Type-safe identifiers.
pub mod identifiers;

/// Outbound HTTP.
pub mod net;

/// Push channel protocol.
pub mod protocol;

/// URL signing.
pub mod signing;

/// Cookies and proxies.
pub mod store;

/// WebSocket transport.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Client types
pub use client::{ClientRegistry, ConnectionEvent, LiveConnection, WebcastClient};

// Configuration types
pub use config::{ConnectionSettings, ConnectionSettingsBuilder};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::{ClientSeq, PushMessageId};

// HTTP types
pub use net::{HttpContent, HttpRequest, RequestParameters, WebcastHttpClient};

// Protocol types
pub use protocol::{DecodedMessage, FrameDecoder, ProtobufDecoder, WebcastResponse};

// Signing types
pub use signing::{SignedUrl, UrlSigner};

// Store types
pub use store::{CredentialStore, ProxyConfig, ProxyPool, ProxySettings, ProxyType, RotationPolicy};

// Transport types
pub use transport::{RawFrame, SessionState, TransportSession};
