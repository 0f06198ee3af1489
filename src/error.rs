//! Error types for the webcast client.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use webcast_live::{Result, WebcastClient};
//!
//! async fn example(client: &WebcastClient) -> Result<()> {
//!     let mut live = client.connect_room("7291234567890").await?;
//!     while let Some(event) = live.next_event().await {
//!         println!("{event:?}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants | Scope |
//! |----------|----------|-------|
//! | Configuration | [`Error::Config`] | construction |
//! | Signing | [`Error::SigningFailure`] | connection-fatal |
//! | Connection | [`Error::ConnectFailure`], [`Error::ConnectionClosed`], [`Error::WebSocket`] | connection-fatal |
//! | Framing | [`Error::FrameTooLarge`] | connection-fatal |
//! | Decoding | [`Error::DecodeFailure`] | per-frame |
//! | Usage | [`Error::NotConnected`], [`Error::AlreadyConnected`], [`Error::InvalidState`] | immediate |
//! | External | [`Error::Http`], [`Error::UnexpectedStatus`], [`Error::Json`], [`Error::Protocol`] | caller |

// ============================================================================
// Imports
// ============================================================================

use std::error::Error as StdError;
use std::result::Result as StdResult;

use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;

use crate::transport::SessionState;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

/// Boxed cause carried by [`Error::SigningFailure`].
pub type BoxedCause = Box<dyn StdError + Send + Sync + 'static>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Each variant includes relevant context for debugging.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when connection settings are invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    // ========================================================================
    // Signing Errors
    // ========================================================================
    /// The signing service did not produce a usable signed URL.
    ///
    /// Covers an unreachable service, a non-JSON body, and a body missing
    /// `signedUrl` or `User-Agent`. Never retried inside the signer.
    #[error("Signing failure: {message}")]
    SigningFailure {
        /// Description of what was wrong with the signing exchange.
        message: String,
        /// Underlying cause, if any.
        #[source]
        source: Option<BoxedCause>,
    },

    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// WebSocket handshake rejected or timed out.
    #[error("Connect failure to {url}: {message}")]
    ConnectFailure {
        /// Target URL of the handshake.
        url: String,
        /// Description of the failure.
        message: String,
    },

    /// WebSocket connection closed unexpectedly.
    #[error("Connection closed")]
    ConnectionClosed,

    // ========================================================================
    // Framing Errors
    // ========================================================================
    /// Inbound message exceeds the receive buffer.
    ///
    /// The connection's data stream is no longer trustworthy after this.
    #[error("Frame too large: {size} bytes exceeds buffer of {limit} bytes")]
    FrameTooLarge {
        /// Size of the offending message.
        size: usize,
        /// Configured receive buffer size.
        limit: usize,
    },

    /// Frame payload does not match the push schema.
    #[error("Decode failure: {message}")]
    DecodeFailure {
        /// Description of the schema mismatch.
        message: String,
    },

    // ========================================================================
    // Usage Errors
    // ========================================================================
    /// Operation requires an open session.
    #[error("Not connected")]
    NotConnected,

    /// A connect was attempted while a session is live.
    #[error("Already connected")]
    AlreadyConnected,

    /// Operation is not valid in the session's current state.
    #[error("Invalid session state for {operation}: {state:?}")]
    InvalidState {
        /// Operation that was attempted.
        operation: &'static str,
        /// State the session was in.
        state: SessionState,
    },

    // ========================================================================
    // Protocol Errors
    // ========================================================================
    /// Unexpected content from the webcast service.
    #[error("Protocol error: {message}")]
    Protocol {
        /// Description of the protocol violation.
        message: String,
    },

    /// HTTP response with a non-success status.
    #[error("Unexpected HTTP status {status} from {url}")]
    UnexpectedStatus {
        /// HTTP status code.
        status: u16,
        /// Requested URL.
        url: String,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// HTTP transport error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),
}

impl From<prost::DecodeError> for Error {
    fn from(err: prost::DecodeError) -> Self {
        Self::decode_failure(err.to_string())
    }
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a signing failure without an underlying cause.
    #[inline]
    pub fn signing_failure(message: impl Into<String>) -> Self {
        Self::SigningFailure {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a signing failure wrapping an underlying cause.
    #[inline]
    pub fn signing_failure_with(
        message: impl Into<String>,
        source: impl Into<BoxedCause>,
    ) -> Self {
        Self::SigningFailure {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Creates a connect failure.
    #[inline]
    pub fn connect_failure(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConnectFailure {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Creates a frame too large error.
    #[inline]
    pub fn frame_too_large(size: usize, limit: usize) -> Self {
        Self::FrameTooLarge { size, limit }
    }

    /// Creates a decode failure.
    #[inline]
    pub fn decode_failure(message: impl Into<String>) -> Self {
        Self::DecodeFailure {
            message: message.into(),
        }
    }

    /// Creates an invalid state error.
    #[inline]
    pub fn invalid_state(operation: &'static str, state: SessionState) -> Self {
        Self::InvalidState { operation, state }
    }

    /// Creates a protocol error.
    #[inline]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this error ends the connection it occurred on.
    #[inline]
    #[must_use]
    pub fn is_connection_fatal(&self) -> bool {
        matches!(
            self,
            Self::SigningFailure { .. }
                | Self::ConnectFailure { .. }
                | Self::ConnectionClosed
                | Self::FrameTooLarge { .. }
                | Self::WebSocket(_)
        )
    }

    /// Returns `true` if this error only affects a single frame.
    ///
    /// The receive loop reports these and keeps streaming.
    #[inline]
    #[must_use]
    pub fn is_per_frame(&self) -> bool {
        matches!(self, Self::DecodeFailure { .. })
    }

    /// Returns `true` if this is a timeout error.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Http(e) if e.is_timeout())
    }
}

// ============================================================================
// Tests
// ============================================================================
