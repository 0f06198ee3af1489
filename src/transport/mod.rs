//! WebSocket transport.
//!
//! A [`TransportSession`] owns exactly one connection to the push channel and
//! exposes it as a strict state machine. Received binary messages come out as
//! [`RawFrame`]s for the protocol decoder.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `frame` | Received frame buffer |
//! | `session` | Connection lifecycle, send and receive |

// ============================================================================
// Submodules
// ============================================================================

/// Received frame buffer.
pub mod frame;

/// Connection lifecycle.
pub mod session;

// ============================================================================
// Re-exports
// ============================================================================

pub use frame::RawFrame;
pub use session::{Handshake, SessionState, TransportSession};
