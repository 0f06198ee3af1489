//! Type-safe identifiers.
//!
//! Newtype wrappers keep client sequence numbers and push message ids
//! from being mixed up with plain integers.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::{Deserialize, Serialize};

// ============================================================================
// ClientSeq
// ============================================================================

/// Per-client sequence number sent to the signing service as `uuc`.
///
/// Assigned by [`ClientRegistry`](crate::client::ClientRegistry) when a
/// client is constructed. Distinguishes concurrent clients sharing one process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientSeq(u32);

impl ClientSeq {
    /// Creates a sequence number from a raw value.
    #[inline]
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Returns the raw value.
    #[inline]
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ClientSeq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// PushMessageId
// ============================================================================

/// Identifier of one push envelope, echoed back in acknowledgements.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PushMessageId(u64);

impl PushMessageId {
    /// Creates an id from a raw value.
    #[inline]
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw value.
    #[inline]
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for PushMessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for PushMessageId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

// ============================================================================
// Tests
// ============================================================================
