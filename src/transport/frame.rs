//! Received frame buffer.

// ============================================================================
// Imports
// ============================================================================

use bytes::Bytes;

// ============================================================================
// RawFrame
// ============================================================================

/// One binary message as received from the transport.
///
/// Only the first `length` bytes of the buffer are meaningful. The buffer is
/// shared and never mutated after receipt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    bytes: Bytes,
    length: usize,
}

impl RawFrame {
    /// Creates a frame covering the whole buffer.
    #[inline]
    #[must_use]
    pub fn new(bytes: Bytes) -> Self {
        let length = bytes.len();
        Self { bytes, length }
    }

    /// Creates a frame covering the first `length` bytes of `bytes`.
    ///
    /// `length` is clamped to the buffer size.
    #[inline]
    #[must_use]
    pub fn with_length(bytes: Bytes, length: usize) -> Self {
        let length = length.min(bytes.len());
        Self { bytes, length }
    }

    /// Returns the meaningful bytes.
    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.length]
    }

    /// Returns the meaningful length.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.length
    }

    /// Returns `true` if the frame carries no bytes.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }
}

impl From<Vec<u8>> for RawFrame {
    fn from(bytes: Vec<u8>) -> Self {
        Self::new(Bytes::from(bytes))
    }
}

// ============================================================================
// Tests
// ============================================================================
