//! Frame decoding and acknowledgement encoding.

// ============================================================================
// Imports
// ============================================================================

use prost::Message;
use tracing::trace;

use crate::error::{Error, Result};
use crate::identifiers::PushMessageId;
use crate::transport::RawFrame;

use super::schema::{WebcastPushFrame, WebcastResponse};

// ============================================================================
// Constants
// ============================================================================

/// Envelope type of data frames.
pub const FRAME_TYPE_MESSAGE: &str = "msg";

/// Envelope type of acknowledgements.
pub const FRAME_TYPE_ACK: &str = "ack";

// ============================================================================
// DecodedMessage
// ============================================================================

/// A decoded data frame.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedMessage {
    /// Envelope id.
    pub id: PushMessageId,
    /// Decoded payload.
    pub response: WebcastResponse,
}

impl DecodedMessage {
    /// Returns `true` if the server expects an acknowledgement.
    #[inline]
    #[must_use]
    pub fn needs_ack(&self) -> bool {
        self.response.need_ack
    }
}

// ============================================================================
// FrameDecoder
// ============================================================================

/// Turns raw transport frames into decoded messages.
///
/// Implementations are synchronous and must not mutate the frame.
pub trait FrameDecoder: Send + Sync {
    /// Decodes one frame.
    ///
    /// Returns `Ok(None)` if the frame is not a data message.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DecodeFailure`] if the frame does not match the schema.
    fn decode(&self, frame: &RawFrame) -> Result<Option<DecodedMessage>>;
}

/// Default decoder for the protobuf push schema.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProtobufDecoder;

impl ProtobufDecoder {
    /// Creates a decoder.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl FrameDecoder for ProtobufDecoder {
    fn decode(&self, frame: &RawFrame) -> Result<Option<DecodedMessage>> {
        let envelope = WebcastPushFrame::decode(frame.as_bytes())
            .map_err(|e| Error::decode_failure(format!("invalid push frame: {e}")))?;

        if envelope.r#type != FRAME_TYPE_MESSAGE {
            trace!(kind = %envelope.r#type, id = envelope.id, "Skipping non-data frame");
            return Ok(None);
        }

        let response = WebcastResponse::decode(envelope.binary.as_slice())
            .map_err(|e| Error::decode_failure(format!("invalid response payload: {e}")))?;

        trace!(
            id = envelope.id,
            messages = response.messages.len(),
            need_ack = response.need_ack,
            "Frame decoded"
        );

        Ok(Some(DecodedMessage {
            id: PushMessageId::new(envelope.id),
            response,
        }))
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Builds the acknowledgement frame for a data frame.
#[must_use]
pub fn encode_ack(id: PushMessageId, internal_ext: &str) -> Vec<u8> {
    WebcastPushFrame {
        id: id.get(),
        r#type: FRAME_TYPE_ACK.to_string(),
        binary: internal_ext.as_bytes().to_vec(),
    }
    .encode_to_vec()
}

/// Decodes any schema message from a byte slice.
///
/// # Errors
///
/// Returns [`Error::DecodeFailure`] if `bytes` does not match `T`.
pub fn decode_schema<T: Message + Default>(bytes: &[u8]) -> Result<T> {
    Ok(T::decode(bytes)?)
}

// ============================================================================
// Tests
// ============================================================================
