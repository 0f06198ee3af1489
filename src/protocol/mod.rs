//! Push channel protocol.
//!
//! Every transport frame is a protobuf `WebcastPushFrame`. Frames of type
//! `"msg"` carry a `WebcastResponse` batch; everything else is ignored by the
//! decoder. Batches flagged `need_ack` are answered with an `"ack"` frame.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `schema` | `prost` message definitions |
//! | `decoder` | [`FrameDecoder`] trait, [`ProtobufDecoder`], ack encoding |

// ============================================================================
// Submodules
// ============================================================================

/// Frame decoding.
pub mod decoder;

/// Message definitions.
pub mod schema;

// ============================================================================
// Re-exports
// ============================================================================

pub use decoder::{
    DecodedMessage, FRAME_TYPE_ACK, FRAME_TYPE_MESSAGE, FrameDecoder, ProtobufDecoder,
    decode_schema, encode_ack,
};
pub use schema::{WebcastMessage, WebcastPushFrame, WebcastResponse, WebsocketParam};
