//! Wire schema of the push channel.
//!
//! Hand-written `prost` messages; only the fields the client reads are
//! declared, unknown fields are skipped by the decoder.
//!
//! ```text
//! WebcastPushFrame { id: 2, type: 6, binary: 8 }
//!     └── type == "msg" ──► binary = WebcastResponse
//!                               ├── messages: [WebcastMessage { type: 1, binary: 2 }]
//!                               └── ws_param: [WebsocketParam { name: 1, value: 2 }]
//! ```

// ============================================================================
// Push Envelope
// ============================================================================

/// Envelope of every frame on the push channel.
#[derive(Clone, PartialEq, prost::Message)]
pub struct WebcastPushFrame {
    /// Envelope id, echoed in acknowledgements.
    #[prost(uint64, tag = "2")]
    pub id: u64,

    /// Envelope type: `"msg"` for data, `"ack"` for acknowledgements.
    #[prost(string, tag = "6")]
    pub r#type: String,

    /// Payload.
    #[prost(bytes = "vec", tag = "8")]
    pub binary: Vec<u8>,
}

// ============================================================================
// Response
// ============================================================================

/// Batch of broadcast messages plus the channel parameters for the next read.
#[derive(Clone, PartialEq, prost::Message)]
pub struct WebcastResponse {
    /// Broadcast messages in this batch.
    #[prost(message, repeated, tag = "1")]
    pub messages: Vec<WebcastMessage>,

    /// Resume cursor.
    #[prost(string, tag = "2")]
    pub cursor: String,

    /// Suggested polling interval in milliseconds.
    #[prost(uint64, tag = "3")]
    pub fetch_interval: u64,

    /// Server time.
    #[prost(uint64, tag = "4")]
    pub now: u64,

    /// Opaque routing state, echoed in acknowledgements and the transport URL.
    #[prost(string, tag = "5")]
    pub internal_ext: String,

    #[prost(uint32, tag = "6")]
    pub fetch_type: u32,

    /// Extra transport URL parameters.
    #[prost(message, repeated, tag = "7")]
    pub ws_param: Vec<WebsocketParam>,

    #[prost(uint64, tag = "8")]
    pub heartbeat_duration: u64,

    /// Whether this batch must be acknowledged.
    #[prost(bool, tag = "9")]
    pub need_ack: bool,

    /// Push channel URL.
    #[prost(string, tag = "10")]
    pub push_server: String,
}

/// One broadcast message; `binary` is decoded by the dispatch layer by `type`.
#[derive(Clone, PartialEq, prost::Message)]
pub struct WebcastMessage {
    #[prost(string, tag = "1")]
    pub r#type: String,

    #[prost(bytes = "vec", tag = "2")]
    pub binary: Vec<u8>,
}

/// Name/value pair appended to the push channel URL.
#[derive(Clone, PartialEq, prost::Message)]
pub struct WebsocketParam {
    #[prost(string, tag = "1")]
    pub name: String,

    #[prost(string, tag = "2")]
    pub value: String,
}

// ============================================================================
// Tests
// ============================================================================
