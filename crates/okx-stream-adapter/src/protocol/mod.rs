/*
[INPUT]:  Channel kinds, instruments, and decoded inbound payloads
[OUTPUT]: Generation-specific wire frames and classified inbound messages
[POS]:    Protocol layer - the one seam hiding three wire generations
[UPDATE]: When the exchange ships a new protocol generation
*/

pub mod legacy;
pub mod v2;
pub mod v3;

use serde_json::Value;

use crate::config::Credentials;
use crate::types::{ChannelGroup, ChannelKind, ProtocolGeneration, SideConvention};

pub use legacy::LegacyProtocol;
pub use v2::V2Protocol;
pub use v3::V3Protocol;

/// How subscribe requests for a channel kind are grouped into frames
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchPolicy {
    /// One subscribe frame per instrument id
    PerInstrument,
    /// One frame carrying every requested id
    Batched,
}

/// Outbound heartbeat shape, generation-dependent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatFrame {
    /// Literal `"ping"` text frame
    Literal(&'static str),
    /// JSON `{"event":"ping"}` frame
    Json(&'static str),
}

impl HeartbeatFrame {
    /// Wire text for this heartbeat
    pub fn text(&self) -> String {
        match self {
            HeartbeatFrame::Literal(token) => (*token).to_string(),
            HeartbeatFrame::Json(event) => format!(r#"{{"event":"{event}"}}"#),
        }
    }
}

/// A data payload extracted from an inbound frame, still in the
/// generation's raw field shapes
#[derive(Debug, Clone)]
pub struct StreamPayload {
    pub kind: ChannelKind,
    /// Raw instrument identifier when the payload carries one
    pub instrument: Option<String>,
    /// Explicit snapshot/delta tag when the generation carries one
    pub snapshot: Option<bool>,
    pub data: Value,
}

/// Classification of one decoded inbound payload
#[derive(Debug, Clone)]
pub enum InboundMessage {
    /// Login acknowledged; the session may flush subscriptions
    LoginOk,
    LoginFailed { message: String },
    /// Subscription acknowledged for the echoed channel key
    SubscribeAck { key: String },
    UnsubscribeAck { key: String },
    /// Server-reported protocol error; logged, never fatal
    ServerError { code: String, message: String },
    /// JSON-shaped heartbeat reply (the literal text shape never reaches
    /// classification, the frame decoder strips it)
    Pong,
    Stream(StreamPayload),
    /// Recognized but irrelevant payload
    Ignored,
}

/// One wire-protocol generation: frame shapes, heartbeat token, framing,
/// and inbound classification.
///
/// The connection manager and normalizer depend only on this trait; no
/// generation-specific logic exists outside `protocol/`.
pub trait StreamingProtocol: Send + Sync {
    fn generation(&self) -> ProtocolGeneration;

    /// Default WebSocket endpoint for a channel group
    fn endpoint(&self, group: ChannelGroup) -> &'static str;

    /// Separator used inside raw instrument identifiers
    fn instrument_separator(&self) -> char;

    /// Whether inbound binary frames are raw-deflate compressed
    fn compressed_frames(&self) -> bool;

    fn heartbeat(&self) -> HeartbeatFrame;

    /// Literal text token of the server's heartbeat reply
    fn heartbeat_reply(&self) -> &'static str;

    /// Whether explicit unsubscribe frames exist in this generation
    fn supports_unsubscribe(&self) -> bool;

    fn default_side_convention(&self) -> SideConvention;

    fn batch_policy(&self, kind: ChannelKind) -> BatchPolicy;

    /// Convert a canonical `BASE-QUOTE` id to this generation's wire form
    fn wire_instrument(&self, canonical: &str) -> String;

    /// Channel key echoed by acknowledgments, used for ack matching
    fn channel_key(&self, kind: ChannelKind, instrument: Option<&str>) -> String;

    /// Subscribe frames for a group of canonical instrument ids; the
    /// number of frames follows this generation's batch policy
    fn subscribe_frames(&self, kind: ChannelKind, instruments: &[String]) -> Vec<String>;

    /// Unsubscribe frames; empty when the generation has no unsubscribe
    fn unsubscribe_frames(&self, kind: ChannelKind, instruments: &[String]) -> Vec<String>;

    /// Signed login frame for private sessions
    fn login_frame(&self, credentials: &Credentials, timestamp: &str, signature: &str) -> String;

    /// Classify one decoded payload. Array payloads may carry several
    /// logical messages, hence the Vec.
    fn classify(&self, payload: &Value) -> Vec<InboundMessage>;
}

impl ProtocolGeneration {
    /// The protocol implementation for this generation
    pub fn protocol(&self) -> &'static dyn StreamingProtocol {
        match self {
            ProtocolGeneration::Legacy => &LegacyProtocol,
            ProtocolGeneration::V2 => &V2Protocol,
            ProtocolGeneration::V3 => &V3Protocol,
        }
    }
}

/// String form of a JSON field that may be a string or a number
pub(crate) fn field_str(value: &Value, key: &str) -> Option<String> {
    match value.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
