/*
[INPUT]:  Raw WebSocket frames (text or compressed binary)
[OUTPUT]: Decoded JSON payloads or heartbeat classification
[POS]:    WebSocket layer - stateless frame decoding
[UPDATE]: When a generation changes its framing or compression
*/

use std::io::Read;

use flate2::read::DeflateDecoder;
use serde_json::Value;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::debug;

use crate::protocol::StreamingProtocol;

/// Outcome of decoding one inbound frame
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedFrame {
    /// Literal heartbeat reply; discarded by the session, never forwarded
    Heartbeat,
    /// Parsed JSON payload ready for classification
    Payload(Value),
}

/// Decode a raw frame into UTF-8 JSON.
///
/// Binary frames are raw-deflate decompressed when the generation
/// compresses them. Empty or undecodable payloads return `None` and are
/// logged as skips; decoding never fails across this boundary.
pub fn decode_frame(message: &WsMessage, protocol: &dyn StreamingProtocol) -> Option<DecodedFrame> {
    let text = match message {
        WsMessage::Text(text) => text.as_str().to_string(),
        WsMessage::Binary(bytes) if protocol.compressed_frames() => {
            let mut decoder = DeflateDecoder::new(&bytes[..]);
            let mut inflated = String::new();
            match decoder.read_to_string(&mut inflated) {
                Ok(_) => inflated,
                Err(error) => {
                    debug!(%error, bytes = bytes.len(), "skipping undecodable binary frame");
                    return None;
                }
            }
        }
        WsMessage::Binary(bytes) => match std::str::from_utf8(bytes) {
            Ok(text) => text.to_string(),
            Err(error) => {
                debug!(%error, bytes = bytes.len(), "skipping non-utf8 binary frame");
                return None;
            }
        },
        _ => return None,
    };

    if text.is_empty() {
        debug!("skipping empty frame");
        return None;
    }

    if text == protocol.heartbeat_reply() {
        return Some(DecodedFrame::Heartbeat);
    }

    match serde_json::from_str(&text) {
        Ok(payload) => Some(DecodedFrame::Payload(payload)),
        Err(error) => {
            debug!(%error, bytes = text.len(), "skipping unparsable frame");
            None
        }
    }
}
