/*
[INPUT]:  Canonical channel requests and decoded op/table payloads
[OUTPUT]: op/args wire frames and classified inbound messages
[POS]:    Protocol layer - middle generation (string channel args)
[UPDATE]: Frozen protocol; update only for classification fixes
*/

use serde_json::{Value, json};

use crate::config::Credentials;
use crate::types::{ChannelGroup, ChannelKind, ProtocolGeneration, SideConvention};

use super::{
    BatchPolicy, HeartbeatFrame, InboundMessage, StreamPayload, StreamingProtocol, field_str,
};

const ENDPOINT: &str = "wss://real.okex.com:8443/ws/v3";

/// Middle generation: `{op:"subscribe", args:["spot/<chan>:<instId>"]}`
/// framing, compressed binary frames, literal text heartbeat, table-keyed
/// data pushes with `partial`/`update` depth actions.
pub struct V2Protocol;

impl V2Protocol {
    fn channel_name(kind: ChannelKind) -> &'static str {
        match kind {
            ChannelKind::Ticker => "spot/ticker",
            ChannelKind::Depth => "spot/depth",
            ChannelKind::Trade => "spot/trade",
            ChannelKind::Order => "spot/order",
            ChannelKind::Balance => "spot/account",
        }
    }

    fn kind_of_table(table: &str) -> Option<ChannelKind> {
        match table {
            "spot/ticker" => Some(ChannelKind::Ticker),
            "spot/depth" => Some(ChannelKind::Depth),
            "spot/trade" => Some(ChannelKind::Trade),
            "spot/order" => Some(ChannelKind::Order),
            "spot/account" => Some(ChannelKind::Balance),
            _ => None,
        }
    }

    fn args(&self, kind: ChannelKind, instruments: &[String]) -> Vec<String> {
        let channel = Self::channel_name(kind);
        if instruments.is_empty() {
            vec![channel.to_string()]
        } else {
            instruments
                .iter()
                .map(|id| format!("{channel}:{}", self.wire_instrument(id)))
                .collect()
        }
    }
}

impl StreamingProtocol for V2Protocol {
    fn generation(&self) -> ProtocolGeneration {
        ProtocolGeneration::V2
    }

    fn endpoint(&self, _group: ChannelGroup) -> &'static str {
        ENDPOINT
    }

    fn instrument_separator(&self) -> char {
        '-'
    }

    fn compressed_frames(&self) -> bool {
        true
    }

    fn heartbeat(&self) -> HeartbeatFrame {
        HeartbeatFrame::Literal("ping")
    }

    fn heartbeat_reply(&self) -> &'static str {
        "pong"
    }

    fn supports_unsubscribe(&self) -> bool {
        true
    }

    fn default_side_convention(&self) -> SideConvention {
        SideConvention::TwoIsSell
    }

    fn batch_policy(&self, _kind: ChannelKind) -> BatchPolicy {
        BatchPolicy::Batched
    }

    fn wire_instrument(&self, canonical: &str) -> String {
        canonical.to_uppercase()
    }

    fn channel_key(&self, kind: ChannelKind, instrument: Option<&str>) -> String {
        let channel = Self::channel_name(kind);
        match instrument {
            Some(id) => format!("{channel}:{}", self.wire_instrument(id)),
            None => channel.to_string(),
        }
    }

    fn subscribe_frames(&self, kind: ChannelKind, instruments: &[String]) -> Vec<String> {
        vec![json!({ "op": "subscribe", "args": self.args(kind, instruments) }).to_string()]
    }

    fn unsubscribe_frames(&self, kind: ChannelKind, instruments: &[String]) -> Vec<String> {
        vec![json!({ "op": "unsubscribe", "args": self.args(kind, instruments) }).to_string()]
    }

    fn login_frame(&self, credentials: &Credentials, timestamp: &str, signature: &str) -> String {
        json!({
            "op": "login",
            "args": [credentials.api_key, credentials.passphrase, timestamp, signature],
        })
        .to_string()
    }

    fn classify(&self, payload: &Value) -> Vec<InboundMessage> {
        if let Some(event) = field_str(payload, "event") {
            let message = match event.as_str() {
                "pong" => InboundMessage::Pong,
                "login" => {
                    if payload.get("success").and_then(Value::as_bool) == Some(true) {
                        InboundMessage::LoginOk
                    } else {
                        InboundMessage::LoginFailed {
                            message: field_str(payload, "message")
                                .unwrap_or_else(|| "login rejected".into()),
                        }
                    }
                }
                "subscribe" => match field_str(payload, "channel") {
                    Some(key) => InboundMessage::SubscribeAck { key },
                    None => InboundMessage::Ignored,
                },
                "unsubscribe" => match field_str(payload, "channel") {
                    Some(key) => InboundMessage::UnsubscribeAck { key },
                    None => InboundMessage::Ignored,
                },
                "error" => InboundMessage::ServerError {
                    code: field_str(payload, "errorCode").unwrap_or_default(),
                    message: field_str(payload, "message").unwrap_or_default(),
                },
                _ => InboundMessage::Ignored,
            };
            return vec![message];
        }

        let Some(table) = field_str(payload, "table") else {
            return vec![InboundMessage::Ignored];
        };
        let Some(kind) = Self::kind_of_table(&table) else {
            return vec![InboundMessage::Ignored];
        };

        let snapshot = match kind {
            ChannelKind::Depth => field_str(payload, "action").map(|action| action == "partial"),
            _ => None,
        };

        // One table push may carry entries for several instruments; emit
        // one stream payload per entry so routing stays per-instrument
        let entries = match payload.get("data") {
            Some(Value::Array(items)) => items.clone(),
            Some(other) => vec![other.clone()],
            None => return vec![InboundMessage::Ignored],
        };

        entries
            .into_iter()
            .map(|entry| {
                let instrument =
                    field_str(&entry, "instrument_id").or_else(|| field_str(&entry, "currency"));
                InboundMessage::Stream(StreamPayload {
                    kind,
                    instrument,
                    snapshot,
                    data: entry,
                })
            })
            .collect()
    }
}
