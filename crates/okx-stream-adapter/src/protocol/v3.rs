/*
[INPUT]:  Canonical channel requests and decoded arg/action payloads
[OUTPUT]: op/args-object wire frames and classified inbound messages
[POS]:    Protocol layer - newest generation (object channel args)
[UPDATE]: When the exchange extends the v5-style wire protocol
*/

use serde_json::{Map, Value, json};

use crate::config::Credentials;
use crate::types::{ChannelGroup, ChannelKind, ProtocolGeneration, SideConvention};

use super::{
    BatchPolicy, HeartbeatFrame, InboundMessage, StreamPayload, StreamingProtocol, field_str,
};

const PUBLIC_ENDPOINT: &str = "wss://ws.okx.com:8443/ws/v5/public";
const PRIVATE_ENDPOINT: &str = "wss://ws.okx.com:8443/ws/v5/private";

/// Newest generation: `{op:"subscribe", args:[{channel, instId}]}` framing,
/// uncompressed text frames, literal heartbeat, `snapshot`/`update` depth
/// actions, string-coded sides and order states.
pub struct V3Protocol;

impl V3Protocol {
    fn channel_name(kind: ChannelKind) -> &'static str {
        match kind {
            ChannelKind::Ticker => "tickers",
            ChannelKind::Depth => "books",
            ChannelKind::Trade => "trades",
            ChannelKind::Order => "orders",
            ChannelKind::Balance => "account",
        }
    }

    fn kind_of_channel(channel: &str) -> Option<ChannelKind> {
        match channel {
            "tickers" => Some(ChannelKind::Ticker),
            "books" => Some(ChannelKind::Depth),
            "trades" => Some(ChannelKind::Trade),
            "orders" => Some(ChannelKind::Order),
            "account" => Some(ChannelKind::Balance),
            _ => None,
        }
    }

    fn arg_object(&self, kind: ChannelKind, instrument: Option<&str>) -> Value {
        let mut arg = Map::new();
        arg.insert(
            "channel".into(),
            Value::String(Self::channel_name(kind).into()),
        );
        if let Some(id) = instrument {
            let field = match kind {
                ChannelKind::Balance => "ccy",
                _ => "instId",
            };
            arg.insert(field.into(), Value::String(self.wire_instrument(id)));
        }
        if kind == ChannelKind::Order {
            arg.insert("instType".into(), Value::String("SPOT".into()));
        }
        Value::Object(arg)
    }

    fn args(&self, kind: ChannelKind, instruments: &[String]) -> Vec<Value> {
        if instruments.is_empty() {
            vec![self.arg_object(kind, None)]
        } else {
            instruments
                .iter()
                .map(|id| self.arg_object(kind, Some(id)))
                .collect()
        }
    }

    /// Key echoed by acks: `channel` or `channel:instId`
    fn key_of_arg(arg: &Value) -> Option<String> {
        let channel = field_str(arg, "channel")?;
        let instrument = field_str(arg, "instId").or_else(|| field_str(arg, "ccy"));
        Some(match instrument {
            Some(id) => format!("{channel}:{id}"),
            None => channel,
        })
    }
}

impl StreamingProtocol for V3Protocol {
    fn generation(&self) -> ProtocolGeneration {
        ProtocolGeneration::V3
    }

    fn endpoint(&self, group: ChannelGroup) -> &'static str {
        match group {
            ChannelGroup::Public => PUBLIC_ENDPOINT,
            ChannelGroup::Private => PRIVATE_ENDPOINT,
        }
    }

    fn instrument_separator(&self) -> char {
        '-'
    }

    fn compressed_frames(&self) -> bool {
        false
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
        // Sides in this generation are string-coded; the numeric table only
        // applies to payloads that still carry integer codes
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
            "args": [{
                "apiKey": credentials.api_key,
                "passphrase": credentials.passphrase,
                "timestamp": timestamp,
                "sign": signature,
            }],
        })
        .to_string()
    }

    fn classify(&self, payload: &Value) -> Vec<InboundMessage> {
        if let Some(event) = field_str(payload, "event") {
            let message = match event.as_str() {
                "pong" => InboundMessage::Pong,
                "login" => {
                    if field_str(payload, "code").as_deref().unwrap_or("0") == "0" {
                        InboundMessage::LoginOk
                    } else {
                        InboundMessage::LoginFailed {
                            message: field_str(payload, "msg")
                                .unwrap_or_else(|| "login rejected".into()),
                        }
                    }
                }
                "subscribe" => match payload.get("arg").and_then(Self::key_of_arg) {
                    Some(key) => InboundMessage::SubscribeAck { key },
                    None => InboundMessage::Ignored,
                },
                "unsubscribe" => match payload.get("arg").and_then(Self::key_of_arg) {
                    Some(key) => InboundMessage::UnsubscribeAck { key },
                    None => InboundMessage::Ignored,
                },
                "error" => InboundMessage::ServerError {
                    code: field_str(payload, "code").unwrap_or_default(),
                    message: field_str(payload, "msg").unwrap_or_default(),
                },
                _ => InboundMessage::Ignored,
            };
            return vec![message];
        }

        let Some(arg) = payload.get("arg") else {
            return vec![InboundMessage::Ignored];
        };
        let Some(kind) = field_str(arg, "channel")
            .as_deref()
            .and_then(Self::kind_of_channel)
        else {
            return vec![InboundMessage::Ignored];
        };

        let arg_instrument = field_str(arg, "instId").or_else(|| field_str(arg, "ccy"));
        let snapshot = match kind {
            ChannelKind::Depth => field_str(payload, "action").map(|action| action == "snapshot"),
            _ => None,
        };

        let entries = match payload.get("data") {
            Some(Value::Array(items)) => items.clone(),
            Some(other) => vec![other.clone()],
            None => return vec![InboundMessage::Ignored],
        };

        entries
            .into_iter()
            .map(|entry| {
                let instrument = field_str(&entry, "instId")
                    .or_else(|| field_str(&entry, "ccy"))
                    .or_else(|| arg_instrument.clone());
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
