/*
[INPUT]:  Canonical channel requests and decoded legacy payloads
[OUTPUT]: addChannel-era wire frames and classified inbound messages
[POS]:    Protocol layer - oldest generation (event/parameters framing)
[UPDATE]: Frozen protocol; update only for classification fixes
*/

use serde_json::{Value, json};

use crate::config::Credentials;
use crate::types::{ChannelGroup, ChannelKind, ProtocolGeneration, SideConvention};

use super::{
    BatchPolicy, HeartbeatFrame, InboundMessage, StreamPayload, StreamingProtocol, field_str,
};

const ENDPOINT: &str = "wss://real.okex.com:10441/websocket";

/// Wire channel type for account-order and balance pushes
const ORDER_CHANNEL: &str = "spot_order_all";

/// Oldest generation: `{event:"addChannel", parameters:{...}}` framing,
/// compressed binary frames, JSON heartbeat, no unsubscribe support.
pub struct LegacyProtocol;

impl LegacyProtocol {
    fn data_type(kind: ChannelKind) -> &'static str {
        match kind {
            ChannelKind::Ticker => "ticker",
            ChannelKind::Depth => "depth",
            ChannelKind::Trade => "deal",
            ChannelKind::Order | ChannelKind::Balance => ORDER_CHANNEL,
        }
    }

    fn kind_of_type(data_type: &str) -> Option<ChannelKind> {
        match data_type {
            "ticker" => Some(ChannelKind::Ticker),
            "depth" => Some(ChannelKind::Depth),
            "deal" => Some(ChannelKind::Trade),
            ORDER_CHANNEL => Some(ChannelKind::Order),
            _ => None,
        }
    }

    /// Raw `base_quote` identifier echoed on payloads, when present
    fn payload_instrument(payload: &Value) -> Option<String> {
        match (field_str(payload, "base"), field_str(payload, "quote")) {
            (Some(base), Some(quote)) => Some(format!("{base}_{quote}")),
            _ => payload
                .get("data")
                .and_then(|data| field_str(data, "symbol")),
        }
    }

    fn classify_one(&self, payload: &Value) -> InboundMessage {
        if field_str(payload, "event").as_deref() == Some("pong") {
            return InboundMessage::Pong;
        }

        let channel = field_str(payload, "channel");
        let data = payload.get("data").cloned().unwrap_or(Value::Null);

        if channel.as_deref() == Some("login") {
            return if data.get("result").and_then(Value::as_bool) == Some(true) {
                InboundMessage::LoginOk
            } else {
                InboundMessage::LoginFailed {
                    message: field_str(&data, "error_msg")
                        .unwrap_or_else(|| "login rejected".into()),
                }
            };
        }

        if channel.as_deref() == Some("addChannel") {
            let Some(data_type) = field_str(payload, "type") else {
                return InboundMessage::Ignored;
            };
            let key = if data_type == ORDER_CHANNEL {
                ORDER_CHANNEL.to_string()
            } else if let Some(instrument) = Self::payload_instrument(payload) {
                format!("{data_type}:{instrument}")
            } else {
                data_type
            };
            return if data.get("result").and_then(Value::as_bool) == Some(true) {
                InboundMessage::SubscribeAck { key }
            } else {
                InboundMessage::ServerError {
                    code: field_str(&data, "error_code").unwrap_or_default(),
                    message: field_str(&data, "error_msg")
                        .unwrap_or_else(|| "subscription rejected".into()),
                }
            };
        }

        // Balance pushes arrive on ok_sub_spot_<currency>_balance channels
        if let Some(channel) = channel.as_deref()
            && channel.starts_with("ok_sub_spot_")
            && channel.ends_with("_balance")
        {
            let info = data.get("info").cloned().unwrap_or(data);
            return InboundMessage::Stream(StreamPayload {
                kind: ChannelKind::Balance,
                instrument: None,
                snapshot: None,
                data: info,
            });
        }

        if let Some(data_type) = field_str(payload, "type")
            && let Some(kind) = Self::kind_of_type(&data_type)
        {
            let snapshot = match kind {
                ChannelKind::Depth => {
                    Some(data.get("init").and_then(Value::as_bool).unwrap_or(false))
                }
                _ => None,
            };
            return InboundMessage::Stream(StreamPayload {
                kind,
                instrument: Self::payload_instrument(payload),
                snapshot,
                data,
            });
        }

        InboundMessage::Ignored
    }
}

impl StreamingProtocol for LegacyProtocol {
    fn generation(&self) -> ProtocolGeneration {
        ProtocolGeneration::Legacy
    }

    fn endpoint(&self, _group: ChannelGroup) -> &'static str {
        // One URI serves both channel groups in this generation
        ENDPOINT
    }

    fn instrument_separator(&self) -> char {
        '_'
    }

    fn compressed_frames(&self) -> bool {
        true
    }

    fn heartbeat(&self) -> HeartbeatFrame {
        HeartbeatFrame::Json("ping")
    }

    fn heartbeat_reply(&self) -> &'static str {
        "pong"
    }

    fn supports_unsubscribe(&self) -> bool {
        false
    }

    fn default_side_convention(&self) -> SideConvention {
        SideConvention::TwoIsSell
    }

    fn batch_policy(&self, kind: ChannelKind) -> BatchPolicy {
        match kind {
            // One addChannel frame covers all account orders and balances
            ChannelKind::Order | ChannelKind::Balance => BatchPolicy::Batched,
            _ => BatchPolicy::PerInstrument,
        }
    }

    fn wire_instrument(&self, canonical: &str) -> String {
        canonical.to_lowercase().replace('-', "_")
    }

    fn channel_key(&self, kind: ChannelKind, instrument: Option<&str>) -> String {
        match kind {
            ChannelKind::Order | ChannelKind::Balance => ORDER_CHANNEL.to_string(),
            _ => {
                let data_type = Self::data_type(kind);
                match instrument {
                    Some(id) => format!("{data_type}:{}", self.wire_instrument(id)),
                    None => data_type.to_string(),
                }
            }
        }
    }

    fn subscribe_frames(&self, kind: ChannelKind, instruments: &[String]) -> Vec<String> {
        match kind {
            ChannelKind::Order | ChannelKind::Balance => {
                vec![
                    json!({
                        "event": "addChannel",
                        "parameters": { "binary": "1", "type": ORDER_CHANNEL },
                    })
                    .to_string(),
                ]
            }
            _ => instruments
                .iter()
                .filter_map(|id| {
                    let wire = self.wire_instrument(id);
                    let (base, quote) = wire.split_once('_')?;
                    Some(
                        json!({
                            "event": "addChannel",
                            "parameters": {
                                "base": base,
                                "binary": "1",
                                "product": "spot",
                                "quote": quote,
                                "type": Self::data_type(kind),
                            },
                        })
                        .to_string(),
                    )
                })
                .collect(),
        }
    }

    fn unsubscribe_frames(&self, _kind: ChannelKind, _instruments: &[String]) -> Vec<String> {
        // No unsubscribe in this generation; the socket is closed instead
        Vec::new()
    }

    fn login_frame(&self, credentials: &Credentials, timestamp: &str, signature: &str) -> String {
        json!({
            "event": "login",
            "parameters": {
                "api_key": credentials.api_key,
                "passphrase": credentials.passphrase,
                "timestamp": timestamp,
                "sign": signature,
            },
        })
        .to_string()
    }

    fn classify(&self, payload: &Value) -> Vec<InboundMessage> {
        match payload {
            Value::Array(items) => items.iter().map(|item| self.classify_one(item)).collect(),
            _ => vec![self.classify_one(payload)],
        }
    }
}
