/*
[INPUT]:  Classified stream payloads in generation-specific field shapes
[OUTPUT]: Canonical events with alias-resolved instruments
[POS]:    WebSocket layer - the one normalization point for all generations
[UPDATE]: When a generation renames payload fields
*/

use std::collections::HashSet;

use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use serde_json::Value;
use tracing::debug;

use crate::protocol::{StreamPayload, StreamingProtocol};
use crate::types::{
    BalanceEvent, CanonicalEvent, ChannelKind, DepthEvent, DepthLevel, OrderEvent, OrderKind,
    OrderState, Side, SideConvention, TickerEvent, TradeEvent, canonical_currency,
    canonical_instrument, order_kind_of, order_state_of,
};

/// Maps classified payloads into canonical events.
///
/// Holds per-connection-epoch depth state: generations without an explicit
/// snapshot flag tag the first depth payload per instrument as a snapshot,
/// and `reset_epoch` makes the first payload after a reconnect a fresh
/// snapshot again.
pub struct MessageNormalizer {
    separator: char,
    side_convention: SideConvention,
    seen_depth: HashSet<String>,
}

impl MessageNormalizer {
    pub fn new(protocol: &dyn StreamingProtocol, convention: Option<SideConvention>) -> Self {
        Self {
            separator: protocol.instrument_separator(),
            side_convention: convention.unwrap_or_else(|| protocol.default_side_convention()),
            seen_depth: HashSet::new(),
        }
    }

    /// Forget per-epoch depth state; called whenever the session reconnects
    pub fn reset_epoch(&mut self) {
        self.seen_depth.clear();
    }

    /// Map one stream payload into zero or more canonical events
    pub fn normalize(&mut self, payload: StreamPayload) -> Vec<CanonicalEvent> {
        let instrument = payload
            .instrument
            .as_deref()
            .map(|raw| canonical_instrument(raw, self.separator));

        match payload.kind {
            ChannelKind::Ticker => self.ticker(instrument, &payload.data),
            ChannelKind::Trade => self.trades(instrument, &payload.data),
            ChannelKind::Depth => self.depth(instrument, payload.snapshot, &payload.data),
            ChannelKind::Order => self.order(instrument, &payload.data),
            ChannelKind::Balance => self.balance(&payload.data),
        }
    }

    fn ticker(&self, instrument: Option<String>, data: &Value) -> Vec<CanonicalEvent> {
        let Some(instrument) =
            instrument.or_else(|| field_str(data, &["symbol"]).map(|s| canonical_instrument(&s, self.separator)))
        else {
            debug!("ticker payload without instrument, skipping");
            return Vec::new();
        };
        vec![CanonicalEvent::Ticker(TickerEvent {
            instrument,
            last: decimal_field(data, &["last", "last_price"]),
            best_bid: decimal_field(data, &["bidPx", "best_bid", "buy"]),
            best_ask: decimal_field(data, &["askPx", "best_ask", "sell"]),
            high_24h: decimal_field(data, &["high24h", "high_24h", "high"]),
            low_24h: decimal_field(data, &["low24h", "low_24h", "low"]),
            volume_24h: decimal_field(data, &["vol24h", "base_volume_24h", "vol", "volume"]),
            timestamp: timestamp_field(data),
        })]
    }

    fn trades(&self, instrument: Option<String>, data: &Value) -> Vec<CanonicalEvent> {
        let Some(instrument) = instrument else {
            debug!("trade payload without instrument, skipping");
            return Vec::new();
        };
        let records = match data {
            Value::Array(items) => items.as_slice(),
            single => std::slice::from_ref(single),
        };
        records
            .iter()
            .filter_map(|record| {
                let price = decimal_field(record, &["px", "price"])?;
                let size = decimal_field(record, &["sz", "size", "amount", "qty"])?;
                let side = self.side_field(record)?;
                Some(CanonicalEvent::Trade(TradeEvent {
                    instrument: instrument.clone(),
                    price,
                    size,
                    side,
                    timestamp: timestamp_field(record),
                }))
            })
            .collect()
    }

    fn depth(
        &mut self,
        instrument: Option<String>,
        snapshot: Option<bool>,
        data: &Value,
    ) -> Vec<CanonicalEvent> {
        let Some(instrument) = instrument else {
            debug!("depth payload without instrument, skipping");
            return Vec::new();
        };
        let event = DepthEvent {
            instrument: instrument.clone(),
            bids: levels(data.get("bids")),
            asks: levels(data.get("asks")),
            timestamp: timestamp_field(data),
        };
        // Explicit wire flag wins; otherwise the first payload per
        // instrument in this connection epoch is the snapshot
        let is_snapshot = snapshot.unwrap_or_else(|| !self.seen_depth.contains(&instrument));
        self.seen_depth.insert(instrument);
        if is_snapshot {
            vec![CanonicalEvent::DepthSnapshot(event)]
        } else {
            vec![CanonicalEvent::DepthDelta(event)]
        }
    }

    fn order(&self, instrument: Option<String>, data: &Value) -> Vec<CanonicalEvent> {
        let instrument = instrument
            .or_else(|| field_str(data, &["instId", "instrument_id", "symbol"]))
            .map(|raw| canonical_instrument(&raw, self.separator))
            .unwrap_or_default();
        let state = match data.get("state").or_else(|| data.get("status")) {
            Some(Value::String(text)) => match text.parse::<i64>() {
                Ok(code) => order_state_of(code),
                Err(_) => order_state_of_str(text),
            },
            Some(Value::Number(n)) => order_state_of(n.as_i64().unwrap_or(0)),
            _ => OrderState::Open,
        };
        vec![CanonicalEvent::OrderUpdate(OrderEvent {
            instrument,
            order_id: field_str(data, &["ordId", "order_id", "orderId"]).unwrap_or_default(),
            state,
            side: self.side_field(data),
            kind: order_kind(data),
            price: decimal_field(data, &["px", "price"]),
            size: decimal_field(data, &["sz", "size", "amount", "qty"]),
            filled: decimal_field(data, &["accFillSz", "filled_size", "deal_amount", "fillQty"]),
            timestamp: timestamp_field(data),
        })]
    }

    fn balance(&self, data: &Value) -> Vec<CanonicalEvent> {
        let timestamp = timestamp_field(data);

        // Newest generation nests per-currency records under "details"
        if let Some(Value::Array(details)) = data.get("details") {
            return details
                .iter()
                .flat_map(|detail| self.balance(detail))
                .collect();
        }

        // Combined shape: {free: {cur: amt}, freezed: {cur: amt}}
        if let Some(Value::Object(free)) = data.get("free") {
            let frozen = data
                .get("freezed")
                .or_else(|| data.get("frozen"))
                .and_then(Value::as_object);
            let mut currencies: Vec<&String> = free.keys().collect();
            if let Some(frozen) = frozen {
                for key in frozen.keys() {
                    if !currencies.contains(&key) {
                        currencies.push(key);
                    }
                }
            }
            return currencies
                .into_iter()
                .map(|code| {
                    CanonicalEvent::BalanceUpdate(BalanceEvent {
                        currency: canonical_currency(code),
                        free: free.get(code).and_then(decimal_value),
                        frozen: frozen
                            .and_then(|map| map.get(code))
                            .and_then(decimal_value),
                        timestamp,
                    })
                })
                .collect();
        }

        // Flat record shape: {currency, balance/available, hold/frozen}
        let Some(currency) = field_str(data, &["ccy", "currency", "coin"]) else {
            debug!("balance payload without currency, skipping");
            return Vec::new();
        };
        vec![CanonicalEvent::BalanceUpdate(BalanceEvent {
            currency: canonical_currency(&currency),
            free: decimal_field(data, &["availBal", "available", "free", "balance"]),
            frozen: decimal_field(data, &["frozenBal", "hold", "frozen", "freezed"]),
            timestamp,
        })]
    }

    /// Side field may be a string code or a numeric convention-mapped code
    fn side_field(&self, data: &Value) -> Option<Side> {
        match data.get("side")? {
            Value::String(text) => match text.parse::<i64>() {
                Ok(code) => Some(self.side_convention.decode(code)),
                Err(_) => match text.to_lowercase().as_str() {
                    "buy" | "bid" => Some(Side::Buy),
                    "sell" | "ask" => Some(Side::Sell),
                    _ => None,
                },
            },
            Value::Number(n) => Some(self.side_convention.decode(n.as_i64()?)),
            _ => None,
        }
    }
}

fn order_state_of_str(state: &str) -> OrderState {
    match state.to_lowercase().as_str() {
        "canceled" | "cancelled" | "mmp_canceled" => OrderState::Canceled,
        "filled" => OrderState::Closed,
        _ => OrderState::Open,
    }
}

fn order_kind(data: &Value) -> Option<OrderKind> {
    match data
        .get("ordType")
        .or_else(|| data.get("orderType"))
        .or_else(|| data.get("type"))?
    {
        Value::String(text) => match text.parse::<i64>() {
            Ok(code) => order_kind_of(code),
            Err(_) => match text.to_lowercase().as_str() {
                "limit" => Some(OrderKind::Limit),
                "market" => Some(OrderKind::Market),
                _ => None,
            },
        },
        Value::Number(n) => order_kind_of(n.as_i64()?),
        _ => None,
    }
}

fn field_str(data: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match data.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn decimal_value(value: &Value) -> Option<Decimal> {
    match value {
        Value::String(s) => s.parse().ok(),
        Value::Number(n) => n.to_string().parse().ok(),
        _ => None,
    }
}

fn decimal_field(data: &Value, keys: &[&str]) -> Option<Decimal> {
    keys.iter().find_map(|key| decimal_value(data.get(key)?))
}

fn levels(value: Option<&Value>) -> Vec<DepthLevel> {
    let Some(Value::Array(rows)) = value else {
        return Vec::new();
    };
    rows.iter()
        .filter_map(|row| {
            let row = row.as_array()?;
            Some(DepthLevel {
                price: decimal_value(row.first()?)?,
                size: decimal_value(row.get(1)?)?,
            })
        })
        .collect()
}

/// Millisecond timestamp from the payload, falling back to receive time
fn timestamp_field(data: &Value) -> DateTime<Utc> {
    let millis = ["ts", "timestamp", "uTime", "cTime", "createdDate", "time"]
        .iter()
        .find_map(|key| match data.get(key)? {
            Value::String(s) => s.parse::<i64>().ok(),
            Value::Number(n) => n.as_i64(),
            _ => None,
        });
    millis
        .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
        .unwrap_or_else(Utc::now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{LegacyProtocol, V3Protocol};
    use serde_json::json;

    fn payload(kind: ChannelKind, instrument: Option<&str>, snapshot: Option<bool>, data: Value) -> StreamPayload {
        StreamPayload {
            kind,
            instrument: instrument.map(String::from),
            snapshot,
            data,
        }
    }

    #[test]
    fn test_ticker_alias_resolution() {
        let mut normalizer = MessageNormalizer::new(&LegacyProtocol, None);
        let events = normalizer.normalize(payload(
            ChannelKind::Ticker,
            Some("hsr_usdt"),
            None,
            json!({ "last": "12.5", "buy": "12.4", "sell": "12.6", "ts": 1700000000000i64 }),
        ));
        match &events[0] {
            CanonicalEvent::Ticker(ticker) => {
                assert_eq!(ticker.instrument, "HC-USDT");
                assert_eq!(ticker.last, Some("12.5".parse().unwrap()));
                assert_eq!(ticker.best_bid, Some("12.4".parse().unwrap()));
            }
            other => panic!("expected ticker, got {other:?}"),
        }
    }

    #[test]
    fn test_unaliased_instrument_round_trips() {
        let mut normalizer = MessageNormalizer::new(&V3Protocol, None);
        let events = normalizer.normalize(payload(
            ChannelKind::Ticker,
            Some("BTC-USDT"),
            None,
            json!({ "last": "50000" }),
        ));
        assert_eq!(events[0].instrument(), Some("BTC-USDT"));
    }

    #[test]
    fn test_trade_numeric_side_conventions() {
        let trade = json!({ "price": "1", "amount": "2", "side": 2 });

        let mut default = MessageNormalizer::new(&LegacyProtocol, None);
        let events = default.normalize(payload(ChannelKind::Trade, Some("btc_usdt"), None, trade.clone()));
        assert!(matches!(&events[0], CanonicalEvent::Trade(t) if t.side == Side::Sell));

        let mut inverted =
            MessageNormalizer::new(&LegacyProtocol, Some(SideConvention::TwoIsBuy));
        let events = inverted.normalize(payload(ChannelKind::Trade, Some("btc_usdt"), None, trade));
        assert!(matches!(&events[0], CanonicalEvent::Trade(t) if t.side == Side::Buy));
    }

    #[test]
    fn test_trade_string_side_bypasses_convention() {
        let mut normalizer =
            MessageNormalizer::new(&V3Protocol, Some(SideConvention::TwoIsBuy));
        let events = normalizer.normalize(payload(
            ChannelKind::Trade,
            Some("BTC-USDT"),
            None,
            json!({ "px": "50000", "sz": "0.1", "side": "sell" }),
        ));
        assert!(matches!(&events[0], CanonicalEvent::Trade(t) if t.side == Side::Sell));
    }

    #[test]
    fn test_legacy_trade_batch() {
        let mut normalizer = MessageNormalizer::new(&LegacyProtocol, None);
        let events = normalizer.normalize(payload(
            ChannelKind::Trade,
            Some("btc_usdt"),
            None,
            json!([
                { "price": "1", "amount": "2", "side": 1 },
                { "price": "3", "amount": "4", "side": 2 },
            ]),
        ));
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn test_depth_first_seen_fallback_and_epoch_reset() {
        let mut normalizer = MessageNormalizer::new(&V3Protocol, None);
        let book = json!({ "bids": [["1", "2"]], "asks": [["3", "4"]] });

        let first = normalizer.normalize(payload(ChannelKind::Depth, Some("ETH-USDT"), None, book.clone()));
        assert!(matches!(first[0], CanonicalEvent::DepthSnapshot(_)));

        let second = normalizer.normalize(payload(ChannelKind::Depth, Some("ETH-USDT"), None, book.clone()));
        assert!(matches!(second[0], CanonicalEvent::DepthDelta(_)));

        normalizer.reset_epoch();
        let after_reconnect =
            normalizer.normalize(payload(ChannelKind::Depth, Some("ETH-USDT"), None, book));
        assert!(matches!(after_reconnect[0], CanonicalEvent::DepthSnapshot(_)));
    }

    #[test]
    fn test_depth_explicit_flag_wins() {
        let mut normalizer = MessageNormalizer::new(&V3Protocol, None);
        let book = json!({ "bids": [], "asks": [] });

        // Explicit delta on an unseen instrument stays a delta
        let events = normalizer.normalize(payload(
            ChannelKind::Depth,
            Some("ETH-USDT"),
            Some(false),
            book.clone(),
        ));
        assert!(matches!(events[0], CanonicalEvent::DepthDelta(_)));

        let events =
            normalizer.normalize(payload(ChannelKind::Depth, Some("ETH-USDT"), Some(true), book));
        assert!(matches!(events[0], CanonicalEvent::DepthSnapshot(_)));
    }

    #[test]
    fn test_order_numeric_status_codes() {
        let mut normalizer = MessageNormalizer::new(&LegacyProtocol, None);
        for (code, state) in [
            (-1, OrderState::Canceled),
            (4, OrderState::Canceled),
            (2, OrderState::Closed),
            (0, OrderState::Open),
            (5, OrderState::Open),
        ] {
            let events = normalizer.normalize(payload(
                ChannelKind::Order,
                None,
                None,
                json!({ "symbol": "btc_usdt", "orderId": 7, "status": code, "orderType": 0 }),
            ));
            match &events[0] {
                CanonicalEvent::OrderUpdate(order) => {
                    assert_eq!(order.state, state, "status code {code}");
                    assert_eq!(order.kind, Some(OrderKind::Limit));
                    assert_eq!(order.instrument, "BTC-USDT");
                }
                other => panic!("expected order, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_order_string_states() {
        let mut normalizer = MessageNormalizer::new(&V3Protocol, None);
        let events = normalizer.normalize(payload(
            ChannelKind::Order,
            Some("BTC-USDT"),
            None,
            json!({ "ordId": "123", "state": "canceled", "ordType": "market", "side": "buy" }),
        ));
        match &events[0] {
            CanonicalEvent::OrderUpdate(order) => {
                assert_eq!(order.state, OrderState::Canceled);
                assert_eq!(order.kind, Some(OrderKind::Market));
                assert_eq!(order.side, Some(Side::Buy));
            }
            other => panic!("expected order, got {other:?}"),
        }
    }

    #[test]
    fn test_balance_combined_shape() {
        let mut normalizer = MessageNormalizer::new(&LegacyProtocol, None);
        let events = normalizer.normalize(payload(
            ChannelKind::Balance,
            None,
            None,
            json!({
                "free": { "btc": "1.5", "hsr": "10" },
                "freezed": { "btc": "0.5" },
            }),
        ));
        assert_eq!(events.len(), 2);
        let currencies: Vec<&str> = events.iter().filter_map(|e| e.instrument()).collect();
        assert!(currencies.contains(&"BTC"));
        assert!(currencies.contains(&"HC"));
    }

    #[test]
    fn test_balance_flat_shape() {
        let mut normalizer = MessageNormalizer::new(&V3Protocol, None);
        let events = normalizer.normalize(payload(
            ChannelKind::Balance,
            None,
            None,
            json!({ "ccy": "yoyo", "availBal": "100", "frozenBal": "1" }),
        ));
        match &events[0] {
            CanonicalEvent::BalanceUpdate(balance) => {
                assert_eq!(balance.currency, "YOYOW");
                assert_eq!(balance.free, Some("100".parse().unwrap()));
                assert_eq!(balance.frozen, Some("1".parse().unwrap()));
            }
            other => panic!("expected balance, got {other:?}"),
        }
    }

    #[test]
    fn test_balance_details_shape() {
        let mut normalizer = MessageNormalizer::new(&V3Protocol, None);
        let events = normalizer.normalize(payload(
            ChannelKind::Balance,
            None,
            None,
            json!({ "details": [
                { "ccy": "BTC", "availBal": "1" },
                { "ccy": "ETH", "availBal": "2" },
            ]}),
        ));
        assert_eq!(events.len(), 2);
    }
}
