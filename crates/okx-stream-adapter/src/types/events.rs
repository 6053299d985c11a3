/*
[INPUT]:  Normalized exchange payload fields
[OUTPUT]: Canonical event structs delivered to subscribers
[POS]:    Data layer - the one event shape all generations map into
[UPDATE]: When a channel gains fields worth surfacing canonically
*/

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::enums::{OrderKind, OrderState, Side};

/// One canonical event, regardless of which protocol generation produced it.
///
/// `ConnectionClosed` is the sentinel emitted to every live subscription
/// when the underlying socket drops; the stream itself keeps flowing once
/// the session has reconnected and replayed its subscriptions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CanonicalEvent {
    Ticker(TickerEvent),
    Trade(TradeEvent),
    DepthSnapshot(DepthEvent),
    DepthDelta(DepthEvent),
    OrderUpdate(OrderEvent),
    BalanceUpdate(BalanceEvent),
    ConnectionClosed,
}

impl CanonicalEvent {
    /// Canonical instrument or currency identifier, when the event has one
    pub fn instrument(&self) -> Option<&str> {
        match self {
            CanonicalEvent::Ticker(e) => Some(&e.instrument),
            CanonicalEvent::Trade(e) => Some(&e.instrument),
            CanonicalEvent::DepthSnapshot(e) | CanonicalEvent::DepthDelta(e) => {
                Some(&e.instrument)
            }
            CanonicalEvent::OrderUpdate(e) => Some(&e.instrument),
            CanonicalEvent::BalanceUpdate(e) => Some(&e.currency),
            CanonicalEvent::ConnectionClosed => None,
        }
    }
}

/// Best-price summary for one instrument
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickerEvent {
    pub instrument: String,
    pub last: Option<Decimal>,
    pub best_bid: Option<Decimal>,
    pub best_ask: Option<Decimal>,
    pub high_24h: Option<Decimal>,
    pub low_24h: Option<Decimal>,
    pub volume_24h: Option<Decimal>,
    pub timestamp: DateTime<Utc>,
}

/// One executed trade
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeEvent {
    pub instrument: String,
    pub price: Decimal,
    pub size: Decimal,
    pub side: Side,
    pub timestamp: DateTime<Utc>,
}

/// One price level as `[price, size]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepthLevel {
    pub price: Decimal,
    pub size: Decimal,
}

/// Raw order-book state, either a full snapshot or an incremental delta.
///
/// The snapshot/delta distinction is carried by the enclosing
/// `CanonicalEvent` variant; this client delivers the levels as received
/// and never maintains a book.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepthEvent {
    pub instrument: String,
    pub bids: Vec<DepthLevel>,
    pub asks: Vec<DepthLevel>,
    pub timestamp: DateTime<Utc>,
}

/// Account order lifecycle update
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderEvent {
    pub instrument: String,
    pub order_id: String,
    pub state: OrderState,
    pub side: Option<Side>,
    pub kind: Option<OrderKind>,
    pub price: Option<Decimal>,
    pub size: Option<Decimal>,
    pub filled: Option<Decimal>,
    pub timestamp: DateTime<Utc>,
}

/// Account balance update for one currency
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceEvent {
    pub currency: String,
    pub free: Option<Decimal>,
    pub frozen: Option<Decimal>,
    pub timestamp: DateTime<Utc>,
}
