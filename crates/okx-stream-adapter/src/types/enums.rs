/*
[INPUT]:  Exchange wire codes and serde requirements
[OUTPUT]: Typed Rust enums with serialization support
[POS]:    Data layer - canonical enums shared across the crate
[UPDATE]: When the exchange adds channels or changes code tables
*/

use serde::{Deserialize, Serialize};

/// Trade/order side, canonical across all protocol generations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

/// Canonical order lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderState {
    Open,
    Closed,
    Canceled,
}

/// Canonical order type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderKind {
    Limit,
    Market,
}

/// Logical stream kind on the exchange's wire protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    Ticker,
    Depth,
    Trade,
    Order,
    Balance,
}

impl ChannelKind {
    /// Channel group sharing one physical connection
    pub fn group(&self) -> ChannelGroup {
        match self {
            ChannelKind::Ticker | ChannelKind::Depth | ChannelKind::Trade => ChannelGroup::Public,
            ChannelKind::Order | ChannelKind::Balance => ChannelGroup::Private,
        }
    }

    /// Private channels require a signed login before subscribing
    pub fn requires_auth(&self) -> bool {
        self.group() == ChannelGroup::Private
    }
}

/// Public and private channels run over independent sockets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelGroup {
    Public,
    Private,
}

/// The three incompatible wire-protocol generations of the exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolGeneration {
    Legacy,
    V2,
    V3,
}

/// Numeric trade-side convention.
///
/// Two observed revisions of the same protocol generation disagree on
/// whether code `2` means sell or buy. The convention is configurable per
/// client; verify against current exchange documentation before relying on
/// the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SideConvention {
    /// `2` decodes to sell, everything else to buy
    TwoIsSell,
    /// Inverted revision: `2` decodes to buy, everything else to sell
    TwoIsBuy,
}

impl SideConvention {
    /// Decode a numeric side code under this convention
    pub fn decode(&self, code: i64) -> Side {
        match (self, code) {
            (SideConvention::TwoIsSell, 2) => Side::Sell,
            (SideConvention::TwoIsSell, _) => Side::Buy,
            (SideConvention::TwoIsBuy, 2) => Side::Buy,
            (SideConvention::TwoIsBuy, _) => Side::Sell,
        }
    }
}

/// Map a numeric order-status code to its canonical state.
///
/// Wire codes: -1 cancelled, 0 unfilled, 1 partially filled, 2 fully
/// filled, 3 cancel in process, 4 failed, 5 placing.
pub fn order_state_of(status: i64) -> OrderState {
    match status {
        -1 | 4 => OrderState::Canceled,
        2 => OrderState::Closed,
        _ => OrderState::Open,
    }
}

/// Map a numeric order-type code; unknown codes carry no canonical type
pub fn order_kind_of(code: i64) -> Option<OrderKind> {
    match code {
        0 => Some(OrderKind::Limit),
        1 => Some(OrderKind::Market),
        _ => None,
    }
}
