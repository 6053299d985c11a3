/*
[INPUT]:  Raw frames from each protocol generation
[OUTPUT]: Test results for classification and canonical normalization
[POS]:    Integration tests - protocol and normalizer pipeline
[UPDATE]: When generation payload shapes or canonical mappings change
*/

use rstest::rstest;
use serde_json::{Value, json};

use okx_stream_adapter::{
    CanonicalEvent, InboundMessage, MessageNormalizer, OrderState, ProtocolGeneration, Side,
    SideConvention, StreamingProtocol, canonical_currency,
};

/// Run a raw frame through classification and normalization for one
/// generation, collecting the canonical events
fn pipeline(
    generation: ProtocolGeneration,
    convention: Option<SideConvention>,
    frame: Value,
) -> Vec<CanonicalEvent> {
    let protocol = generation.protocol();
    let mut normalizer = MessageNormalizer::new(protocol, convention);
    protocol
        .classify(&frame)
        .into_iter()
        .filter_map(|inbound| match inbound {
            InboundMessage::Stream(payload) => Some(normalizer.normalize(payload)),
            _ => None,
        })
        .flatten()
        .collect()
}

#[rstest]
#[case("-1", OrderState::Canceled)]
#[case("4", OrderState::Canceled)]
#[case("2", OrderState::Closed)]
#[case("0", OrderState::Open)]
#[case("1", OrderState::Open)]
#[case("3", OrderState::Open)]
fn test_numeric_order_status_codes(#[case] status: &str, #[case] expected: OrderState) {
    let frame = json!([{
        "channel": "ok_sub_spot_order",
        "type": "spot_order_all",
        "base": "btc",
        "quote": "usdt",
        "data": {
            "orderId": "77",
            "status": status,
            "side": 1,
            "type": 0,
            "price": "100",
            "amount": "2",
            "createdDate": 1700000000000i64,
        },
    }]);
    let events = pipeline(ProtocolGeneration::Legacy, None, frame);
    match &events[0] {
        CanonicalEvent::OrderUpdate(event) => assert_eq!(event.state, expected),
        other => panic!("expected order update, got {other:?}"),
    }
}

#[rstest]
#[case(ProtocolGeneration::Legacy)]
#[case(ProtocolGeneration::V2)]
#[case(ProtocolGeneration::V3)]
fn test_named_order_states_map_the_same_everywhere(#[case] generation: ProtocolGeneration) {
    let frame = match generation {
        ProtocolGeneration::Legacy => json!([{
            "channel": "ok_sub_spot_order",
            "type": "spot_order_all",
            "base": "btc",
            "quote": "usdt",
            "data": { "orderId": "1", "status": "canceled" },
        }]),
        ProtocolGeneration::V2 => json!({
            "table": "spot/order",
            "data": [{ "instrument_id": "BTC-USDT", "order_id": "1", "state": "canceled" }],
        }),
        ProtocolGeneration::V3 => json!({
            "arg": { "channel": "orders", "instType": "SPOT" },
            "data": [{ "instId": "BTC-USDT", "ordId": "1", "state": "canceled" }],
        }),
    };
    let events = pipeline(generation, None, frame);
    match &events[0] {
        CanonicalEvent::OrderUpdate(event) => {
            assert_eq!(event.state, OrderState::Canceled);
            assert_eq!(event.instrument, "BTC-USDT");
        }
        other => panic!("expected order update, got {other:?}"),
    }
}

#[rstest]
#[case(SideConvention::TwoIsSell, 2, Side::Sell)]
#[case(SideConvention::TwoIsSell, 1, Side::Buy)]
#[case(SideConvention::TwoIsBuy, 2, Side::Buy)]
#[case(SideConvention::TwoIsBuy, 1, Side::Sell)]
fn test_numeric_trade_sides_follow_the_configured_convention(
    #[case] convention: SideConvention,
    #[case] code: i64,
    #[case] expected: Side,
) {
    let frame = json!([{
        "channel": "ok_sub_spot_btc_usdt_deals",
        "type": "deal",
        "base": "btc",
        "quote": "usdt",
        "data": [{ "price": "100", "amount": "1", "side": code, "time": 1700000000000i64 }],
    }]);
    let events = pipeline(ProtocolGeneration::Legacy, Some(convention), frame);
    match &events[0] {
        CanonicalEvent::Trade(trade) => assert_eq!(trade.side, expected),
        other => panic!("expected trade, got {other:?}"),
    }
}

#[test]
fn test_string_trade_sides_ignore_the_convention() {
    let frame = json!({
        "arg": { "channel": "trades", "instId": "BTC-USDT" },
        "data": [{ "instId": "BTC-USDT", "px": "100", "sz": "1", "side": "sell" }],
    });
    // Even under the flipped convention a named side means what it says
    let events = pipeline(
        ProtocolGeneration::V3,
        Some(SideConvention::TwoIsBuy),
        frame,
    );
    match &events[0] {
        CanonicalEvent::Trade(trade) => assert_eq!(trade.side, Side::Sell),
        other => panic!("expected trade, got {other:?}"),
    }
}

#[rstest]
#[case("FAIR", "FAIRGAME")]
#[case("HOT", "HYDRO")]
#[case("HSR", "HC")]
#[case("MAG", "MAGGIE")]
#[case("YOYO", "YOYOW")]
#[case("yoyo", "YOYOW")]
#[case("BTC", "BTC")]
fn test_currency_aliases(#[case] raw: &str, #[case] expected: &str) {
    let canonical = canonical_currency(raw);
    assert_eq!(canonical, expected);
    // Aliasing is idempotent
    assert_eq!(canonical_currency(&canonical), expected);
}

#[rstest]
#[case(ProtocolGeneration::Legacy, json!([{
    "channel": "ok_sub_spot_btc_usdt_ticker",
    "type": "ticker",
    "base": "btc",
    "quote": "usdt",
    "data": { "last": "50000", "buy": "49990", "sell": "50010", "timestamp": 1700000000000i64 },
}]))]
#[case(ProtocolGeneration::V2, json!({
    "table": "spot/ticker",
    "data": [{ "instrument_id": "BTC-USDT", "last": "50000", "best_bid": "49990", "best_ask": "50010" }],
}))]
#[case(ProtocolGeneration::V3, json!({
    "arg": { "channel": "tickers", "instId": "BTC-USDT" },
    "data": [{ "instId": "BTC-USDT", "last": "50000", "bidPx": "49990", "askPx": "50010" }],
}))]
fn test_every_generation_converges_on_one_ticker_shape(
    #[case] generation: ProtocolGeneration,
    #[case] frame: Value,
) {
    let events = pipeline(generation, None, frame);
    assert_eq!(events.len(), 1);
    match &events[0] {
        CanonicalEvent::Ticker(ticker) => {
            assert_eq!(ticker.instrument, "BTC-USDT");
            assert_eq!(ticker.last.unwrap().to_string(), "50000");
            assert_eq!(ticker.best_bid.unwrap().to_string(), "49990");
            assert_eq!(ticker.best_ask.unwrap().to_string(), "50010");
        }
        other => panic!("expected ticker, got {other:?}"),
    }
}

#[test]
fn test_legacy_depth_init_flag_decides_snapshot() {
    let protocol = ProtocolGeneration::Legacy.protocol();
    let mut normalizer = MessageNormalizer::new(protocol, None);

    let with_init = json!([{
        "channel": "ok_sub_spot_btc_usdt_depth",
        "type": "depth",
        "base": "btc",
        "quote": "usdt",
        "data": { "init": true, "bids": [["100", "1"]], "asks": [["101", "1"]] },
    }]);
    let without_init = json!([{
        "channel": "ok_sub_spot_btc_usdt_depth",
        "type": "depth",
        "base": "btc",
        "quote": "usdt",
        "data": { "bids": [["100", "2"]], "asks": [["101", "2"]] },
    }]);

    let mut run = |frame: &Value| -> Vec<CanonicalEvent> {
        protocol
            .classify(frame)
            .into_iter()
            .filter_map(|inbound| match inbound {
                InboundMessage::Stream(payload) => Some(normalizer.normalize(payload)),
                _ => None,
            })
            .flatten()
            .collect()
    };

    assert!(matches!(
        run(&with_init)[0],
        CanonicalEvent::DepthSnapshot(_)
    ));
    assert!(matches!(run(&without_init)[0], CanonicalEvent::DepthDelta(_)));
}
