/*
[INPUT]:  Protocol generation choice and instrument list
[OUTPUT]: Real-time canonical ticker/depth/trade events on stdout
[POS]:    Examples - public stream handling
[UPDATE]: When the streaming client API changes
*/

use okx_stream_adapter::*;
use tokio::time::{Duration, sleep};

/// Example: public market data streams
///
/// The same code serves every protocol generation; only the
/// configuration line changes. Events arrive in one canonical shape
/// regardless of which wire format produced them.
#[tokio::main]
async fn main() {
    println!("=== OKX Market Stream Example ===\n");

    // Pick a generation; the rest of the code is identical for all three
    let config = OkxConfig::new(ProtocolGeneration::V3);
    let client = match OkxWebsocketClient::new(config) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Failed to create client: {}", e);
            return;
        }
    };
    println!("✓ WebSocket client created");

    let mut tickers = match client.subscribe_tickers(&["BTC-USDT", "ETH-USDT"]) {
        Ok(handle) => handle,
        Err(e) => {
            eprintln!("Failed to subscribe: {}", e);
            return;
        }
    };
    println!("✓ Ticker subscription registered\n");

    println!("Streaming for 10 seconds...");
    let deadline = sleep(Duration::from_secs(10));
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            _ = &mut deadline => break,
            event = tickers.recv() => match event {
                Some(CanonicalEvent::Ticker(ticker)) => {
                    println!(
                        "  {} last={:?} bid={:?} ask={:?}",
                        ticker.instrument, ticker.last, ticker.best_bid, ticker.best_ask
                    );
                }
                Some(CanonicalEvent::ConnectionClosed) => {
                    println!("  connection dropped, session is reconnecting...");
                }
                Some(other) => println!("  {:?}", other),
                None => break,
            },
        }
    }

    tickers.unsubscribe();
    client.close();
    println!("\n✓ Market stream example complete");
}
