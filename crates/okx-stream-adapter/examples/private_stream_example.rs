/*
[INPUT]:  API credentials from environment variables
[OUTPUT]: Real-time order and balance updates on stdout
[POS]:    Examples - authenticated stream handling
[UPDATE]: When the private channel API changes
*/

use okx_stream_adapter::*;

/// Example: authenticated account streams
///
/// Private channels (orders, balances) need API credentials. The login
/// handshake happens inside the session; subscriptions queued before it
/// completes are flushed once the server accepts the login.
#[tokio::main]
async fn main() {
    println!("=== OKX Private Stream Example ===\n");

    let credentials = match (
        std::env::var("OKX_API_KEY"),
        std::env::var("OKX_API_SECRET"),
        std::env::var("OKX_PASSPHRASE"),
    ) {
        (Ok(api_key), Ok(secret), Ok(passphrase)) => Credentials {
            api_key,
            secret,
            passphrase,
        },
        _ => {
            eprintln!("Set OKX_API_KEY, OKX_API_SECRET and OKX_PASSPHRASE first");
            return;
        }
    };

    let config = OkxConfig::new(ProtocolGeneration::V3).with_credentials(credentials);
    let client = match OkxWebsocketClient::new(config) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Failed to create client: {}", e);
            return;
        }
    };
    println!("✓ WebSocket client created");

    let mut orders = client.subscribe_orders(&["BTC-USDT"]).expect("subscribe orders");
    let mut balances = client.subscribe_balance(&[]).expect("subscribe balances");
    println!("✓ Order and balance subscriptions registered\n");

    loop {
        tokio::select! {
            event = orders.recv() => match event {
                Some(CanonicalEvent::OrderUpdate(order)) => {
                    println!(
                        "  order {} {} state={:?} filled={:?}",
                        order.order_id, order.instrument, order.state, order.filled
                    );
                }
                Some(_) => {}
                None => break,
            },
            event = balances.recv() => match event {
                Some(CanonicalEvent::BalanceUpdate(balance)) => {
                    println!(
                        "  balance {} free={:?} frozen={:?}",
                        balance.currency, balance.free, balance.frozen
                    );
                }
                Some(_) => {}
                None => break,
            },
        }
    }

    client.close();
    println!("\n✓ Private stream example complete");
}
