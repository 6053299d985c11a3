/*
[INPUT]:  Test scenarios needing a live WebSocket endpoint
[OUTPUT]: In-process mock exchange server and frame helpers
[POS]:    Test infrastructure - shared across all test modules
[UPDATE]: When adding new test patterns or fixtures
*/

//! Common test utilities for okx-stream-adapter tests

use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{WebSocketStream, accept_async};

/// In-process exchange endpoint the client connects to over plain TCP
pub struct MockExchange {
    listener: TcpListener,
    url: String,
}

impl MockExchange {
    pub async fn bind() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind listener");
        let url = format!("ws://{}", listener.local_addr().expect("local addr"));
        Self { listener, url }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Wait for the next client connection and complete the handshake
    pub async fn accept(&self) -> MockSession {
        let (stream, _peer) = self.listener.accept().await.expect("accept connection");
        MockSession {
            ws: accept_async(stream).await.expect("websocket handshake"),
        }
    }
}

/// One accepted client connection, server side
pub struct MockSession {
    ws: WebSocketStream<TcpStream>,
}

impl MockSession {
    /// Next client frame parsed as JSON, skipping heartbeats
    pub async fn recv_json(&mut self) -> Value {
        loop {
            let message = self
                .ws
                .next()
                .await
                .expect("client frame")
                .expect("client frame read");
            let WsMessage::Text(text) = message else {
                continue;
            };
            if text.as_str() == "ping" {
                continue;
            }
            let Ok(value) = serde_json::from_str::<Value>(text.as_str()) else {
                continue;
            };
            if value.get("event").and_then(Value::as_str) == Some("ping") {
                continue;
            }
            return value;
        }
    }

    pub async fn send_json(&mut self, value: &Value) {
        self.ws
            .send(WsMessage::text(value.to_string()))
            .await
            .expect("send frame");
    }

    #[allow(dead_code)]
    pub async fn send_text(&mut self, text: &str) {
        self.ws
            .send(WsMessage::text(text))
            .await
            .expect("send frame");
    }

    #[allow(dead_code)]
    pub async fn send_binary(&mut self, bytes: Vec<u8>) {
        self.ws
            .send(WsMessage::binary(bytes))
            .await
            .expect("send frame");
    }

    /// Drop the connection from the server side
    pub async fn close(mut self) {
        let _ = self.ws.close(None).await;
    }
}
