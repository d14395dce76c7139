//! Socket lifecycle integration tests.
//!
//! Runs an in-process tungstenite server and drives a real
//! ConnectionManager against it:
//! - the auth operation is the first frame and carries a valid signature
//! - subscribe frames respect the proxy rule (no order topic)
//! - topic frames are forwarded to the dispatch channel

use futures_util::{SinkExt, StreamExt};
use ladder_core::Symbol;
use ladder_sign::realtime_auth_signature;
use ladder_ws::{ConnectionConfig, ConnectionManager, TopicFrame};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, Mutex};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;

/// Minimal in-process socket server capturing client frames.
struct MockServer {
    addr: String,
    received: Arc<Mutex<Vec<String>>>,
    /// Frames queued for delivery to the next client.
    outbound: Arc<Mutex<Vec<String>>>,
}

impl MockServer {
    async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = format!("ws://{}", listener.local_addr().unwrap());
        let received = Arc::new(Mutex::new(Vec::new()));
        let outbound = Arc::new(Mutex::new(Vec::new()));

        let received_clone = received.clone();
        let outbound_clone = outbound.clone();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let ws = match tokio_tungstenite::accept_async(stream).await {
                    Ok(ws) => ws,
                    Err(_) => continue,
                };
                let (mut write, mut read) = ws.split();

                for frame in outbound_clone.lock().await.drain(..) {
                    let _ = write.send(Message::Text(frame)).await;
                }

                let received = received_clone.clone();
                tokio::spawn(async move {
                    while let Some(Ok(msg)) = read.next().await {
                        if let Message::Text(text) = msg {
                            received.lock().await.push(text);
                        }
                    }
                });
            }
        });

        Self {
            addr,
            received,
            outbound,
        }
    }

    async fn queue_outbound(&self, frame: String) {
        self.outbound.lock().await.push(frame);
    }

    async fn received(&self) -> Vec<String> {
        self.received.lock().await.clone()
    }

    /// Wait until at least `n` frames arrived.
    async fn wait_for_frames(&self, n: usize) -> Vec<String> {
        timeout(Duration::from_secs(3), async {
            loop {
                let frames = self.received().await;
                if frames.len() >= n {
                    return frames;
                }
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
        })
        .await
        .expect("frames should arrive within timeout")
    }
}

fn test_config(url: String, subscribe_orders: bool) -> ConnectionConfig {
    ConnectionConfig {
        url,
        api_key: "testkey".to_string(),
        api_secret: "testsecret".to_string(),
        symbol: Symbol::from("BTCUSD"),
        subscribe_orders,
        max_reconnect_attempts: 3,
        subscribe_delay_ms: 50,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_auth_is_first_frame_with_valid_signature() {
    let server = MockServer::start().await;
    let (frame_tx, _frame_rx) = mpsc::channel::<TopicFrame>(16);

    let manager = Arc::new(ConnectionManager::new(
        test_config(server.addr.clone(), true),
        frame_tx,
    ));
    let manager_clone = manager.clone();
    let handle = tokio::spawn(async move {
        let _ = manager_clone.connect().await;
    });

    let frames = server.wait_for_frames(2).await;

    let auth: serde_json::Value = serde_json::from_str(&frames[0]).unwrap();
    assert_eq!(auth["op"], "auth");
    assert_eq!(auth["args"][0], "testkey");

    // Recompute the signature from the expiry the client actually sent.
    let expiry = auth["args"][1].as_i64().unwrap();
    let expected = realtime_auth_signature("testsecret", expiry);
    assert_eq!(auth["args"][2], expected.as_str());

    manager.shutdown();
    handle.abort();
}

#[tokio::test]
async fn test_subscribes_order_and_instrument_topics() {
    let server = MockServer::start().await;
    let (frame_tx, _frame_rx) = mpsc::channel::<TopicFrame>(16);

    let manager = Arc::new(ConnectionManager::new(
        test_config(server.addr.clone(), true),
        frame_tx,
    ));
    let manager_clone = manager.clone();
    let handle = tokio::spawn(async move {
        let _ = manager_clone.connect().await;
    });

    let frames = server.wait_for_frames(2).await;
    let subscribe: serde_json::Value = serde_json::from_str(&frames[1]).unwrap();
    assert_eq!(subscribe["op"], "subscribe");
    let args = subscribe["args"].as_array().unwrap();
    assert!(args.iter().any(|t| t == "order"));
    assert!(args.iter().any(|t| t == "instrument_info.100ms.BTCUSD"));

    manager.shutdown();
    handle.abort();
}

#[tokio::test]
async fn test_proxy_mode_skips_order_topic() {
    let server = MockServer::start().await;
    let (frame_tx, _frame_rx) = mpsc::channel::<TopicFrame>(16);

    let manager = Arc::new(ConnectionManager::new(
        test_config(server.addr.clone(), false),
        frame_tx,
    ));
    let manager_clone = manager.clone();
    let handle = tokio::spawn(async move {
        let _ = manager_clone.connect().await;
    });

    let frames = server.wait_for_frames(2).await;
    let subscribe: serde_json::Value = serde_json::from_str(&frames[1]).unwrap();
    let args = subscribe["args"].as_array().unwrap();
    assert!(
        !args.iter().any(|t| t == "order"),
        "order topic must not be subscribed in proxy mode"
    );
    assert!(args.iter().any(|t| t == "instrument_info.100ms.BTCUSD"));

    manager.shutdown();
    handle.abort();
}

#[tokio::test]
async fn test_topic_frames_are_forwarded() {
    let server = MockServer::start().await;
    server
        .queue_outbound(
            serde_json::json!({
                "topic": "instrument_info.100ms.BTCUSD",
                "type": "snapshot",
                "data": {"last_price_e4": 93571234_i64, "mark_price_e4": 93560000_i64}
            })
            .to_string(),
        )
        .await;

    let (frame_tx, mut frame_rx) = mpsc::channel::<TopicFrame>(16);
    let manager = Arc::new(ConnectionManager::new(
        test_config(server.addr.clone(), true),
        frame_tx,
    ));
    let manager_clone = manager.clone();
    let handle = tokio::spawn(async move {
        let _ = manager_clone.connect().await;
    });

    let frame = timeout(Duration::from_secs(3), frame_rx.recv())
        .await
        .expect("frame should be forwarded")
        .expect("channel should stay open");
    assert_eq!(frame.topic, "instrument_info.100ms.BTCUSD");
    assert_eq!(frame.kind.as_deref(), Some("snapshot"));

    manager.shutdown();
    handle.abort();
}

#[tokio::test]
async fn test_respects_max_reconnect_attempts() {
    // Point at a closed port; the manager must give up, not spin.
    let config = ConnectionConfig {
        url: "ws://127.0.0.1:59999".to_string(),
        max_reconnect_attempts: 2,
        reconnect_base_delay_ms: 50,
        reconnect_max_delay_ms: 100,
        ..test_config(String::new(), true)
    };
    let (frame_tx, _frame_rx) = mpsc::channel::<TopicFrame>(16);
    let manager = ConnectionManager::new(config, frame_tx);

    let result = timeout(Duration::from_secs(5), manager.connect()).await;
    assert!(result.is_ok(), "should stop after max reconnect attempts");
    assert!(result.unwrap().is_err(), "give-up must surface an error");
}
