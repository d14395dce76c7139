//! Socket connection manager.
//!
//! Handles the connection lifecycle: connect, authenticate, subscribe,
//! automatic reconnection with exponential backoff, and dispatch of
//! inbound topic frames.

use crate::error::{WsError, WsResult};
use crate::message::{subscription_topics, OpRequest, TopicFrame, WsFrame};
use futures_util::{SinkExt, StreamExt};
use ladder_core::Symbol;
use ladder_sign::realtime_auth_signature;
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async_tls_with_config, tungstenite::Message};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Connection configuration.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Socket URL.
    pub url: String,
    /// API key for the auth operation.
    pub api_key: String,
    /// API secret for the auth signature.
    pub api_secret: String,
    /// Active symbol; determines the instrument-info topic.
    pub symbol: Symbol,
    /// Whether to subscribe the order topic (false when an HTTP proxy
    /// carries order state via polling instead).
    pub subscribe_orders: bool,
    /// Maximum reconnection attempts (0 = infinite).
    pub max_reconnect_attempts: u32,
    /// Base delay for exponential backoff.
    pub reconnect_base_delay_ms: u64,
    /// Maximum delay for exponential backoff.
    pub reconnect_max_delay_ms: u64,
    /// Auth expiry horizon: signed expiry = now + this window.
    pub auth_expiry_window_ms: i64,
    /// Fixed delay between the auth operation and the subscribe
    /// operations. No auth ack is awaited; the delay is assumed to
    /// cover the round-trip.
    pub subscribe_delay_ms: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            api_key: String::new(),
            api_secret: String::new(),
            symbol: Symbol::from("BTCUSD"),
            subscribe_orders: true,
            max_reconnect_attempts: 0, // Infinite
            reconnect_base_delay_ms: 1000,
            reconnect_max_delay_ms: 60000,
            auth_expiry_window_ms: 1500,
            subscribe_delay_ms: 500,
        }
    }
}

/// Connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Authenticating,
    Subscribed,
}

/// Socket connection manager.
///
/// Topic frames are forwarded on the channel given at construction; the
/// receiver (the gateway router) decides what each topic means.
pub struct ConnectionManager {
    config: ConnectionConfig,
    state: Arc<RwLock<ConnectionState>>,
    frame_tx: mpsc::Sender<TopicFrame>,
    reconnect_count: Arc<RwLock<u32>>,
    shutdown_token: CancellationToken,
}

impl ConnectionManager {
    /// Create a new connection manager.
    pub fn new(config: ConnectionConfig, frame_tx: mpsc::Sender<TopicFrame>) -> Self {
        Self {
            config,
            state: Arc::new(RwLock::new(ConnectionState::Disconnected)),
            frame_tx,
            reconnect_count: Arc::new(RwLock::new(0)),
            shutdown_token: CancellationToken::new(),
        }
    }

    /// Get current connection state.
    pub fn state(&self) -> ConnectionState {
        *self.state.read()
    }

    /// Signal graceful shutdown.
    pub fn shutdown(&self) {
        info!("ConnectionManager shutdown requested");
        self.shutdown_token.cancel();
    }

    /// Check if shutdown has been requested.
    pub fn is_shutdown(&self) -> bool {
        self.shutdown_token.is_cancelled()
    }

    /// Connect and run the frame loop until shutdown.
    pub async fn connect(&self) -> WsResult<()> {
        self.connect_with_retry().await
    }

    async fn connect_with_retry(&self) -> WsResult<()> {
        let mut attempt = 0u32;

        loop {
            if self.is_shutdown() {
                *self.state.write() = ConnectionState::Disconnected;
                return Ok(());
            }

            *self.state.write() = ConnectionState::Connecting;

            match self.try_connect().await {
                Ok(()) => {
                    info!("Socket connection closed");
                }
                Err(e) => {
                    error!(?e, "Socket connection error");
                }
            }

            if self.is_shutdown() {
                *self.state.write() = ConnectionState::Disconnected;
                return Ok(());
            }

            attempt += 1;
            *self.reconnect_count.write() = attempt;

            if self.config.max_reconnect_attempts > 0
                && attempt >= self.config.max_reconnect_attempts
            {
                error!(attempt, "Max reconnection attempts reached");
                return Err(WsError::ConnectionFailed(
                    "Max reconnection attempts reached".to_string(),
                ));
            }

            *self.state.write() = ConnectionState::Disconnected;

            let delay = self.calculate_backoff_delay(attempt);
            warn!(attempt, delay_ms = delay.as_millis(), "Reconnecting");

            tokio::select! {
                () = tokio::time::sleep(delay) => {}
                () = self.shutdown_token.cancelled() => {
                    *self.state.write() = ConnectionState::Disconnected;
                    return Ok(());
                }
            }
        }
    }

    async fn try_connect(&self) -> WsResult<()> {
        info!(url = %self.config.url, "Connecting to socket");

        let (ws_stream, _response) =
            connect_async_tls_with_config(&self.config.url, None, true, None).await?;
        let (mut write, mut read) = ws_stream.split();

        *self.reconnect_count.write() = 0;
        info!("Socket connected");

        // Authenticate on every (re)connect, not just the first one.
        *self.state.write() = ConnectionState::Authenticating;
        let expiry_ms = now_ms() + self.config.auth_expiry_window_ms;
        let signature = realtime_auth_signature(&self.config.api_secret, expiry_ms);
        let auth = OpRequest::auth(&self.config.api_key, expiry_ms, &signature);
        write
            .send(Message::Text(serde_json::to_string(&auth)?))
            .await?;
        debug!(expiry_ms, "Auth operation sent");

        // Fixed delay instead of waiting for the auth ack; the ack is
        // handled in the frame loop like any other op response.
        tokio::select! {
            () = tokio::time::sleep(Duration::from_millis(self.config.subscribe_delay_ms)) => {}
            () = self.shutdown_token.cancelled() => {
                let _ = write.send(Message::Close(None)).await;
                *self.state.write() = ConnectionState::Disconnected;
                return Ok(());
            }
        }

        let topics = subscription_topics(&self.config.symbol, self.config.subscribe_orders);
        let subscribe = OpRequest::subscribe(topics.clone());
        write
            .send(Message::Text(serde_json::to_string(&subscribe)?))
            .await?;
        info!(?topics, "Subscribed");
        *self.state.write() = ConnectionState::Subscribed;

        // Frame loop
        loop {
            tokio::select! {
                () = self.shutdown_token.cancelled() => {
                    info!("Shutdown signal received in frame loop");
                    if let Err(e) = write.send(Message::Close(None)).await {
                        warn!(?e, "Failed to send Close frame during shutdown");
                    }
                    *self.state.write() = ConnectionState::Disconnected;
                    return Ok(());
                }

                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            self.handle_text_message(&text).await;
                        }
                        Some(Ok(Message::Ping(data))) => {
                            debug!("Received ping, sending pong");
                            write.send(Message::Pong(data)).await?;
                        }
                        Some(Ok(Message::Pong(_))) => {
                            debug!("Received pong");
                        }
                        Some(Ok(Message::Close(frame))) => {
                            let (code, reason) = frame
                                .map(|f| (f.code.into(), f.reason.to_string()))
                                .unwrap_or((1000, "Normal close".to_string()));
                            warn!(code, %reason, "Socket closed by server");
                            return Err(WsError::ConnectionClosed { code, reason });
                        }
                        Some(Err(e)) => {
                            error!(?e, "Socket read error");
                            return Err(e.into());
                        }
                        None => {
                            warn!("Socket stream ended");
                            return Ok(());
                        }
                        _ => {}
                    }
                }
            }
        }
    }

    /// Parse one inbound text frame and route it.
    ///
    /// Malformed frames and op acks never tear the connection down;
    /// only the gateway router decides what topics mean.
    async fn handle_text_message(&self, text: &str) {
        match serde_json::from_str::<WsFrame>(text) {
            Ok(WsFrame::Topic(frame)) => {
                if self.frame_tx.send(frame).await.is_err() {
                    warn!("Frame receiver dropped");
                }
            }
            Ok(WsFrame::Ack(ack)) => {
                if ack.is_failure() {
                    warn!(op = ?ack.op(), ret_msg = ?ack.ret_msg, "Operation rejected");
                } else {
                    debug!(op = ?ack.op(), "Operation acknowledged");
                }
            }
            Err(e) => {
                warn!(error = %e, raw = %text, "Unparseable frame dropped");
            }
        }
    }

    fn calculate_backoff_delay(&self, attempt: u32) -> Duration {
        let base = self.config.reconnect_base_delay_ms;
        let max = self.config.reconnect_max_delay_ms;

        // Exponential backoff: base * 2^(attempt-1), capped.
        let exponent = attempt.saturating_sub(1).min(10);
        let delay = base.saturating_mul(1u64 << exponent);
        let delay = delay.min(max);

        // Add jitter (0-1000ms)
        let jitter = rand_jitter();
        Duration::from_millis(delay + jitter)
    }
}

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// Generate random jitter (0-1000ms).
fn rand_jitter() -> u64 {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    (nanos % 1000) as u64
}
