//! Socket frame types.
//!
//! Outbound frames are `{op, args}` operations (`auth`, `subscribe`).
//! Inbound frames are either topic messages keyed by `topic`, or
//! operation acknowledgements.

use ladder_core::Symbol;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Topic carrying order-state updates for the authenticated account.
pub const ORDER_TOPIC: &str = "order";

/// Instrument-info topic for one symbol (100 ms cadence).
pub fn instrument_topic(symbol: &Symbol) -> String {
    format!("instrument_info.100ms.{symbol}")
}

/// The topics one session subscribes to.
///
/// The order topic is omitted when requests route through an HTTP proxy:
/// push sockets cannot traverse the proxy, so order state arrives via
/// polling instead.
pub fn subscription_topics(symbol: &Symbol, include_orders: bool) -> Vec<String> {
    let mut topics = Vec::with_capacity(2);
    if include_orders {
        topics.push(ORDER_TOPIC.to_string());
    }
    topics.push(instrument_topic(symbol));
    topics
}

/// Outbound operation frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpRequest {
    pub op: String,
    pub args: Vec<Value>,
}

impl OpRequest {
    /// Authentication operation: `{op:"auth", args:[apiKey, expiry, signature]}`.
    pub fn auth(api_key: &str, expiry_ms: i64, signature: &str) -> Self {
        Self {
            op: "auth".to_string(),
            args: vec![
                Value::from(api_key),
                Value::from(expiry_ms),
                Value::from(signature),
            ],
        }
    }

    /// Subscribe operation for a set of topics.
    pub fn subscribe(topics: impl IntoIterator<Item = String>) -> Self {
        Self {
            op: "subscribe".to_string(),
            args: topics.into_iter().map(Value::from).collect(),
        }
    }
}

/// Inbound frame: a topic message or an operation acknowledgement.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum WsFrame {
    Topic(TopicFrame),
    Ack(OpAck),
}

/// Topic message. `type` distinguishes snapshot from delta on feeds
/// that use it; `data` stays flexible JSON, decoded downstream.
#[derive(Debug, Clone, Deserialize)]
pub struct TopicFrame {
    pub topic: String,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub data: Value,
}

/// Acknowledgement for an `auth` or `subscribe` operation.
#[derive(Debug, Clone, Deserialize)]
pub struct OpAck {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub ret_msg: Option<String>,
    #[serde(default)]
    pub request: Value,
}

impl OpAck {
    /// The `op` this ack responds to, if echoed.
    pub fn op(&self) -> Option<&str> {
        self.request.get("op").and_then(Value::as_str)
    }

    pub fn is_failure(&self) -> bool {
        self.success == Some(false)
    }
}
