//! Realtime socket connection manager.
//!
//! Owns the persistent socket lifecycle: connect, authenticate,
//! subscribe, reconnect with exponential backoff, and dispatch of
//! inbound topic frames to the gateway's router channel.

pub mod connection;
pub mod error;
pub mod message;

pub use connection::{ConnectionConfig, ConnectionManager, ConnectionState};
pub use error::{WsError, WsResult};
pub use message::{instrument_topic, subscription_topics, OpAck, OpRequest, TopicFrame, WsFrame, ORDER_TOPIC};
