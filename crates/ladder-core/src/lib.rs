//! Core domain types for the bybit-ladder trading gateway.
//!
//! This crate provides the fundamental types used throughout the gateway:
//! - `Price`, `Qty`: precision-safe numeric types
//! - `Account`, `Network`: credentials and endpoint selection
//! - `Symbol`, `InstrumentInfo`: instrument identity and trading constraints
//! - `Order`, `OrderStatus`, `Side`: order lifecycle types
//! - `Position`: the single tracked open position
//! - `NotifySink`: the user-facing notification seam

pub mod account;
pub mod decimal;
pub mod market;
pub mod notify;
pub mod order;
pub mod position;

pub use account::{Account, Network};
pub use decimal::{Price, Qty};
pub use market::{InstrumentInfo, Symbol};
pub use notify::{LogSink, Notice, NotifySink, Severity};
pub use order::{Order, OrderId, OrderStatus, OrderType, Side, TimeInForce};
pub use position::Position;
