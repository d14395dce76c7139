//! Signed REST client for the exchange.
//!
//! Wraps the handful of endpoints the gateway consumes:
//! - instrument list (public)
//! - order list (paginated, filterable by status and symbol)
//! - position list
//! - order create / cancel / cancel-all
//! - trading-stop update
//!
//! Private calls are GET with a signed query or POST with a signed JSON
//! body, per `ladder-sign`. All traffic optionally routes through an
//! HTTP proxy.

pub mod client;
pub mod error;
pub mod types;

pub use client::RestClient;
pub use error::{RestError, RestResult};
pub use types::{
    Envelope, NewOrder, OrderPage, ParsedOrders, RawOrder, RawPosition, RawSymbol, TradingStops,
    OPEN_STATUSES, TERMINAL_STATUSES,
};
