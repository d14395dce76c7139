//! Periodic REST reconciliation cycles.
//!
//! While a session is active, signed REST calls periodically fetch open
//! and recently-closed orders plus the current position/balance and feed
//! the results into the shared state. When an HTTP proxy is configured,
//! polling is the sole ingress for order state; otherwise the cycles are
//! reduced to the position cycle and the socket carries order updates.

pub mod scheduler;

pub use scheduler::{
    poll_orders_once, should_fetch_next_page, PollConfig, PollMode, PollScheduler,
};
