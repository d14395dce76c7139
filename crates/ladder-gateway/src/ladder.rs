//! Seam for the scaled-order distribution algorithm.
//!
//! The gateway does not know how quantity is shaped across a price
//! range; it hands the request to a planner and places whatever rungs
//! come back.

use ladder_core::{Price, Qty, Side};
use rust_decimal::Decimal;

/// A request for a ladder of limit orders.
#[derive(Debug, Clone)]
pub struct LadderRequest {
    pub side: Side,
    /// Lower bound of the price range, inclusive.
    pub price_low: Price,
    /// Upper bound of the price range, inclusive.
    pub price_high: Price,
    /// Number of rungs.
    pub count: u32,
    /// Total quantity distributed across the rungs.
    pub total_qty: Qty,
    /// Shape parameter; its interpretation belongs to the planner
    /// (0 = flat, positive values skew quantity toward one end).
    pub shape: Decimal,
}

/// Pure price/quantity distribution.
///
/// Implementations must be deterministic and side-effect free; the
/// gateway calls `plan` once per request and submits the result
/// rung by rung.
pub trait LadderPlanner: Send + Sync {
    fn plan(&self, request: &LadderRequest) -> Vec<(Price, Qty)>;
}
