//! The open-order table.

use crate::merge::{merge, MergeAction};
use ladder_core::{Order, OrderId};
use std::collections::HashSet;
use tracing::{debug, trace};

/// Open orders for the active symbol, at most one entry per orderId.
///
/// Invariant: after any sequence of `apply` calls the table contains
/// exactly the orders whose last-seen status is non-terminal. OrderIds
/// that reached a terminal status are tombstoned for the rest of the
/// session so a late non-terminal update cannot re-add them.
#[derive(Debug, Default)]
pub struct OrderTable {
    orders: Vec<Order>,
    terminal_seen: HashSet<OrderId>,
}

impl OrderTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one update, from either ingress path.
    ///
    /// Callers filter by symbol before applying; the table does not
    /// second-guess them.
    pub fn apply(&mut self, order: Order) {
        let existing = self
            .orders
            .iter()
            .position(|o| o.order_id == order.order_id);
        let seen_terminal = self.terminal_seen.contains(&order.order_id);

        if order.status.is_terminal() {
            self.terminal_seen.insert(order.order_id.clone());
        }

        match merge(existing.is_some(), seen_terminal, order.status) {
            MergeAction::Remove => {
                debug!(order_id = %order.order_id, status = %order.status, "Order removed");
                // existing is Some by construction of the merge rules
                if let Some(idx) = existing {
                    self.orders.remove(idx);
                }
            }
            MergeAction::Replace => {
                trace!(order_id = %order.order_id, status = %order.status, "Order replaced");
                if let Some(idx) = existing {
                    self.orders[idx] = order;
                }
            }
            MergeAction::Append => {
                debug!(order_id = %order.order_id, status = %order.status, "Order added");
                self.orders.push(order);
            }
            MergeAction::Ignore => {
                trace!(order_id = %order.order_id, status = %order.status, "Update ignored");
            }
        }
    }

    /// Current open orders, in insertion order.
    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Drop all entries and tombstones (symbol or account switch).
    pub fn clear(&mut self) {
        self.orders.clear();
        self.terminal_seen.clear();
    }
}
