//! Merge decision for racing order updates.
//!
//! Push and poll can deliver updates for the same orderId in either
//! order. The one case that must be order-independent is terminal vs
//! non-terminal: a terminal status wins no matter which source reports
//! it first. Between two non-terminal updates, last-applied wins.
//!
//! Kept as a pure function, separate from any transport, so the rule
//! set is testable in isolation.

use ladder_core::OrderStatus;

/// What to do with one incoming update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeAction {
    /// Remove the existing entry with this orderId.
    Remove,
    /// Replace the existing entry in place, preserving table position.
    Replace,
    /// Append as a new entry.
    Append,
    /// Drop the update.
    Ignore,
}

/// Decide the action for an incoming update.
///
/// - `has_existing`: an entry with this orderId is currently in the table
/// - `seen_terminal`: a terminal status was already observed for this
///   orderId within the current session
pub fn merge(has_existing: bool, seen_terminal: bool, incoming: OrderStatus) -> MergeAction {
    if incoming.is_terminal() {
        if has_existing {
            MergeAction::Remove
        } else {
            // Removing an absent entry is a no-op; applying the same
            // terminal update twice must leave the table unchanged.
            MergeAction::Ignore
        }
    } else if seen_terminal {
        // A late non-terminal update must not resurrect an order that
        // already reached a terminal status.
        MergeAction::Ignore
    } else if has_existing {
        MergeAction::Replace
    } else {
        MergeAction::Append
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ladder_core::OrderStatus::*;

    #[test]
    fn test_terminal_removes_existing() {
        for status in [Filled, Cancelled, Rejected] {
            assert_eq!(merge(true, false, status), MergeAction::Remove);
        }
    }

    #[test]
    fn test_terminal_on_absent_is_noop() {
        assert_eq!(merge(false, false, Cancelled), MergeAction::Ignore);
        assert_eq!(merge(false, true, Cancelled), MergeAction::Ignore);
    }

    #[test]
    fn test_non_terminal_appends_or_replaces() {
        assert_eq!(merge(false, false, New), MergeAction::Append);
        assert_eq!(merge(true, false, PartiallyFilled), MergeAction::Replace);
    }

    #[test]
    fn test_terminal_beats_late_non_terminal() {
        assert_eq!(merge(false, true, New), MergeAction::Ignore);
        assert_eq!(merge(false, true, PartiallyFilled), MergeAction::Ignore);
    }
}
