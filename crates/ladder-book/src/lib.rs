//! Open-order reconciliation and shared gateway state.
//!
//! Two independent ingress paths (push feed and poll cycle) write the
//! same order table; this crate owns the dedup/merge/removal rules that
//! keep the table consistent regardless of arrival order, and the
//! generation-guarded state container everything else reads.

pub mod merge;
pub mod reconciler;
pub mod state;

pub use merge::{merge, MergeAction};
pub use reconciler::OrderTable;
pub use state::{PriceState, SharedState};
