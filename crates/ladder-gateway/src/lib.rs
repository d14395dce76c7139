//! Gateway facade.
//!
//! The single object the rest of the application talks to. Owns the
//! session lifecycle (account/symbol activation, teardown), exposes the
//! shared state for reads, and routes order mutations out through the
//! signed REST transport. Order state displayed to the operator is only
//! ever produced by the push feed and the poll cycles; mutations never
//! touch it directly.

pub mod error;
pub mod gateway;
pub mod ladder;
pub mod settings;

pub use error::{GatewayError, GatewayResult};
pub use gateway::Gateway;
pub use ladder::{LadderPlanner, LadderRequest};
pub use settings::Settings;
