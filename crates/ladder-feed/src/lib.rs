//! Push-feed tick decoding.
//!
//! Interprets instrument-info topic frames (snapshot or incremental
//! delta) into last/mark price updates for the active symbol.

pub mod decoder;
pub mod error;

pub use decoder::{PriceFeedDecoder, PriceUpdate};
pub use error::{FeedError, FeedResult};
