//! Instrument-info tick decoding.
//!
//! The feed sends a full `snapshot` on subscription and `delta` frames
//! afterwards. Deltas carry only the fields that changed; absent fields
//! must leave the prior value untouched. Prices arrive as fixed-point
//! integers in units of 10^-4.

use crate::error::{FeedError, FeedResult};
use ladder_core::{Price, Symbol};
use ladder_ws::{instrument_topic, TopicFrame};
use serde::Deserialize;
use tracing::debug;

/// A partial price update. `None` fields carry no change.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PriceUpdate {
    pub last_price: Option<Price>,
    pub mark_price: Option<Price>,
}

/// Snapshot payload: absolute prices.
#[derive(Debug, Deserialize)]
struct RawSnapshot {
    last_price_e4: i64,
    mark_price_e4: i64,
}

/// Delta payload: a list of partial field sets.
#[derive(Debug, Deserialize)]
struct RawDelta {
    #[serde(default)]
    update: Vec<RawDeltaFields>,
}

#[derive(Debug, Deserialize)]
struct RawDeltaFields {
    #[serde(default)]
    last_price_e4: Option<i64>,
    #[serde(default)]
    mark_price_e4: Option<i64>,
}

/// Decodes instrument-info frames for one symbol.
pub struct PriceFeedDecoder {
    topic: String,
}

impl PriceFeedDecoder {
    pub fn new(symbol: &Symbol) -> Self {
        Self {
            topic: instrument_topic(symbol),
        }
    }

    /// Decode one topic frame.
    ///
    /// Frames for other topics are not an error: they are logged and
    /// `Ok(None)` is returned. Malformed frames for the instrument
    /// topic are an error; the caller logs and drops the update.
    pub fn decode(&self, frame: &TopicFrame) -> FeedResult<Option<PriceUpdate>> {
        if frame.topic != self.topic {
            debug!(topic = %frame.topic, "Ignoring frame for other topic");
            return Ok(None);
        }

        match frame.kind.as_deref() {
            Some("snapshot") => {
                let raw: RawSnapshot = serde_json::from_value(frame.data.clone())
                    .map_err(|e| FeedError::ParseError(format!("bad snapshot: {e}")))?;
                Ok(Some(PriceUpdate {
                    last_price: Some(Price::from_e4(raw.last_price_e4)),
                    mark_price: Some(Price::from_e4(raw.mark_price_e4)),
                }))
            }
            Some("delta") => {
                let raw: RawDelta = serde_json::from_value(frame.data.clone())
                    .map_err(|e| FeedError::ParseError(format!("bad delta: {e}")))?;
                // Only the first update entry carries price fields.
                let fields = match raw.update.first() {
                    Some(fields) => fields,
                    None => return Ok(Some(PriceUpdate::default())),
                };
                Ok(Some(PriceUpdate {
                    last_price: fields.last_price_e4.map(Price::from_e4),
                    mark_price: fields.mark_price_e4.map(Price::from_e4),
                }))
            }
            other => Err(FeedError::ParseError(format!(
                "unknown tick type {other:?}"
            ))),
        }
    }
}
