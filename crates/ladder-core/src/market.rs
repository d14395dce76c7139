//! Instrument identity and trading constraints.

use crate::{Price, Qty};
use serde::{Deserialize, Serialize};
use std::fmt;

/// An exchange-traded instrument identifier (e.g. "BTCUSD").
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Symbol(String);

impl Symbol {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Symbol {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Symbol {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Trading constraints for one instrument, fetched once per activation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstrumentInfo {
    pub symbol: Symbol,
    /// Minimum price increment.
    pub tick_size: Price,
    /// Minimum quantity increment.
    pub qty_step: Qty,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_roundtrip() {
        let symbol = Symbol::from("BTCUSD");
        assert_eq!(symbol.as_str(), "BTCUSD");
        assert_eq!(symbol.to_string(), "BTCUSD");
    }
}
