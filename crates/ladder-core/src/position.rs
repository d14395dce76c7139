//! Open position snapshot.

use crate::{Price, Qty, Side, Symbol};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The open position for the active symbol.
///
/// At most one position is tracked. Size zero is represented as the
/// absence of a `Position`, never as a zero-sized record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub symbol: Symbol,
    pub side: Side,
    /// Always positive; direction is carried by `side`.
    pub size: Qty,
    pub entry_price: Price,
    /// Wallet balance reported alongside the position row.
    pub wallet_balance: Decimal,
}

impl Position {
    /// Side of a market order that would flatten this position.
    pub fn close_side(&self) -> Side {
        self.side.opposite()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_close_side() {
        let position = Position {
            symbol: Symbol::from("BTCUSD"),
            side: Side::Buy,
            size: Qty::new(dec!(100)),
            entry_price: Price::new(dec!(9350.5)),
            wallet_balance: dec!(0.5),
        };
        assert_eq!(position.close_side(), Side::Sell);
    }
}
