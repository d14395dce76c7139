//! Generation-guarded shared gateway state.
//!
//! One owned struct behind a single lock; both ingress paths mutate it
//! through generation-stamped methods. `reset` bumps the generation, so
//! a late completion from a torn-down session fails the guard and
//! becomes a no-op instead of clobbering fresher state.

use crate::reconciler::OrderTable;
use ladder_core::{InstrumentInfo, Order, Position, Price, Symbol};
use parking_lot::RwLock;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, trace};

/// Last/mark price for the active symbol. Each field is replaced by the
/// newest update that carries it; fields are never merged or averaged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PriceState {
    pub last_price: Option<Price>,
    pub mark_price: Option<Price>,
}

#[derive(Debug)]
struct Inner {
    generation: u64,
    symbol: Symbol,
    price: PriceState,
    position: Option<Position>,
    wallet_balance: Decimal,
    instrument: Option<InstrumentInfo>,
    available_symbols: Vec<Symbol>,
    orders: OrderTable,
}

/// Cloneable handle to the gateway's shared state.
#[derive(Clone)]
pub struct SharedState {
    inner: Arc<RwLock<Inner>>,
}

impl SharedState {
    pub fn new(symbol: Symbol) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner {
                generation: 0,
                symbol,
                price: PriceState::default(),
                position: None,
                wallet_balance: Decimal::ZERO,
                instrument: None,
                available_symbols: Vec::new(),
                orders: OrderTable::new(),
            })),
        }
    }

    /// Tear down derived state for a new session and return the new
    /// generation. Everything spawned afterwards carries this stamp.
    pub fn reset(&self, symbol: Symbol) -> u64 {
        let mut inner = self.inner.write();
        inner.generation += 1;
        inner.symbol = symbol;
        inner.price = PriceState::default();
        inner.position = None;
        inner.wallet_balance = Decimal::ZERO;
        inner.instrument = None;
        inner.orders.clear();
        debug!(generation = inner.generation, symbol = %inner.symbol, "State reset");
        inner.generation
    }

    pub fn generation(&self) -> u64 {
        self.inner.read().generation
    }

    // ========================================================================
    // Generation-stamped mutation
    // ========================================================================

    /// Apply one order update. Returns false (and changes nothing) for a
    /// stale generation.
    pub fn apply_order(&self, generation: u64, order: Order) -> bool {
        let mut inner = self.inner.write();
        if inner.generation != generation {
            trace!(generation, current = inner.generation, "Stale order update dropped");
            return false;
        }
        inner.orders.apply(order);
        true
    }

    /// Apply a partial price update; absent fields keep their value.
    pub fn apply_price(
        &self,
        generation: u64,
        last_price: Option<Price>,
        mark_price: Option<Price>,
    ) -> bool {
        let mut inner = self.inner.write();
        if inner.generation != generation {
            trace!(generation, current = inner.generation, "Stale price update dropped");
            return false;
        }
        if let Some(last) = last_price {
            inner.price.last_price = Some(last);
        }
        if let Some(mark) = mark_price {
            inner.price.mark_price = Some(mark);
        }
        true
    }

    /// Replace position and balance wholesale (no merge).
    pub fn set_position(
        &self,
        generation: u64,
        position: Option<Position>,
        wallet_balance: Decimal,
    ) -> bool {
        let mut inner = self.inner.write();
        if inner.generation != generation {
            trace!(generation, current = inner.generation, "Stale position update dropped");
            return false;
        }
        inner.position = position;
        inner.wallet_balance = wallet_balance;
        true
    }

    /// Store resolved trading constraints and the symbol universe.
    pub fn set_instrument(
        &self,
        generation: u64,
        instrument: InstrumentInfo,
        available_symbols: Vec<Symbol>,
    ) -> bool {
        let mut inner = self.inner.write();
        if inner.generation != generation {
            return false;
        }
        inner.instrument = Some(instrument);
        inner.available_symbols = available_symbols;
        true
    }

    // ========================================================================
    // Reads
    // ========================================================================

    pub fn symbol(&self) -> Symbol {
        self.inner.read().symbol.clone()
    }

    pub fn price(&self) -> PriceState {
        self.inner.read().price
    }

    pub fn position(&self) -> Option<Position> {
        self.inner.read().position.clone()
    }

    pub fn wallet_balance(&self) -> Decimal {
        self.inner.read().wallet_balance
    }

    pub fn open_orders(&self) -> Vec<Order> {
        self.inner.read().orders.orders().to_vec()
    }

    pub fn instrument(&self) -> Option<InstrumentInfo> {
        self.inner.read().instrument.clone()
    }

    pub fn available_symbols(&self) -> Vec<Symbol> {
        self.inner.read().available_symbols.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use ladder_core::{OrderId, OrderStatus, OrderType, Qty, Side, TimeInForce};
    use rust_decimal_macros::dec;

    fn state() -> SharedState {
        SharedState::new(Symbol::from("BTCUSD"))
    }

    fn order(id: &str) -> Order {
        Order {
            order_id: OrderId::from(id),
            symbol: Symbol::from("BTCUSD"),
            side: Side::Buy,
            order_type: OrderType::Limit,
            price: Some(Price::new(dec!(9300))),
            qty: Qty::new(dec!(100)),
            time_in_force: TimeInForce::GoodTillCancel,
            reduce_only: false,
            status: OrderStatus::New,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_price_fields_update_independently() {
        let state = state();
        let generation = state.reset(Symbol::from("BTCUSD"));

        assert!(state.apply_price(generation, Some(Price::new(dec!(9357.12))), None));
        assert!(state.apply_price(generation, None, Some(Price::new(dec!(9356.00)))));

        let price = state.price();
        assert_eq!(price.last_price.unwrap().inner(), dec!(9357.12));
        assert_eq!(price.mark_price.unwrap().inner(), dec!(9356.00));

        // A mark-only update leaves the last price untouched.
        assert!(state.apply_price(generation, None, Some(Price::new(dec!(9360.00)))));
        assert_eq!(state.price().last_price.unwrap().inner(), dec!(9357.12));
    }

    #[test]
    fn test_stale_generation_is_noop() {
        let state = state();
        let old = state.reset(Symbol::from("BTCUSD"));
        for id in ["a", "b", "c"] {
            assert!(state.apply_order(old, order(id)));
        }
        assert_eq!(state.open_orders().len(), 3);

        // Symbol switch while a reconnect is in flight.
        let _new = state.reset(Symbol::from("ETHUSD"));
        assert!(state.open_orders().is_empty());

        // Late callbacks from the torn-down session must not repopulate.
        assert!(!state.apply_order(old, order("a")));
        assert!(!state.apply_price(old, Some(Price::new(dec!(1))), None));
        assert!(!state.set_position(old, None, dec!(9)));
        assert!(state.open_orders().is_empty());
        assert_eq!(state.price(), PriceState::default());
        assert_eq!(state.wallet_balance(), Decimal::ZERO);
    }

    #[test]
    fn test_position_replaced_wholesale() {
        let state = state();
        let generation = state.reset(Symbol::from("BTCUSD"));

        let position = Position {
            symbol: Symbol::from("BTCUSD"),
            side: Side::Buy,
            size: Qty::new(dec!(100)),
            entry_price: Price::new(dec!(9300)),
            wallet_balance: dec!(0.5),
        };
        assert!(state.set_position(generation, Some(position), dec!(0.5)));
        assert!(state.position().is_some());

        // Flat snapshot replaces, it does not merge.
        assert!(state.set_position(generation, None, dec!(0.6)));
        assert!(state.position().is_none());
        assert_eq!(state.wallet_balance(), dec!(0.6));
    }

    #[test]
    fn test_reset_bumps_generation_monotonically() {
        let state = state();
        let g1 = state.reset(Symbol::from("BTCUSD"));
        let g2 = state.reset(Symbol::from("BTCUSD"));
        let g3 = state.reset(Symbol::from("ETHUSD"));
        assert!(g1 < g2 && g2 < g3);
    }
}
