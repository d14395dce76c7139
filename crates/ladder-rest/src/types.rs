//! REST payload types and conversions.
//!
//! The exchange encodes numbers inconsistently (strings on some
//! endpoints, JSON numbers on others), so raw types accept both and
//! conversions normalize into the core decimal newtypes.

use crate::error::{RestError, RestResult};
use chrono::{DateTime, Utc};
use ladder_core::{
    InstrumentInfo, Order, OrderId, OrderStatus, OrderType, Position, Price, Qty, Side, Symbol,
    TimeInForce,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};

/// Status filter for the open-order poll cycle.
pub const OPEN_STATUSES: &str = "New,PartiallyFilled";

/// Status filter for the terminal-order poll cycle.
pub const TERMINAL_STATUSES: &str = "Cancelled,Rejected,Filled";

/// Page size for order-list requests.
pub const PAGE_LIMIT: u32 = 50;

// ============================================================================
// Response envelope
// ============================================================================

/// Common response envelope: `{ret_code, ret_msg, result, time_now}`.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub ret_code: i64,
    #[serde(default)]
    pub ret_msg: String,
    pub result: Option<T>,
    #[serde(default)]
    pub time_now: Option<String>,
}

impl<T> Envelope<T> {
    pub fn is_ok(&self) -> bool {
        self.ret_code == 0
    }

    /// Unwrap the payload or surface the exchange error.
    ///
    /// `request_time` is the timestamp the signed request carried; it is
    /// echoed into recv-window rejections for diagnosis.
    pub fn into_result(self, request_time: Option<String>) -> RestResult<Option<T>> {
        if self.is_ok() {
            Ok(self.result)
        } else {
            Err(RestError::Exchange {
                code: self.ret_code,
                msg: self.ret_msg,
                server_time: self.time_now,
                request_time,
            })
        }
    }
}

// ============================================================================
// Flexible decimal decoding
// ============================================================================

/// Accept a decimal encoded as either a JSON number or a string.
fn flex_decimal<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    decimal_from_value(&value).map_err(serde::de::Error::custom)
}

/// Same as [`flex_decimal`] but tolerates a missing or null field.
fn flex_decimal_opt<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    match value {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(v) => decimal_from_value(&v)
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

fn decimal_from_value(value: &serde_json::Value) -> Result<Decimal, String> {
    match value {
        serde_json::Value::String(s) => s.parse().map_err(|e| format!("bad decimal {s:?}: {e}")),
        serde_json::Value::Number(n) => n
            .to_string()
            .parse()
            .map_err(|e| format!("bad decimal {n}: {e}")),
        other => Err(format!("expected number or string, got {other}")),
    }
}

// ============================================================================
// Orders
// ============================================================================

/// One order row as delivered by the order-list endpoint or the order
/// push topic. Field names are shared between the two sources except for
/// the update time: REST sends `updated_at`, the push feed `timestamp`.
#[derive(Debug, Clone, Deserialize)]
pub struct RawOrder {
    pub order_id: String,
    pub symbol: String,
    pub side: Side,
    pub order_type: OrderType,
    #[serde(default, deserialize_with = "flex_decimal_opt")]
    pub price: Option<Decimal>,
    #[serde(deserialize_with = "flex_decimal")]
    pub qty: Decimal,
    #[serde(default)]
    pub time_in_force: TimeInForce,
    #[serde(default)]
    pub reduce_only: bool,
    pub order_status: OrderStatus,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl RawOrder {
    /// Normalize into the table representation.
    pub fn into_order(self) -> Order {
        let updated_at = self
            .updated_at
            .as_deref()
            .or(self.timestamp.as_deref())
            .and_then(parse_exchange_time)
            .unwrap_or_else(Utc::now);

        // A zero price on a market order means "no price".
        let price = self
            .price
            .filter(|p| !p.is_zero())
            .map(Price::new);

        Order {
            order_id: OrderId::new(self.order_id),
            symbol: Symbol::from(self.symbol),
            side: self.side,
            order_type: self.order_type,
            price,
            qty: Qty::new(self.qty),
            time_in_force: self.time_in_force,
            reduce_only: self.reduce_only,
            status: self.order_status,
            updated_at,
        }
    }
}

fn parse_exchange_time(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

/// Raw order-list page: `{data, current_page, last_page}`.
#[derive(Debug, Deserialize)]
pub struct OrderPage {
    #[serde(default)]
    pub data: Option<Vec<serde_json::Value>>,
    #[serde(default)]
    pub current_page: Option<u32>,
    #[serde(default)]
    pub last_page: Option<u32>,
}

/// An order page after per-row parsing.
#[derive(Debug, Default)]
pub struct ParsedOrders {
    pub orders: Vec<Order>,
    /// Rows that failed to parse (logged, skipped).
    pub failed_count: usize,
    pub last_page: u32,
}

impl OrderPage {
    /// Parse rows individually so one malformed order drops that row,
    /// not the whole page.
    pub fn parse(self) -> ParsedOrders {
        let last_page = self.last_page.unwrap_or(1);
        let mut parsed = ParsedOrders {
            last_page,
            ..Default::default()
        };

        for row in self.data.unwrap_or_default() {
            match serde_json::from_value::<RawOrder>(row.clone()) {
                Ok(raw) => parsed.orders.push(raw.into_order()),
                Err(e) => {
                    tracing::warn!(error = %e, row = ?row, "Dropping unparseable order row");
                    parsed.failed_count += 1;
                }
            }
        }

        parsed
    }
}

// ============================================================================
// Positions
// ============================================================================

/// One row of the position-list endpoint. The endpoint returns every
/// symbol; flat symbols carry side "None" and size 0.
#[derive(Debug, Clone, Deserialize)]
pub struct RawPosition {
    pub symbol: String,
    /// "Buy", "Sell" or "None".
    pub side: String,
    #[serde(deserialize_with = "flex_decimal")]
    pub size: Decimal,
    #[serde(default, deserialize_with = "flex_decimal_opt")]
    pub entry_price: Option<Decimal>,
    #[serde(deserialize_with = "flex_decimal")]
    pub wallet_balance: Decimal,
}

impl RawPosition {
    /// Convert to the tracked position; `None` when flat.
    pub fn into_position(self) -> Option<Position> {
        let side = match self.side.as_str() {
            "Buy" => Side::Buy,
            "Sell" => Side::Sell,
            _ => return None,
        };
        if self.size.is_zero() {
            return None;
        }
        Some(Position {
            symbol: Symbol::from(self.symbol),
            side,
            size: Qty::new(self.size),
            entry_price: Price::new(self.entry_price.unwrap_or_default()),
            wallet_balance: self.wallet_balance,
        })
    }
}

// ============================================================================
// Instruments
// ============================================================================

/// One row of the public instrument list.
#[derive(Debug, Clone, Deserialize)]
pub struct RawSymbol {
    pub name: String,
    pub price_filter: RawPriceFilter,
    pub lot_size_filter: RawLotSizeFilter,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawPriceFilter {
    #[serde(deserialize_with = "flex_decimal")]
    pub tick_size: Decimal,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawLotSizeFilter {
    #[serde(deserialize_with = "flex_decimal")]
    pub qty_step: Decimal,
}

impl RawSymbol {
    pub fn into_instrument(self) -> InstrumentInfo {
        InstrumentInfo {
            symbol: Symbol::from(self.name),
            tick_size: Price::new(self.price_filter.tick_size),
            qty_step: Qty::new(self.lot_size_filter.qty_step),
        }
    }
}

// ============================================================================
// Mutations
// ============================================================================

/// Parameters for order creation.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub symbol: Symbol,
    pub side: Side,
    pub order_type: OrderType,
    pub qty: Qty,
    /// Required for limit orders, absent for market orders.
    pub price: Option<Price>,
    pub time_in_force: TimeInForce,
    pub reduce_only: bool,
}

impl NewOrder {
    /// Flatten into signable request parameters.
    pub fn params(&self) -> Vec<(String, String)> {
        let mut params = vec![
            ("symbol".to_string(), self.symbol.to_string()),
            ("side".to_string(), self.side.to_string()),
            ("order_type".to_string(), self.order_type.to_string()),
            ("qty".to_string(), self.qty.to_string()),
            ("time_in_force".to_string(), self.time_in_force.to_string()),
        ];
        if let Some(price) = self.price {
            params.push(("price".to_string(), price.to_string()));
        }
        if self.reduce_only {
            params.push(("reduce_only".to_string(), "true".to_string()));
        }
        params
    }
}

/// Trading-stop update for the open position. Absent fields are left
/// unchanged server-side.
#[derive(Debug, Clone, Default)]
pub struct TradingStops {
    pub take_profit: Option<Price>,
    pub stop_loss: Option<Price>,
    pub trailing_stop: Option<Price>,
}

impl TradingStops {
    pub fn params(&self) -> Vec<(String, String)> {
        let mut params = Vec::new();
        if let Some(tp) = self.take_profit {
            params.push(("take_profit".to_string(), tp.to_string()));
        }
        if let Some(sl) = self.stop_loss {
            params.push(("stop_loss".to_string(), sl.to_string()));
        }
        if let Some(ts) = self.trailing_stop {
            params.push(("trailing_stop".to_string(), ts.to_string()));
        }
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn test_envelope_ok() {
        let envelope: Envelope<Vec<RawSymbol>> = serde_json::from_value(json!({
            "ret_code": 0,
            "ret_msg": "OK",
            "result": [{
                "name": "BTCUSD",
                "price_filter": {"tick_size": "0.5"},
                "lot_size_filter": {"qty_step": 1}
            }],
            "time_now": "1581574927.355991"
        }))
        .unwrap();

        assert!(envelope.is_ok());
        let result = envelope.into_result(None).unwrap().unwrap();
        let info = result[0].clone().into_instrument();
        assert_eq!(info.tick_size.inner(), dec!(0.5));
        assert_eq!(info.qty_step.inner(), dec!(1));
    }

    #[test]
    fn test_envelope_error_carries_times() {
        let envelope: Envelope<OrderPage> = serde_json::from_value(json!({
            "ret_code": 10002,
            "ret_msg": "invalid request, please check your timestamp",
            "result": null,
            "time_now": "1581574927.355991"
        }))
        .unwrap();

        let err = envelope
            .into_result(Some("1581574925000".to_string()))
            .unwrap_err();
        let text = err.notice_text();
        assert!(text.contains("server_time: 1581574927.355991"));
        assert!(text.contains("request_time: 1581574925000"));
    }

    #[test]
    fn test_order_page_skips_bad_rows() {
        let page: OrderPage = serde_json::from_value(json!({
            "data": [
                {
                    "order_id": "abc-1",
                    "symbol": "BTCUSD",
                    "side": "Buy",
                    "order_type": "Limit",
                    "price": "9300",
                    "qty": 100,
                    "time_in_force": "GoodTillCancel",
                    "order_status": "New",
                    "updated_at": "2020-03-01T11:03:43.452Z"
                },
                {"order_id": "broken"}
            ],
            "current_page": 1,
            "last_page": 3
        }))
        .unwrap();

        let parsed = page.parse();
        assert_eq!(parsed.orders.len(), 1);
        assert_eq!(parsed.failed_count, 1);
        assert_eq!(parsed.last_page, 3);
        assert_eq!(parsed.orders[0].order_id.as_str(), "abc-1");
        assert_eq!(parsed.orders[0].price.unwrap().inner(), dec!(9300));
    }

    #[test]
    fn test_push_feed_order_uses_timestamp_field() {
        let raw: RawOrder = serde_json::from_value(json!({
            "order_id": "abc-2",
            "symbol": "BTCUSD",
            "side": "Sell",
            "order_type": "Market",
            "price": 0,
            "qty": "50",
            "time_in_force": "ImmediateOrCancel",
            "order_status": "Filled",
            "timestamp": "2020-03-01T11:03:43.452Z"
        }))
        .unwrap();

        let order = raw.into_order();
        assert!(order.price.is_none(), "zero price maps to None");
        assert_eq!(order.updated_at.to_rfc3339(), "2020-03-01T11:03:43.452+00:00");
    }

    #[test]
    fn test_flat_position_is_none() {
        let raw: RawPosition = serde_json::from_value(json!({
            "symbol": "ETHUSD",
            "side": "None",
            "size": 0,
            "entry_price": "0",
            "wallet_balance": "1.2345"
        }))
        .unwrap();
        assert!(raw.into_position().is_none());
    }

    #[test]
    fn test_open_position_converts() {
        let raw: RawPosition = serde_json::from_value(json!({
            "symbol": "BTCUSD",
            "side": "Sell",
            "size": 250,
            "entry_price": 9401.5,
            "wallet_balance": "0.11"
        }))
        .unwrap();

        let position = raw.into_position().unwrap();
        assert_eq!(position.side, Side::Sell);
        assert_eq!(position.size.inner(), dec!(250));
        assert_eq!(position.entry_price.inner(), dec!(9401.5));
        assert_eq!(position.wallet_balance, dec!(0.11));
    }

    #[test]
    fn test_new_order_params() {
        let order = NewOrder {
            symbol: Symbol::from("BTCUSD"),
            side: Side::Buy,
            order_type: OrderType::Limit,
            qty: Qty::new(dec!(10)),
            price: Some(Price::new(dec!(9200.5))),
            time_in_force: TimeInForce::GoodTillCancel,
            reduce_only: false,
        };

        let params = order.params();
        assert!(params.contains(&("side".to_string(), "Buy".to_string())));
        assert!(params.contains(&("price".to_string(), "9200.5".to_string())));
        assert!(!params.iter().any(|(k, _)| k == "reduce_only"));
    }
}
