//! HTTP client for the exchange REST API.

use crate::error::{RestError, RestResult};
use crate::types::{
    Envelope, NewOrder, OrderPage, ParsedOrders, RawPosition, RawSymbol, TradingStops, PAGE_LIMIT,
};
use ladder_core::{InstrumentInfo, Network, OrderId, Symbol};
use ladder_sign::{canonical_query, RequestSigner};
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, info};

/// Default timeout for API requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Client for the exchange REST API.
///
/// One client per activation; rebuilt on account or symbol switch so the
/// base URL and proxy always match the active session.
pub struct RestClient {
    http: reqwest::Client,
    base_url: String,
    signer: RequestSigner,
}

impl RestClient {
    /// Create a client for a network, optionally routed through an HTTP
    /// proxy.
    pub fn new(network: Network, signer: RequestSigner, proxy: Option<&str>) -> RestResult<Self> {
        let mut builder = reqwest::Client::builder().timeout(DEFAULT_TIMEOUT);
        if let Some(proxy_url) = proxy {
            info!(proxy = %proxy_url, "Routing REST traffic through proxy");
            builder = builder.proxy(reqwest::Proxy::all(proxy_url)?);
        }
        Ok(Self {
            http: builder.build()?,
            base_url: network.rest_url().to_string(),
            signer,
        })
    }

    // ========================================================================
    // Public endpoints
    // ========================================================================

    /// Fetch the instrument list (unauthenticated) and resolve trading
    /// constraints for `symbol`. Also returns the full symbol universe.
    pub async fn fetch_instruments(
        &self,
        symbol: &Symbol,
    ) -> RestResult<(InstrumentInfo, Vec<Symbol>)> {
        let url = format!("{}v2/public/symbols", self.base_url);
        debug!(url = %url, "Fetching instrument list");

        let response = self.http.get(&url).send().await?;
        let envelope: Envelope<Vec<RawSymbol>> = decode(response).await?;
        let rows = envelope.into_result(None)?.unwrap_or_default();

        let available: Vec<Symbol> = rows.iter().map(|r| Symbol::from(r.name.clone())).collect();
        let instrument = rows
            .into_iter()
            .find(|r| r.name == symbol.as_str())
            .map(RawSymbol::into_instrument)
            .ok_or_else(|| RestError::Decode(format!("symbol {symbol} not listed")))?;

        Ok((instrument, available))
    }

    // ========================================================================
    // Private endpoints
    // ========================================================================

    /// Fetch one page of the order list filtered by status set.
    pub async fn fetch_orders(
        &self,
        symbol: &Symbol,
        order_status: &str,
        page: u32,
    ) -> RestResult<ParsedOrders> {
        let page_raw: Option<OrderPage> = self
            .get_signed(
                "open-api/order/list",
                [
                    ("symbol".to_string(), symbol.to_string()),
                    ("order_status".to_string(), order_status.to_string()),
                    ("page".to_string(), page.to_string()),
                    ("limit".to_string(), PAGE_LIMIT.to_string()),
                ],
            )
            .await?;

        Ok(page_raw.map(OrderPage::parse).unwrap_or_default())
    }

    /// Fetch the position list (all symbols).
    pub async fn fetch_positions(&self) -> RestResult<Vec<RawPosition>> {
        let positions: Option<Vec<RawPosition>> = self
            .get_signed("position/list", Vec::<(String, String)>::new())
            .await?;
        Ok(positions.unwrap_or_default())
    }

    /// Create an order.
    pub async fn place_order(&self, order: &NewOrder) -> RestResult<()> {
        self.post_signed::<serde_json::Value>("v2/private/order/create", order.params())
            .await?;
        Ok(())
    }

    /// Cancel one order by id.
    pub async fn cancel_order(&self, symbol: &Symbol, order_id: &OrderId) -> RestResult<()> {
        self.post_signed::<serde_json::Value>(
            "v2/private/order/cancel",
            [
                ("symbol".to_string(), symbol.to_string()),
                ("order_id".to_string(), order_id.to_string()),
            ],
        )
        .await?;
        Ok(())
    }

    /// Cancel every active order for a symbol.
    pub async fn cancel_all(&self, symbol: &Symbol) -> RestResult<()> {
        self.post_signed::<serde_json::Value>(
            "v2/private/order/cancelAll",
            [("symbol".to_string(), symbol.to_string())],
        )
        .await?;
        Ok(())
    }

    /// Update take-profit / stop-loss / trailing-stop on the open
    /// position.
    pub async fn set_trading_stop(
        &self,
        symbol: &Symbol,
        stops: &TradingStops,
    ) -> RestResult<()> {
        let mut params = stops.params();
        params.push(("symbol".to_string(), symbol.to_string()));
        self.post_signed::<serde_json::Value>("open-api/position/trading-stop", params)
            .await?;
        Ok(())
    }

    // ========================================================================
    // Transport
    // ========================================================================

    /// Signed GET: parameters become the sorted, signed query string.
    async fn get_signed<T>(
        &self,
        path: &str,
        params: impl IntoIterator<Item = (String, String)>,
    ) -> RestResult<Option<T>>
    where
        T: DeserializeOwned,
    {
        let signed = self.signer.sign(params);
        let request_time = signed.get("timestamp").cloned();
        let url = format!("{}{}?{}", self.base_url, path, canonical_query(&signed));
        debug!(path = %path, "Signed GET");

        let response = self.http.get(&url).send().await?;
        let envelope: Envelope<T> = decode(response).await?;
        envelope.into_result(request_time)
    }

    /// Signed POST: the signed mapping (including `sign`) is the JSON
    /// body.
    async fn post_signed<T>(
        &self,
        path: &str,
        params: impl IntoIterator<Item = (String, String)>,
    ) -> RestResult<Option<T>>
    where
        T: DeserializeOwned,
    {
        let signed: BTreeMap<String, String> = self.signer.sign(params);
        let request_time = signed.get("timestamp").cloned();
        let url = format!("{}{}", self.base_url, path);
        debug!(path = %path, "Signed POST");

        let response = self.http.post(&url).json(&signed).send().await?;
        let envelope: Envelope<T> = decode(response).await?;
        envelope.into_result(request_time)
    }
}

/// Check the HTTP status and decode the envelope.
async fn decode<T>(response: reqwest::Response) -> RestResult<Envelope<T>>
where
    T: DeserializeOwned,
{
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(RestError::Status {
            status: status.as_u16(),
            body,
        });
    }
    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|e| RestError::Decode(format!("{e}: {body}")))
}
