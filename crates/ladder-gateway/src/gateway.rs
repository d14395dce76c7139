//! Gateway lifecycle and mutation operations.

use crate::error::{GatewayError, GatewayResult};
use crate::ladder::{LadderPlanner, LadderRequest};
use ladder_book::SharedState;
use ladder_core::{
    Account, InstrumentInfo, Notice, NotifySink, OrderId, OrderType, Price, Qty, Side, Symbol,
    TimeInForce,
};
use ladder_feed::PriceFeedDecoder;
use ladder_poll::{poll_orders_once, PollConfig, PollMode, PollScheduler};
use ladder_rest::{NewOrder, RawOrder, RestClient, TradingStops, OPEN_STATUSES};
use ladder_sign::RequestSigner;
use ladder_ws::{ConnectionConfig, ConnectionManager, TopicFrame, ORDER_TOPIC};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// One activated session: the transports bound to a single
/// account/symbol/generation triple.
struct Session {
    generation: u64,
    rest: Arc<RestClient>,
    ws: Arc<ConnectionManager>,
    poll: PollScheduler,
    tasks: Vec<JoinHandle<()>>,
}

/// The exchange gateway.
///
/// Owns the shared state exclusively; the socket and poll tasks only
/// hold generation-stamped mutation entry points into it.
pub struct Gateway {
    state: SharedState,
    notify: Arc<dyn NotifySink>,
    poll_config: PollConfig,
    session: Option<Session>,
}

impl Gateway {
    pub fn new(notify: Arc<dyn NotifySink>, poll_config: PollConfig, symbol: Symbol) -> Self {
        Self {
            state: SharedState::new(symbol),
            notify,
            poll_config,
            session: None,
        }
    }

    /// Shared state handle for reads (price, position, open orders).
    pub fn state(&self) -> &SharedState {
        &self.state
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    /// Start a session for an account and symbol.
    ///
    /// Tears down any existing session first, resets all derived state
    /// under a fresh generation, resolves the instrument constraints,
    /// then starts the socket and the poll cycles. When a proxy is
    /// configured the socket skips the order topic and polling becomes
    /// the sole order-state ingress.
    pub async fn activate(
        &mut self,
        account: Account,
        symbol: Symbol,
        proxy_url: Option<String>,
    ) -> GatewayResult<()> {
        self.deactivate();

        // Refuse to start without credentials before touching state.
        let signer = RequestSigner::for_account(&account)?;
        let network = account.network();
        let proxy = proxy_url.as_deref().filter(|p| !p.is_empty());

        let generation = self.state.reset(symbol.clone());
        info!(%symbol, account = %account, generation, proxy = proxy.is_some(), "Activating gateway");

        let rest = Arc::new(RestClient::new(network, signer, proxy)?);

        // Resolve tick size / qty step before any order can be placed.
        let (instrument, available) = rest.fetch_instruments(&symbol).await?;
        self.state.set_instrument(generation, instrument, available);

        let (subscribe_orders, poll_mode) = ingress_plan(proxy.is_some());

        // Socket: price feed always; order topic only without a proxy.
        let (frame_tx, frame_rx) = mpsc::channel::<TopicFrame>(256);
        let ws_config = ConnectionConfig {
            url: network.ws_url().to_string(),
            api_key: account.api_key.clone(),
            api_secret: account.api_secret.clone(),
            symbol: symbol.clone(),
            subscribe_orders,
            ..Default::default()
        };
        let ws = Arc::new(ConnectionManager::new(ws_config, frame_tx));

        let mut tasks = Vec::new();
        let ws_task = ws.clone();
        tasks.push(tokio::spawn(async move {
            if let Err(e) = ws_task.connect().await {
                warn!(error = %e, "Socket task ended");
            }
        }));
        tasks.push(self.spawn_router(frame_rx, symbol.clone(), generation));

        // Poll cycles per the proxy rule.
        let mut poll = PollScheduler::new(
            rest.clone(),
            self.state.clone(),
            self.notify.clone(),
            self.poll_config.clone(),
        );
        poll.start(poll_mode, generation);

        // Without a proxy the socket carries order updates from here on;
        // one seed fetch fills the table with orders opened before this
        // session.
        if proxy.is_none() {
            let retention_days = self.poll_config.removed_orders_max_days;
            poll_orders_once(
                &rest,
                &self.state,
                self.notify.as_ref(),
                generation,
                OPEN_STATUSES,
                retention_days,
            )
            .await;
        }

        self.session = Some(Session {
            generation,
            rest,
            ws,
            poll,
            tasks,
        });
        Ok(())
    }

    /// Tear the session down. In-flight completions for it are fenced
    /// off by the generation guard, so a late callback cannot write
    /// into the next session's state.
    pub fn deactivate(&mut self) {
        if let Some(mut session) = self.session.take() {
            info!(generation = session.generation, "Deactivating gateway");
            session.poll.stop();
            session.ws.shutdown();
            for task in session.tasks.drain(..) {
                task.abort();
            }
        }
    }

    fn spawn_router(
        &self,
        mut frame_rx: mpsc::Receiver<TopicFrame>,
        symbol: Symbol,
        generation: u64,
    ) -> JoinHandle<()> {
        let state = self.state.clone();
        let decoder = PriceFeedDecoder::new(&symbol);
        tokio::spawn(async move {
            while let Some(frame) = frame_rx.recv().await {
                route_frame(&frame, &decoder, &state, generation);
            }
            debug!("Frame router ended");
        })
    }

    fn session(&self) -> GatewayResult<&Session> {
        self.session.as_ref().ok_or(GatewayError::NotActive)
    }

    // ========================================================================
    // Mutations
    // ========================================================================
    //
    // None of these touch local order state: the next push or poll
    // update is the source of truth for what the exchange accepted.

    /// Place one order.
    pub async fn place_order(&self, order: &NewOrder) -> GatewayResult<()> {
        let session = self.session()?;
        match session.rest.place_order(order).await {
            Ok(()) => {
                self.notify.notify(Notice::success("Order placed"));
                Ok(())
            }
            Err(e) => {
                self.notify.notify(Notice::error(e.notice_text()));
                Err(e.into())
            }
        }
    }

    /// Cancel one order by id.
    pub async fn cancel_order(&self, order_id: &OrderId) -> GatewayResult<()> {
        let session = self.session()?;
        let symbol = self.state.symbol();
        match session.rest.cancel_order(&symbol, order_id).await {
            Ok(()) => {
                self.notify.notify(Notice::success("Order cancelled"));
                Ok(())
            }
            Err(e) => {
                self.notify.notify(Notice::error(e.notice_text()));
                Err(e.into())
            }
        }
    }

    /// Cancel every active order for the symbol in one call.
    pub async fn cancel_all(&self) -> GatewayResult<()> {
        let session = self.session()?;
        let symbol = self.state.symbol();
        match session.rest.cancel_all(&symbol).await {
            Ok(()) => {
                self.notify.notify(Notice::success("Orders cancelled"));
                Ok(())
            }
            Err(e) => {
                self.notify.notify(Notice::error(e.notice_text()));
                Err(e.into())
            }
        }
    }

    /// Cancel all open buy orders, one call per order, best-effort.
    pub async fn cancel_all_buys(&self) -> GatewayResult<usize> {
        self.cancel_side(Side::Buy).await
    }

    /// Cancel all open sell orders, one call per order, best-effort.
    pub async fn cancel_all_sells(&self) -> GatewayResult<usize> {
        self.cancel_side(Side::Sell).await
    }

    async fn cancel_side(&self, side: Side) -> GatewayResult<usize> {
        let session = self.session()?;
        let symbol = self.state.symbol();
        let targets: Vec<OrderId> = self
            .state
            .open_orders()
            .into_iter()
            .filter(|o| o.side == side)
            .map(|o| o.order_id)
            .collect();

        let mut cancelled = 0usize;
        for order_id in targets {
            // A failure on one order must not block the rest.
            match session.rest.cancel_order(&symbol, &order_id).await {
                Ok(()) => cancelled += 1,
                Err(e) => {
                    warn!(%order_id, error = %e, "Cancel failed");
                    self.notify.notify(Notice::error(e.notice_text()));
                }
            }
        }
        if cancelled > 0 {
            self.notify
                .notify(Notice::success(format!("{cancelled} {side} orders cancelled")));
        }
        Ok(cancelled)
    }

    /// Update take-profit / stop-loss / trailing-stop on the position.
    pub async fn set_trading_stops(&self, stops: &TradingStops) -> GatewayResult<()> {
        let session = self.session()?;
        let symbol = self.state.symbol();
        match session.rest.set_trading_stop(&symbol, stops).await {
            Ok(()) => {
                self.notify.notify(Notice::success("Trading stops changed"));
                Ok(())
            }
            Err(e) => {
                self.notify.notify(Notice::error(e.notice_text()));
                Err(e.into())
            }
        }
    }

    /// Close the open position with an opposite-side market order.
    pub async fn market_close(&self) -> GatewayResult<()> {
        let position = self.state.position().ok_or(GatewayError::NoOpenPosition)?;
        let order = NewOrder {
            symbol: position.symbol.clone(),
            side: position.close_side(),
            order_type: OrderType::Market,
            qty: position.size,
            price: None,
            time_in_force: TimeInForce::GoodTillCancel,
            reduce_only: false,
        };
        self.place_order(&order).await
    }

    /// Place a ladder of limit orders produced by the planner,
    /// rung by rung, best-effort.
    pub async fn place_scaled(
        &self,
        planner: &dyn LadderPlanner,
        request: &LadderRequest,
    ) -> GatewayResult<usize> {
        let session = self.session()?;
        let symbol = self.state.symbol();
        let instrument = self.state.instrument();

        let mut placed = 0usize;
        for (price, qty) in planner.plan(request) {
            let Some((price, qty)) = normalize_rung(price, qty, instrument.as_ref()) else {
                continue;
            };
            let order = NewOrder {
                symbol: symbol.clone(),
                side: request.side,
                order_type: OrderType::Limit,
                qty,
                price: Some(price),
                time_in_force: TimeInForce::GoodTillCancel,
                reduce_only: false,
            };
            match session.rest.place_order(&order).await {
                Ok(()) => placed += 1,
                Err(e) => {
                    warn!(error = %e, "Ladder rung rejected");
                    self.notify.notify(Notice::error(e.notice_text()));
                }
            }
        }
        if placed > 0 {
            self.notify
                .notify(Notice::success(format!("{placed} orders placed")));
        }
        Ok(placed)
    }
}

impl Drop for Gateway {
    fn drop(&mut self) {
        self.deactivate();
    }
}

/// How order state reaches a session.
///
/// Push sockets cannot traverse the HTTP proxy in this deployment
/// model, so a proxied session drops the order-topic subscription and
/// runs the full poll cycles instead; without a proxy, the socket
/// carries order updates and only the position cycle polls.
fn ingress_plan(has_proxy: bool) -> (bool, PollMode) {
    if has_proxy {
        (false, PollMode::Full)
    } else {
        (true, PollMode::PositionOnly)
    }
}

/// Clamp one planner rung to the instrument constraints. Rungs that
/// round down to nothing are skipped.
fn normalize_rung(
    price: Price,
    qty: Qty,
    instrument: Option<&InstrumentInfo>,
) -> Option<(Price, Qty)> {
    let (price, qty) = match instrument {
        Some(info) => (
            price.round_to_tick(info.tick_size),
            qty.round_to_step(info.qty_step),
        ),
        None => (price, qty),
    };
    qty.is_positive().then_some((price, qty))
}

/// Route one inbound topic frame into the shared state.
///
/// The order topic carries a list of order events for every symbol the
/// account trades; off-symbol events are discarded here, at the ingress
/// boundary, before the reconciler sees them.
fn route_frame(frame: &TopicFrame, decoder: &PriceFeedDecoder, state: &SharedState, generation: u64) {
    if frame.topic == ORDER_TOPIC {
        let rows = match frame.data.as_array() {
            Some(rows) => rows,
            None => {
                warn!("Order frame data is not an array");
                return;
            }
        };
        let symbol = state.symbol();
        for row in rows {
            match serde_json::from_value::<RawOrder>(row.clone()) {
                Ok(raw) => {
                    if raw.symbol != symbol.as_str() {
                        continue;
                    }
                    state.apply_order(generation, raw.into_order());
                }
                Err(e) => {
                    warn!(error = %e, "Dropping unparseable order event");
                }
            }
        }
        return;
    }

    match decoder.decode(frame) {
        Ok(Some(update)) => {
            state.apply_price(generation, update.last_price, update.mark_price);
        }
        Ok(None) => {
            // Unrecognized topic; the decoder already logged it.
        }
        Err(e) => {
            warn!(error = %e, topic = %frame.topic, "Dropping undecodable tick");
        }
    }
}
