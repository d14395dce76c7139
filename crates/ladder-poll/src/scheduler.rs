//! Poll cycle scheduler.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use ladder_book::SharedState;
use ladder_core::{Notice, NotifySink, Symbol};
use ladder_rest::{RestClient, RestError, OPEN_STATUSES, TERMINAL_STATUSES};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Cycle periods and the terminal-order retention window.
#[derive(Debug, Clone)]
pub struct PollConfig {
    /// Open-order cycle period (fast).
    pub open_order_interval_ms: u64,
    /// Terminal-order cycle period (slower).
    pub terminal_order_interval_ms: u64,
    /// Position/balance cycle period.
    pub position_interval_ms: u64,
    /// Stop following order-list pages once the newest terminal order on
    /// a page is older than this many days.
    pub removed_orders_max_days: i64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            open_order_interval_ms: 1600,
            terminal_order_interval_ms: 3000,
            position_interval_ms: 1100,
            removed_orders_max_days: 1,
        }
    }
}

/// Which cycles a session runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollMode {
    /// Order cycles plus position cycle. Used behind an HTTP proxy,
    /// where polling is the only ingress for order state.
    Full,
    /// Position cycle only; the socket carries order updates.
    PositionOnly,
}

/// Runs the periodic reconciliation cycles for one session.
pub struct PollScheduler {
    client: Arc<RestClient>,
    state: SharedState,
    notify: Arc<dyn NotifySink>,
    config: PollConfig,
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl PollScheduler {
    pub fn new(
        client: Arc<RestClient>,
        state: SharedState,
        notify: Arc<dyn NotifySink>,
        config: PollConfig,
    ) -> Self {
        Self {
            client,
            state,
            notify,
            config,
            cancel: CancellationToken::new(),
            tasks: Vec::new(),
        }
    }

    /// Start the cycles for `mode`, stamped with `generation`.
    ///
    /// Idempotent: a running scheduler is stopped first, so re-issuing
    /// start never leaves duplicate concurrent cycles behind.
    pub fn start(&mut self, mode: PollMode, generation: u64) {
        if self.is_running() {
            self.stop();
        }
        self.cancel = CancellationToken::new();
        info!(?mode, generation, "Starting poll cycles");

        self.tasks.push(self.spawn_position_cycle(generation));
        if mode == PollMode::Full {
            self.tasks
                .push(self.spawn_order_cycle(generation, OPEN_STATUSES, self.config.open_order_interval_ms));
            self.tasks.push(self.spawn_order_cycle(
                generation,
                TERMINAL_STATUSES,
                self.config.terminal_order_interval_ms,
            ));
        }
    }

    /// Cancel all cycles.
    pub fn stop(&mut self) {
        if !self.tasks.is_empty() {
            info!("Stopping poll cycles");
        }
        self.cancel.cancel();
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }

    pub fn is_running(&self) -> bool {
        !self.tasks.is_empty()
    }

    fn spawn_order_cycle(&self, generation: u64, statuses: &'static str, period_ms: u64) -> JoinHandle<()> {
        let client = self.client.clone();
        let state = self.state.clone();
        let notify = self.notify.clone();
        let cancel = self.cancel.clone();
        let retention_days = self.config.removed_orders_max_days;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_millis(period_ms));
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    () = cancel.cancelled() => return,
                    _ = ticker.tick() => {
                        poll_orders_once(
                            &client,
                            &state,
                            notify.as_ref(),
                            generation,
                            statuses,
                            retention_days,
                        )
                        .await;
                    }
                }
            }
        })
    }

    fn spawn_position_cycle(&self, generation: u64) -> JoinHandle<()> {
        let client = self.client.clone();
        let state = self.state.clone();
        let notify = self.notify.clone();
        let cancel = self.cancel.clone();
        let period_ms = self.config.position_interval_ms;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_millis(period_ms));
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    () = cancel.cancelled() => return,
                    _ = ticker.tick() => {
                        poll_position_once(&client, &state, notify.as_ref(), generation).await;
                    }
                }
            }
        })
    }
}

impl Drop for PollScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

/// One pass over the order list for a status filter, following pages
/// under the retention rule. Errors are contained per call: the next
/// tick is the retry.
pub async fn poll_orders_once(
    client: &RestClient,
    state: &SharedState,
    notify: &dyn NotifySink,
    generation: u64,
    statuses: &str,
    retention_days: i64,
) {
    let symbol = state.symbol();
    let retention = ChronoDuration::days(retention_days);
    let mut page = 1u32;

    loop {
        match client.fetch_orders(&symbol, statuses, page).await {
            Ok(parsed) => {
                let mut newest_terminal: Option<DateTime<Utc>> = None;
                for order in parsed.orders {
                    // The filter is a request parameter, but responses are
                    // not trusted to honor it: off-symbol rows are dropped
                    // here, before the reconciler sees them.
                    if order.symbol != symbol {
                        continue;
                    }
                    if order.status.is_terminal() {
                        newest_terminal = newest_terminal.max(Some(order.updated_at));
                    }
                    state.apply_order(generation, order);
                }

                if should_fetch_next_page(page, parsed.last_page, newest_terminal, retention, Utc::now()) {
                    page += 1;
                    continue;
                }
            }
            Err(e @ RestError::Exchange { .. }) => {
                warn!(error = %e, statuses, "Order poll rejected by exchange");
                notify.notify(Notice::error(e.notice_text()));
            }
            Err(e) => {
                warn!(error = %e, statuses, "Order poll failed");
            }
        }
        return;
    }
}

/// One pass over the position list: pick the active symbol's row and
/// replace position/balance wholesale.
async fn poll_position_once(
    client: &RestClient,
    state: &SharedState,
    notify: &dyn NotifySink,
    generation: u64,
) {
    let symbol = state.symbol();

    match client.fetch_positions().await {
        Ok(rows) => {
            let (position, balance) = select_position(rows, &symbol);
            state.set_position(generation, position, balance);
        }
        Err(e @ RestError::Exchange { .. }) => {
            warn!(error = %e, "Position poll rejected by exchange");
            notify.notify(Notice::error(e.notice_text()));
        }
        Err(e) => {
            warn!(error = %e, "Position poll failed");
        }
    }
}

/// The balance comes from the symbol's row whether or not a position is
/// open; the position only from a row with non-zero size.
fn select_position(
    rows: Vec<ladder_rest::RawPosition>,
    symbol: &Symbol,
) -> (Option<ladder_core::Position>, rust_decimal::Decimal) {
    let mut balance = rust_decimal::Decimal::ZERO;
    let mut position = None;
    for row in rows {
        if row.symbol != symbol.as_str() {
            continue;
        }
        balance = row.wallet_balance;
        if let Some(open) = row.into_position() {
            position = Some(open);
        }
    }
    (position, balance)
}

/// Pagination cutoff.
///
/// Deeper pages hold ever-older terminal orders; once the newest
/// terminal order seen on the current page predates the retention
/// window there is nothing left worth draining.
pub fn should_fetch_next_page(
    page: u32,
    last_page: u32,
    newest_terminal: Option<DateTime<Utc>>,
    retention: ChronoDuration,
    now: DateTime<Utc>,
) -> bool {
    if last_page <= page {
        return false;
    }
    match newest_terminal {
        None => true,
        Some(updated_at) => updated_at > now - retention,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_more_pages_reported() {
        let now = Utc::now();
        assert!(!should_fetch_next_page(1, 1, None, ChronoDuration::days(1), now));
        assert!(!should_fetch_next_page(3, 2, None, ChronoDuration::days(1), now));
    }

    #[test]
    fn test_follows_pages_without_terminal_orders() {
        let now = Utc::now();
        assert!(should_fetch_next_page(1, 4, None, ChronoDuration::days(1), now));
    }

    #[test]
    fn test_recent_terminal_order_keeps_following() {
        let now = Utc::now();
        let recent = Some(now - ChronoDuration::hours(3));
        assert!(should_fetch_next_page(1, 4, recent, ChronoDuration::days(1), now));
    }

    #[test]
    fn test_old_terminal_order_stops_pagination() {
        let now = Utc::now();
        // Older than the 1-day window: stop even though pages remain.
        let stale = Some(now - ChronoDuration::days(2));
        assert!(!should_fetch_next_page(1, 4, stale, ChronoDuration::days(1), now));
    }

    #[test]
    fn test_default_cycle_periods() {
        let config = PollConfig::default();
        assert_eq!(config.open_order_interval_ms, 1600);
        assert_eq!(config.terminal_order_interval_ms, 3000);
        assert_eq!(config.position_interval_ms, 1100);
        assert_eq!(config.removed_orders_max_days, 1);
    }
}
