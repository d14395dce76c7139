//! Application orchestration.
//!
//! Loads the persisted settings, wires the gateway, autoconnects when
//! configured, and logs a periodic status line until shutdown.

use crate::error::AppResult;
use ladder_core::{LogSink, Symbol};
use ladder_gateway::{Gateway, Settings};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Status line period.
const STATUS_INTERVAL: Duration = Duration::from_secs(5);

/// Main application.
pub struct Application {
    settings: Settings,
    gateway: Gateway,
}

impl Application {
    pub fn new(settings: Settings) -> Self {
        let symbol = Symbol::from(settings.symbol.clone());
        let gateway = Gateway::new(Arc::new(LogSink), settings.poll_config(), symbol);
        Self { settings, gateway }
    }

    /// Start the session for the configured account and symbol.
    pub async fn connect(&mut self) -> AppResult<()> {
        self.gateway
            .activate(
                self.settings.account.clone(),
                Symbol::from(self.settings.symbol.clone()),
                self.settings.proxy_url.clone(),
            )
            .await?;
        Ok(())
    }

    /// Run until ctrl-c.
    pub async fn run(&mut self) -> AppResult<()> {
        if self.settings.autoconnect && self.settings.account.has_credentials() {
            if let Err(e) = self.connect().await {
                // The console stays up; the operator can fix credentials
                // or connectivity and restart.
                warn!(error = %e, "Autoconnect failed");
            }
        } else {
            info!("Autoconnect disabled or no credentials configured");
        }

        let mut status = tokio::time::interval(STATUS_INTERVAL);
        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    info!("Shutdown requested");
                    break;
                }
                _ = status.tick() => {
                    self.log_status();
                }
            }
        }

        self.gateway.deactivate();
        Ok(())
    }

    fn log_status(&self) {
        let state = self.gateway.state();
        let price = state.price();
        info!(
            symbol = %state.symbol(),
            last = ?price.last_price,
            mark = ?price.mark_price,
            balance = %state.wallet_balance(),
            open_orders = state.open_orders().len(),
            position = ?state.position().map(|p| format!("{} {}", p.side, p.size)),
            "status"
        );
    }
}
