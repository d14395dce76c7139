//! Persisted operator preferences.
//!
//! A flat key-value file read at startup and written back on every
//! change: saved accounts, the active account, the chosen symbol, the
//! autoconnect flag and the proxy URL.

use crate::error::{GatewayError, GatewayResult};
use ladder_core::Account;
use ladder_poll::PollConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Operator preferences.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// All saved accounts.
    #[serde(default)]
    pub accounts: Vec<Account>,
    /// The active account.
    #[serde(default)]
    pub account: Account,
    /// The active symbol.
    #[serde(default = "default_symbol")]
    pub symbol: String,
    /// Connect automatically at startup.
    #[serde(default = "default_autoconnect")]
    pub autoconnect: bool,
    /// Optional HTTP proxy; when set, order state is polled instead of
    /// pushed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy_url: Option<String>,
    /// Retention window (days) for draining recently-closed orders.
    #[serde(default = "default_removed_orders_max_days")]
    pub removed_orders_max_days: i64,
}

fn default_symbol() -> String {
    "BTCUSD".to_string()
}

fn default_autoconnect() -> bool {
    true
}

fn default_removed_orders_max_days() -> i64 {
    1
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            accounts: Vec::new(),
            account: Account::default(),
            symbol: default_symbol(),
            autoconnect: default_autoconnect(),
            proxy_url: None,
            removed_orders_max_days: default_removed_orders_max_days(),
        }
    }
}

impl Settings {
    /// Load from a file, falling back to defaults when it does not
    /// exist yet (first run).
    pub fn load(path: &Path) -> GatewayResult<Self> {
        if !path.exists() {
            tracing::warn!(path = %path.display(), "Settings file not found, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| GatewayError::Settings(format!("Failed to parse settings: {e}")))
    }

    /// Write back; called on every change.
    pub fn save(&self, path: &Path) -> GatewayResult<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| GatewayError::Settings(format!("Failed to serialize settings: {e}")))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// The proxy setting, empty string treated as unset.
    pub fn proxy(&self) -> Option<&str> {
        self.proxy_url.as_deref().filter(|p| !p.is_empty())
    }

    /// Poll cycle configuration derived from these settings.
    pub fn poll_config(&self) -> PollConfig {
        PollConfig {
            removed_orders_max_days: self.removed_orders_max_days,
            ..PollConfig::default()
        }
    }
}
