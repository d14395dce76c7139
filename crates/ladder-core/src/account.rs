//! Account credentials and network selection.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An exchange API account.
///
/// Several accounts may be saved in the settings store; exactly one is
/// active at a time. Switching the active account restarts the gateway.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// API key identifier.
    #[serde(default)]
    pub api_key: String,
    /// API secret used for request signing. Never logged.
    #[serde(default)]
    pub api_secret: String,
    /// Free-form label shown to the operator.
    #[serde(default)]
    pub label: String,
    /// Whether this account lives on the test network.
    #[serde(default)]
    pub is_testnet: bool,
}

impl Account {
    /// Check that both key and secret are present.
    pub fn has_credentials(&self) -> bool {
        !self.api_key.is_empty() && !self.api_secret.is_empty()
    }

    /// Network this account trades on.
    pub fn network(&self) -> Network {
        if self.is_testnet {
            Network::Testnet
        } else {
            Network::Mainnet
        }
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Label only; key material stays out of logs.
        write!(f, "{} ({})", self.label, self.network())
    }
}

/// Exchange network with its fixed endpoint pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    Testnet,
}

impl Network {
    /// REST base URL, with trailing slash.
    pub fn rest_url(&self) -> &'static str {
        match self {
            Self::Mainnet => "https://api.bybit.com/",
            Self::Testnet => "https://api-testnet.bybit.com/",
        }
    }

    /// Push-feed socket URL.
    pub fn ws_url(&self) -> &'static str {
        match self {
            Self::Mainnet => "wss://stream.bybit.com/realtime",
            Self::Testnet => "wss://stream-testnet.bybit.com/realtime",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mainnet => write!(f, "mainnet"),
            Self::Testnet => write!(f, "testnet"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_credentials() {
        let mut account = Account::default();
        assert!(!account.has_credentials());

        account.api_key = "key".to_string();
        assert!(!account.has_credentials());

        account.api_secret = "secret".to_string();
        assert!(account.has_credentials());
    }

    #[test]
    fn test_network_selection() {
        let account = Account {
            is_testnet: true,
            ..Default::default()
        };
        assert_eq!(account.network(), Network::Testnet);
        assert!(account.network().rest_url().contains("testnet"));
        assert!(account.network().ws_url().contains("testnet"));
    }

    #[test]
    fn test_display_omits_key_material() {
        let account = Account {
            api_key: "k".to_string(),
            api_secret: "topsecret".to_string(),
            label: "main".to_string(),
            is_testnet: false,
        };
        let shown = account.to_string();
        assert!(!shown.contains("topsecret"));
        assert!(shown.contains("main"));
    }
}
