//! Demo configuration.
//!
//! Loads configuration from a TOML file with support for environment variable
//! expansion in string values. Variables use `$VAR` or `${VAR}` syntax. A
//! missing file is not an error: every field has a default.
//!
//! # Example Configuration
//!
//! ```toml
//! cluster = "devnet"
//! merchant = "36vqn1tAJrWC6DcxZtKp7wpTqtP6jhr2DDJJbjs6AUUY"
//! keypair_path = "$HOME/.config/solana/id.json"
//! poll_interval_ms = 250
//! deadline_secs = 60
//! finality = "confirmed"
//!
//! [checkout]
//! label = "SOL Transfer"
//! message = "Transfer of 0.05 SOL requested"
//! memo = "SOL#1"
//! amount = "0.05"
//! ```
//!
//! # Environment Variables
//!
//! - `CONFIG` - Path to configuration file (default: `solpay.toml`)
//! - `SOLPAY_KEYPAIR` - Override the key file path
//! - `SOLPAY_POLL_INTERVAL_MS` - Override the poll interval

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use solpay::ledger::Finality;
use solpay::{Address, Amount, WatchConfig};

/// Default configuration file name.
pub const DEFAULT_CONFIG_PATH: &str = "solpay.toml";

/// Errors loading the configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file exists but could not be read.
    #[error("Can not read config file {}: {source}", path.display())]
    Read {
        /// Path of the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// The file is not valid TOML for [`DemoConfig`].
    #[error("Invalid config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Top-level demo configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemoConfig {
    /// Cluster label reported when connecting (default: `devnet`).
    #[serde(default = "default_cluster")]
    pub cluster: String,

    /// Merchant address used when no recipient is given on the command line.
    #[serde(default)]
    pub merchant: Option<Address>,

    /// Key file of the paying test identity (default: `key.json`).
    #[serde(default = "default_keypair_path")]
    pub keypair_path: PathBuf,

    /// Delay between transaction lookups in milliseconds (default: `250`).
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Give up waiting for the transaction after this many seconds.
    /// Unset means wait indefinitely.
    #[serde(default)]
    pub deadline_secs: Option<u64>,

    /// Commitment level the payment must reach (default: `confirmed`).
    #[serde(default)]
    pub finality: Finality,

    /// Lookups the simulated cluster answers with "not found" before a sent
    /// transaction becomes visible (default: `2`).
    #[serde(default = "default_confirmation_polls")]
    pub confirmation_polls: u32,

    /// Balance credited to the paying identity on connect (default: `1`).
    #[serde(default = "default_airdrop")]
    pub airdrop: Amount,

    /// Checkout parameters.
    #[serde(default)]
    pub checkout: CheckoutConfig,
}

/// What the simulated checkout sells.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutConfig {
    /// Label shown by the wallet.
    #[serde(default = "default_label")]
    pub label: String,

    /// Message shown by the wallet.
    #[serde(default = "default_message")]
    pub message: String,

    /// Memo attached to the transfer.
    #[serde(default = "default_memo")]
    pub memo: String,

    /// Price of the order.
    #[serde(default = "default_amount")]
    pub amount: Amount,

    /// SPL token mint to pay with; unset for native SOL.
    #[serde(default)]
    pub spl_token: Option<Address>,
}

fn default_cluster() -> String {
    "devnet".to_owned()
}

fn default_keypair_path() -> PathBuf {
    PathBuf::from("key.json")
}

const fn default_poll_interval_ms() -> u64 {
    250
}

const fn default_confirmation_polls() -> u32 {
    2
}

fn default_airdrop() -> Amount {
    Amount::from_units(1, 0)
}

fn default_label() -> String {
    "SOL Transfer".to_owned()
}

fn default_message() -> String {
    "Transfer of 0.05 SOL requested".to_owned()
}

fn default_memo() -> String {
    "SOL#1".to_owned()
}

fn default_amount() -> Amount {
    Amount::from_units(5, 2)
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            label: default_label(),
            message: default_message(),
            memo: default_memo(),
            amount: default_amount(),
            spl_token: None,
        }
    }
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            cluster: default_cluster(),
            merchant: None,
            keypair_path: default_keypair_path(),
            poll_interval_ms: default_poll_interval_ms(),
            deadline_secs: None,
            finality: Finality::default(),
            confirmation_polls: default_confirmation_polls(),
            airdrop: default_airdrop(),
            checkout: CheckoutConfig::default(),
        }
    }
}

impl DemoConfig {
    /// Loads configuration from `path`.
    ///
    /// After loading, `$VAR` / `${VAR}` references are expanded from the
    /// process environment, and `SOLPAY_KEYPAIR` / `SOLPAY_POLL_INTERVAL_MS`
    /// override the file values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file exists but cannot be read or parsed.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = if path.exists() {
            std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                path: path.to_owned(),
                source,
            })?
        } else {
            String::new()
        };

        let mut config = Self::from_toml(&content)?;

        if let Ok(keypair) = std::env::var("SOLPAY_KEYPAIR") {
            config.keypair_path = PathBuf::from(keypair);
        }
        if let Some(ms) = std::env::var("SOLPAY_POLL_INTERVAL_MS")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            config.poll_interval_ms = ms;
        }

        Ok(config)
    }

    /// Parses configuration from TOML text after expanding environment
    /// variables. No environment overrides are applied.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] if the text is not a valid configuration.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(&expand_env_vars(content))?)
    }

    /// Polling configuration for the payment watcher.
    #[must_use]
    pub fn watch_config(&self) -> WatchConfig {
        let config = WatchConfig::default()
            .with_interval(Duration::from_millis(self.poll_interval_ms))
            .with_finality(self.finality);
        match self.deadline_secs {
            Some(secs) => config.with_deadline(Duration::from_secs(secs)),
            None => config,
        }
    }
}

/// Expands `$VAR` and `${VAR}` patterns from the environment.
///
/// Unresolved variables are left as-is.
fn expand_env_vars(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(pos) = rest.find('$') {
        result.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];

        let (name, consumed) = if let Some(braced) = after.strip_prefix('{') {
            match braced.find('}') {
                Some(end) => (&braced[..end], end + 2),
                None => ("", 0),
            }
        } else {
            let end = after
                .find(|c: char| !c.is_ascii_alphanumeric() && c != '_')
                .unwrap_or(after.len());
            (&after[..end], end)
        };

        match std::env::var(name) {
            Ok(value) if !name.is_empty() => result.push_str(&value),
            _ => result.push_str(&rest[pos..=pos + consumed]),
        }
        rest = &after[consumed..];
    }

    result.push_str(rest);
    result
}
