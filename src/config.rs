use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::contract::AmountPolicy;
use crate::error::LedgerError;

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct LedgerConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub contract: ContractConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Rocksdb,
    Memory,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    #[serde(default = "default_db_path")]
    pub db_path: String,
}

fn default_db_path() -> String {
    "./data/ledger".to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            db_path: default_db_path(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct ContractConfig {
    /// Reject malformed amounts instead of reading them as zero.
    #[serde(default)]
    pub strict_amounts: bool,
}

impl ContractConfig {
    pub fn amount_policy(&self) -> AmountPolicy {
        if self.strict_amounts {
            AmountPolicy::Strict
        } else {
            AmountPolicy::Lenient
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct LogConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl LedgerConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, LedgerError> {
        toml::from_str(s).map_err(|e| LedgerError::Config(e.to_string()))
    }

    pub fn to_toml_string(&self) -> Result<String, LedgerError> {
        toml::to_string_pretty(self).map_err(|e| LedgerError::Config(e.to_string()))
    }

    /// Loads `path`, or writes and returns the defaults when it does not exist.
    /// Unreadable or malformed files fall back to the defaults.
    pub fn load_or_default(path: &str) -> Self {
        if std::path::Path::new(path).exists() {
            match std::fs::read_to_string(path) {
                Ok(s) => match Self::from_toml_str(&s) {
                    Ok(c) => {
                        info!("Config loaded from {}", path);
                        c
                    }
                    Err(e) => {
                        warn!("Error parsing config: {}. Using defaults.", e);
                        Self::default()
                    }
                },
                Err(e) => {
                    warn!("Error reading config: {}. Using defaults.", e);
                    Self::default()
                }
            }
        } else {
            info!("Config file not found at '{}'. Creating default.", path);
            let config = Self::default();
            match config.to_toml_string() {
                Ok(s) => {
                    if let Err(e) = std::fs::write(path, s) {
                        warn!("Could not write default config to {}: {}", path, e);
                    }
                }
                Err(e) => warn!("{}", e),
            }
            config
        }
    }
}
