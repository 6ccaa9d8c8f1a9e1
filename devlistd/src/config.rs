use std::path::Path;
use serde::Deserialize;
use anyhow::{Context, Result};
use shared::filter::SortOrder;
use shared::protocol::{DEFAULT_EXPIRATION_SECS, MAX_EXPIRATION_SECS};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub list: ListConfig,
    #[serde(default)]
    pub api: ApiConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    /// Path of a newline-delimited JSON event file, or "-" for stdin
    #[serde(default = "default_source")]
    pub source: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_expiration")]
    pub default_expiration_secs: u64,
    #[serde(default = "default_expiry_interval")]
    pub expiry_interval_secs: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListConfig {
    /// Initial search query; empty shows every device
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub sort: SortOrder,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_listen")]
    pub listen: String,
}

fn default_source() -> String {
    "-".to_string()
}

fn default_expiration() -> u64 {
    DEFAULT_EXPIRATION_SECS
}

fn default_expiry_interval() -> u64 {
    5
}

fn default_listen() -> String {
    "[::]:8054".to_string()
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            source: default_source(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            default_expiration_secs: default_expiration(),
            expiry_interval_secs: default_expiry_interval(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn parse(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        if config.store.expiry_interval_secs == 0 {
            anyhow::bail!("store.expiry_interval_secs must be greater than zero");
        }
        if !(1..=MAX_EXPIRATION_SECS).contains(&config.store.default_expiration_secs) {
            anyhow::bail!(
                "store.default_expiration_secs must be between 1 and {}",
                MAX_EXPIRATION_SECS
            );
        }
        Ok(config)
    }
}
