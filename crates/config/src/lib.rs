//! chwire configuration
//!
//! TOML configuration for the client and the bulk loader. Every section is
//! optional; an empty file connects to `127.0.0.1:9000` as `default`.
//!
//! # Parsing
//!
//! ```
//! use chwire_config::Config;
//! use std::str::FromStr;
//!
//! let config = Config::from_str("[clickhouse]\naddr = \"ch-1:9000\"").unwrap();
//! assert_eq!(config.clickhouse.addr, "ch-1:9000");
//! ```
//!
//! # Example Config
//!
//! ```toml
//! [clickhouse]
//! addr = "127.0.0.1:9000"
//! database = "default"
//! username = "default"
//! dial_timeout = "10s"
//!
//! [pool]
//! max_open_conns = 8
//! max_idle_conns = 8
//! conn_max_lifetime = "1h"
//!
//! [settings]
//! insert_deduplicate = false
//!
//! [log]
//! level = "info"
//!
//! [loader]
//! table = "example"
//! concurrency = 8
//! ```

mod clickhouse;
mod error;
mod loader;
mod logging;
mod pool;
mod validation;

use std::fs;
use std::path::Path;
use std::str::FromStr;

pub use clickhouse::{ClickHouseConfig, SettingValue, Settings};
pub use error::{ConfigError, Result};
pub use loader::LoaderConfig;
pub use logging::{LogConfig, LogFormat, LogLevel};
pub use pool::PoolConfig;

use serde::Deserialize;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server address, credentials and timeouts
    pub clickhouse: ClickHouseConfig,

    pub pool: PoolConfig,

    /// Query settings sent with every query
    pub settings: Settings,

    pub log: LogConfig,

    /// Workload for the loader binary
    pub loader: LoaderConfig,
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read, is not valid TOML, or
    /// fails validation.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::IoError {
            path: path.display().to_string(),
            source: e,
        })?;

        Self::from_str(&contents)
    }

    /// Re-check after command-line overrides have been applied
    pub fn validate(&self) -> Result<()> {
        validation::validate_config(self)
    }

    /// Settings as name/value strings, in name order
    pub fn settings(&self) -> impl Iterator<Item = (&str, String)> + '_ {
        self.settings
            .iter()
            .map(|(name, value)| (name.as_str(), value.to_string()))
    }

    fn parse(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
