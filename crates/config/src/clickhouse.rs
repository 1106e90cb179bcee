//! Server connection configuration

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use serde::Deserialize;

/// Where and how to connect
///
/// # Example
///
/// ```toml
/// [clickhouse]
/// addr = "ch-1.internal:9000"
/// database = "analytics"
/// username = "loader"
/// password = "secret"
/// dial_timeout = "10s"
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClickHouseConfig {
    /// Native protocol address, `host:port`
    pub addr: String,

    pub database: String,

    pub username: String,

    pub password: String,

    /// Quota key sent in the handshake
    pub quota_key: String,

    /// TCP connect + handshake timeout, also bounds waiting for a pooled
    /// connection
    /// Default: 30s
    #[serde(with = "humantime_serde")]
    pub dial_timeout: Duration,

    /// Buffered data is written to the socket once it passes this size
    /// Default: 1 MiB
    pub block_buffer_size: usize,
}

impl Default for ClickHouseConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:9000".into(),
            database: "default".into(),
            username: "default".into(),
            password: String::new(),
            quota_key: String::new(),
            dial_timeout: Duration::from_secs(30),
            block_buffer_size: 1024 * 1024,
        }
    }
}

/// Setting value as written in TOML
///
/// The server receives every setting as a string.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum SettingValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for SettingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // the server spells booleans as 0/1
            Self::Bool(b) => write!(f, "{}", u8::from(*b)),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// Query settings sent with every query, in name order
pub type Settings = BTreeMap<String, SettingValue>;
