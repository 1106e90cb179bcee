//! Connection pool configuration

use std::time::Duration;

use serde::Deserialize;

/// Pool limits
///
/// # Example
///
/// ```toml
/// [pool]
/// max_open_conns = 16
/// max_idle_conns = 8
/// conn_max_lifetime = "30m"
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Connections checked out at once
    /// Default: 10
    pub max_open_conns: usize,

    /// Connections kept between checkouts
    /// Default: 5
    pub max_idle_conns: usize,

    /// Connections older than this are closed instead of reused
    /// Default: 1h
    #[serde(with = "humantime_serde")]
    pub conn_max_lifetime: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_open_conns: 10,
            max_idle_conns: 5,
            conn_max_lifetime: Duration::from_secs(3600),
        }
    }
}
