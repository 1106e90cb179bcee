//! Configuration validation
//!
//! Rejects configs the client would only fail on later:
//! - unusable server address
//! - zero timeouts or buffer sizes
//! - pool limits that cannot be satisfied
//! - an empty loader workload

use crate::Config;
use crate::error::{ConfigError, Result};

/// Validate the entire configuration
pub fn validate_config(config: &Config) -> Result<()> {
    validate_clickhouse(config)?;
    validate_pool(config)?;
    validate_loader(config)?;
    Ok(())
}

fn validate_clickhouse(config: &Config) -> Result<()> {
    let ch = &config.clickhouse;

    if ch.addr.trim().is_empty() {
        return Err(ConfigError::missing_field("clickhouse", "addr"));
    }
    let Some((host, port)) = ch.addr.rsplit_once(':') else {
        return Err(ConfigError::invalid_value(
            "clickhouse",
            "addr",
            format!("'{}' has no port", ch.addr),
        ));
    };
    if host.is_empty() {
        return Err(ConfigError::invalid_value(
            "clickhouse",
            "addr",
            format!("'{}' has no host", ch.addr),
        ));
    }
    if port.parse::<u16>().is_err() {
        return Err(ConfigError::invalid_value(
            "clickhouse",
            "addr",
            format!("'{port}' is not a port number"),
        ));
    }

    if ch.database.trim().is_empty() {
        return Err(ConfigError::missing_field("clickhouse", "database"));
    }
    if ch.dial_timeout.is_zero() {
        return Err(ConfigError::invalid_value(
            "clickhouse",
            "dial_timeout",
            "must be greater than zero",
        ));
    }
    if ch.block_buffer_size == 0 {
        return Err(ConfigError::invalid_value(
            "clickhouse",
            "block_buffer_size",
            "must be greater than zero",
        ));
    }
    Ok(())
}

fn validate_pool(config: &Config) -> Result<()> {
    let pool = &config.pool;

    if pool.max_open_conns == 0 {
        return Err(ConfigError::invalid_value(
            "pool",
            "max_open_conns",
            "must be at least 1",
        ));
    }
    if pool.max_idle_conns > pool.max_open_conns {
        return Err(ConfigError::invalid_value(
            "pool",
            "max_idle_conns",
            format!(
                "{} exceeds max_open_conns ({})",
                pool.max_idle_conns, pool.max_open_conns
            ),
        ));
    }
    Ok(())
}

fn validate_loader(config: &Config) -> Result<()> {
    let loader = &config.loader;

    if loader.table.trim().is_empty() {
        return Err(ConfigError::missing_field("loader", "table"));
    }
    for (field, value) in [
        ("concurrency", loader.concurrency),
        ("inserts", loader.inserts),
        ("rows", loader.rows),
    ] {
        if value == 0 {
            return Err(ConfigError::invalid_value("loader", field, "must be at least 1"));
        }
    }
    Ok(())
}
