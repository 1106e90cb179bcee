//! Config to client options

use chwire_client::{ClientOptions, Setting};
use chwire_config::Config;

/// Connection and pool options for `config`
pub fn client_options(config: &Config) -> ClientOptions {
    let ch = &config.clickhouse;
    ClientOptions {
        addr: ch.addr.clone(),
        database: ch.database.clone(),
        username: ch.username.clone(),
        password: ch.password.clone(),
        quota_key: ch.quota_key.clone(),
        dial_timeout: ch.dial_timeout,
        settings: config
            .settings()
            .map(|(name, value)| Setting::new(name, value))
            .collect(),
        block_buffer_size: ch.block_buffer_size,
        max_open_conns: config.pool.max_open_conns,
        max_idle_conns: config.pool.max_idle_conns,
        conn_max_lifetime: config.pool.conn_max_lifetime,
    }
}
