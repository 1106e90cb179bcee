//! chwire-loader - bulk insert load generator
//!
//! Runs P concurrent tasks, each sending I batches of R rows into a
//! `(DateTime, UInt64)` table through one connection pool.
//!
//! # Usage
//!
//! ```bash
//! # CREATE TABLE example (ts DateTime, id UInt64) ENGINE = MergeTree ORDER BY id
//! chwire-loader --addr 127.0.0.1:9000 --table example --concurrency 16 --inserts 10 --rows 100000
//!
//! # several loaders against one table, ids stay disjoint
//! chwire-loader --config loader.toml --node 0
//! chwire-loader --config loader.toml --node 1
//! ```

mod options;
mod workload;

use std::path::PathBuf;

use anyhow::{Context, Result};
use chwire_client::Pool;
use chwire_config::{Config, LogConfig, LogFormat, LogLevel};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::workload::Workload;

/// Bulk insert load generator
#[derive(Parser, Debug)]
#[command(name = "chwire-loader")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, env = "CHWIRE_CONFIG")]
    config: Option<PathBuf>,

    /// Server address, host:port
    #[arg(long)]
    addr: Option<String>,

    #[arg(long)]
    database: Option<String>,

    /// Target table with (DateTime, UInt64) columns
    #[arg(long)]
    table: Option<String>,

    /// Concurrent insert tasks (P)
    #[arg(short = 'p', long)]
    concurrency: Option<usize>,

    /// Batches per task (I)
    #[arg(short, long)]
    inserts: Option<usize>,

    /// Rows per batch (R)
    #[arg(short, long)]
    rows: Option<usize>,

    /// Node index, keeps ids disjoint between loaders
    #[arg(short, long)]
    node: Option<u64>,

    /// Log level (trace, debug, info, warn, error). Overrides config file.
    #[arg(short, long)]
    log_level: Option<LogLevel>,

    /// Log as JSON lines
    #[arg(long)]
    json: bool,
}

impl Cli {
    /// Command-line flags win over the config file
    fn apply(&self, config: &mut Config) {
        if let Some(addr) = &self.addr {
            config.clickhouse.addr = addr.clone();
        }
        if let Some(database) = &self.database {
            config.clickhouse.database = database.clone();
        }
        if let Some(table) = &self.table {
            config.loader.table = table.clone();
        }
        if let Some(concurrency) = self.concurrency {
            config.loader.concurrency = concurrency;
            // one connection per task
            config.pool.max_open_conns = config.pool.max_open_conns.max(concurrency);
        }
        if let Some(inserts) = self.inserts {
            config.loader.inserts = inserts;
        }
        if let Some(rows) = self.rows {
            config.loader.rows = rows;
        }
        if let Some(node) = self.node {
            config.loader.node = node;
        }
        if let Some(level) = self.log_level {
            config.log.level = level;
        }
        if self.json {
            config.log.format = LogFormat::Json;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    cli.apply(&mut config);
    config.validate().context("invalid configuration")?;

    init_logging(&config.log)?;

    let workload = Workload::from(&config.loader);
    info!(
        addr = %config.clickhouse.addr,
        database = %config.clickhouse.database,
        table = %workload.table,
        concurrency = workload.concurrency,
        inserts = workload.inserts,
        rows = workload.rows,
        node = workload.node,
        "starting load"
    );

    let pool = Pool::new(options::client_options(&config));
    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupted, stopping after current batches");
                cancel.cancel();
            }
        }
    });

    let result = workload::run(&pool, workload, cancel).await;
    pool.close();
    let report = result?;

    info!(
        rows = report.rows,
        batches = report.batches,
        elapsed_ms = report.elapsed.as_millis() as u64,
        rows_per_sec = report.rows_per_sec().round() as u64,
        cancelled = report.cancelled,
        "load finished"
    );
    Ok(())
}

/// Install the tracing subscriber; `RUST_LOG` overrides the config
fn init_logging(log: &LogConfig) -> Result<()> {
    let filter = match std::env::var(EnvFilter::DEFAULT_ENV) {
        Ok(directives) => EnvFilter::try_new(directives),
        Err(_) => EnvFilter::try_new(log.directives()),
    }
    .or_else(|_| EnvFilter::try_new("info"))
    .map_err(|e| anyhow::anyhow!("invalid log filter: {}", e))?;

    let registry = tracing_subscriber::registry().with(filter);
    match log.format {
        LogFormat::Console => registry
            .with(fmt::layer().with_target(true).with_thread_ids(false))
            .init(),
        LogFormat::Json => registry.with(fmt::layer().json()).init(),
    }

    Ok(())
}
