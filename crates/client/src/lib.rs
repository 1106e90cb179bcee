//! chwire client - bulk inserts over the ClickHouse native protocol
//!
//! # Architecture
//!
//! ```text
//! Pool::prepare_batch ──► Connection::prepare_batch ──► Batch
//!                                                         │ append / column(i).append
//!                                                         ▼
//!                                 Batch::send: Data ─► Data(empty) ─► flush ─► drain
//!                                                         │
//!                          Pool ◄── release(conn, last error), exactly once
//! ```
//!
//! - [`Connection`] - one handshaken transport, deadline-bounded I/O
//! - [`Batch`] / [`BatchColumn`] - single-use row and column buffering
//! - direct writes on [`Connection`] - `begin_insert`, `write_block`,
//!   `commit`, `rollback` for callers driving the insert themselves
//! - [`Pool`] - bounded checkout with reuse decided by the last error
//! - [`test`] - in-process mock server and fault-injecting transport
//!
//! # Quick Start
//!
//! ```no_run
//! use chwire_client::{ClientOptions, Pool, QueryOptions};
//!
//! # async fn run() -> chwire_client::Result<()> {
//! let pool = Pool::new(ClientOptions {
//!     addr: "127.0.0.1:9000".into(),
//!     ..ClientOptions::default()
//! });
//!
//! let mut batch = pool
//!     .prepare_batch("INSERT INTO example (id, name)", QueryOptions::new())
//!     .await?;
//! for id in 0..1000u64 {
//!     batch.append((id, format!("row {id}")))?;
//! }
//! batch.send().await?;
//! # Ok(())
//! # }
//! ```

mod batch;
mod connection;
mod direct;
mod error;
mod options;
mod pool;
mod rewrite;
pub mod test;

pub use batch::{Batch, BatchColumn, IntoRow, Release};
pub use connection::{Connection, Transport};
pub use error::{Error, ErrorKind, Result};
pub use options::{
    ClientOptions, DEFAULT_BLOCK_BUFFER_SIZE, DEFAULT_DIAL_TIMEOUT, OnProcess, QueryOptions,
};
pub use pool::{Pool, PoolStats, PooledConnection};
pub use rewrite::insert_query;

// Re-export the protocol types callers touch
pub use chwire_protocol::{
    Block, ColumnType, ProfileEvent, ProfileInfo, Progress, ServerException, ServerLog, Setting,
    Value,
};
