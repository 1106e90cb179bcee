//! In-process test doubles
//!
//! A scripted server and a fault-injecting transport, for exercising
//! connections, batches and pools without a real server.
//!
//! - [`MockServer`] - server half of the protocol over a duplex stream
//! - [`FaultyStream`] - counts written bytes, fails writes on demand
//!
//! # Example
//!
//! ```ignore
//! use chwire_client::test::{MockServer, connect_mock};
//! use chwire_client::{ColumnType, QueryOptions};
//!
//! let server = MockServer::new().column("id", ColumnType::UInt64);
//! let recorder = server.recorder();
//! let (conn, _server) = connect_mock(server).await?;
//!
//! let mut batch = conn
//!     .prepare_batch("INSERT INTO t", QueryOptions::new(), Box::new(|_| {}))
//!     .await?;
//! batch.append((1u64,))?;
//! batch.send().await?;
//! assert_eq!(recorder.terminators(), 1);
//! ```


use tokio::io::DuplexStream;
use tokio::task::JoinHandle;

pub use fault::{FaultHandle, FaultyStream};
pub use server::{Exchange, MockServer, ReceivedBlock, Recorder};

use crate::connection::Connection;
use crate::error::Result;
use crate::options::ClientOptions;

/// Handshake a connection with a spawned [`MockServer`]
pub async fn connect_mock(server: MockServer) -> Result<(Connection, JoinHandle<Result<()>>)> {
    let (stream, handle) = server.spawn();
    let conn = Connection::handshake(stream, &ClientOptions::default()).await?;
    Ok((conn, handle))
}

/// Like [`connect_mock`], over a [`FaultyStream`]
pub async fn connect_faulty(
    server: MockServer,
) -> Result<(Connection, FaultHandle, JoinHandle<Result<()>>)> {
    let (stream, handle) = server.spawn();
    let (stream, fault): (FaultyStream<DuplexStream>, _) = FaultyStream::new(stream);
    let conn = Connection::handshake(stream, &ClientOptions::default()).await?;
    Ok((conn, fault, handle))
}
