//! Tests for the connection pool

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use chwire_protocol::{ColumnType, ServerException, ServerPacket};

use super::*;
use crate::test::{Exchange, FaultHandle, MockServer, Recorder, connect_faulty};

/// Pool over mock servers built by `server`, with dial and fault tracking
struct Harness {
    pool: Pool,
    recorder: Recorder,
    dials: Arc<AtomicUsize>,
    faults: Arc<Mutex<Vec<FaultHandle>>>,
}

impl Harness {
    fn new(options: ClientOptions) -> Self {
        Self::with_server(options, MockServer::new)
    }

    fn with_server<F>(options: ClientOptions, server: F) -> Self
    where
        F: Fn() -> MockServer + Send + Sync + 'static,
    {
        let recorder = Recorder::default();
        let dials = Arc::new(AtomicUsize::new(0));
        let faults: Arc<Mutex<Vec<FaultHandle>>> = Arc::default();

        let pool = {
            let recorder = recorder.clone();
            let dials = dials.clone();
            let faults = faults.clone();
            Pool::with_connector(options, move || {
                dials.fetch_add(1, Ordering::SeqCst);
                let server = server()
                    .column("id", ColumnType::UInt64)
                    .recording_to(recorder.clone());
                let faults = faults.clone();
                async move {
                    let (conn, fault, _server) = connect_faulty(server).await?;
                    faults.lock().push(fault);
                    Ok::<_, Error>(conn)
                }
            })
        };

        Self {
            pool,
            recorder,
            dials,
            faults,
        }
    }

    fn dials(&self) -> usize {
        self.dials.load(Ordering::SeqCst)
    }

    fn last_fault(&self) -> FaultHandle {
        self.faults.lock().last().cloned().unwrap()
    }

    async fn insert(&self, ids: &[u64]) -> Result<()> {
        let mut batch = self
            .pool
            .prepare_batch("INSERT INTO example", QueryOptions::new())
            .await?;
        for &id in ids {
            batch.append((id,))?;
        }
        batch.send().await
    }
}

fn stats(open: usize, idle: usize) -> PoolStats {
    PoolStats { open, idle }
}

// =============================================================================
// Reuse decisions
// =============================================================================

#[tokio::test]
async fn test_reuses_connection_after_successful_batch() {
    let harness = Harness::new(ClientOptions::default());

    harness.insert(&[1, 2]).await.unwrap();
    assert_eq!(harness.pool.stats(), stats(1, 1));

    harness.insert(&[3]).await.unwrap();
    assert_eq!(harness.dials(), 1);
    assert_eq!(harness.recorder.blocks().len(), 2);
    assert_eq!(harness.pool.stats(), stats(1, 1));
}

#[tokio::test]
async fn test_reuses_connection_after_server_exception() {
    let harness = Harness::with_server(ClientOptions::default(), || {
        MockServer::new().exchange(Exchange::accept().replies(vec![ServerPacket::Exception(
            ServerException::new(252, "DB::Exception", "Too many parts"),
        )]))
    });

    let err = harness.insert(&[1]).await.unwrap_err();
    assert_eq!(err.server_code(), Some(252));
    assert_eq!(harness.pool.stats(), stats(1, 1));

    // same connection, next exchange accepts
    harness.insert(&[2]).await.unwrap();
    assert_eq!(harness.dials(), 1);
}

#[tokio::test]
async fn test_reuses_connection_after_rejected_prepare() {
    let harness = Harness::with_server(ClientOptions::default(), || {
        MockServer::new().exchange(Exchange::reject(ServerException::new(
            60,
            "DB::Exception",
            "Table default.example does not exist",
        )))
    });

    let err = harness.insert(&[1]).await.unwrap_err();
    assert_eq!(err.server_code(), Some(60));
    assert_eq!(harness.pool.stats(), stats(1, 1));
}

#[tokio::test]
async fn test_discards_connection_after_transport_failure() {
    let harness = Harness::new(ClientOptions::default());

    let mut batch = harness
        .pool
        .prepare_batch("INSERT INTO example", QueryOptions::new())
        .await
        .unwrap();
    batch.append((1u64,)).unwrap();
    harness.last_fault().fail_writes(true);

    let err = batch.send().await.unwrap_err();
    assert_eq!(err.kind(), crate::ErrorKind::Transport);
    assert_eq!(harness.pool.stats(), stats(0, 0));

    harness.insert(&[2]).await.unwrap();
    assert_eq!(harness.dials(), 2);
}

#[tokio::test]
async fn test_discards_connection_after_invalid_column_access() {
    let harness = Harness::new(ClientOptions::default());

    let mut batch = harness
        .pool
        .prepare_batch("INSERT INTO example", QueryOptions::new())
        .await
        .unwrap();
    let err = batch.column(3).append(1u64).unwrap_err();

    assert!(matches!(err, Error::InvalidColumnIndex { index: 3, .. }));
    assert_eq!(harness.pool.stats(), stats(0, 0));
    assert!(batch.send().await.is_err());
    assert_eq!(harness.pool.stats(), stats(0, 0));
}

#[tokio::test]
async fn test_discards_abandoned_batch() {
    let harness = Harness::new(ClientOptions::default());

    let mut batch = harness
        .pool
        .prepare_batch("INSERT INTO example", QueryOptions::new())
        .await
        .unwrap();
    batch.append((1u64,)).unwrap();
    drop(batch);

    assert_eq!(harness.pool.stats(), stats(0, 0));
    assert!(harness.recorder.blocks().is_empty());
}

#[tokio::test]
async fn test_discards_connection_with_active_insert() {
    let harness = Harness::new(ClientOptions::default());

    let mut conn = harness.pool.acquire().await.unwrap();
    conn.begin_insert("INSERT INTO example", QueryOptions::new())
        .await
        .unwrap();
    drop(conn);

    assert_eq!(harness.pool.stats(), stats(0, 0));
}

#[tokio::test]
async fn test_expired_connections_are_not_reused() {
    let harness = Harness::new(ClientOptions {
        conn_max_lifetime: Duration::ZERO,
        ..ClientOptions::default()
    });

    harness.insert(&[1]).await.unwrap();
    harness.insert(&[2]).await.unwrap();

    assert_eq!(harness.dials(), 2);
    assert_eq!(harness.pool.stats(), stats(0, 0));
}

// =============================================================================
// Capacity
// =============================================================================

#[tokio::test]
async fn test_pooled_connection_returned_on_drop() {
    let harness = Harness::new(ClientOptions::default());

    let mut conn = harness.pool.acquire().await.unwrap();
    conn.ping().await.unwrap();
    assert_eq!(harness.pool.stats(), stats(1, 0));
    drop(conn);

    assert_eq!(harness.pool.stats(), stats(1, 1));
}

#[tokio::test]
async fn test_idle_list_is_bounded() {
    let harness = Harness::new(ClientOptions {
        max_idle_conns: 1,
        ..ClientOptions::default()
    });

    let a = harness.pool.acquire().await.unwrap();
    let b = harness.pool.acquire().await.unwrap();
    assert_eq!(harness.pool.stats(), stats(2, 0));
    drop(a);
    drop(b);

    assert_eq!(harness.pool.stats(), stats(1, 1));
}

#[tokio::test]
async fn test_acquire_times_out_when_exhausted() {
    let harness = Harness::new(ClientOptions {
        max_open_conns: 1,
        dial_timeout: Duration::from_millis(50),
        ..ClientOptions::default()
    });

    let held = harness.pool.acquire().await.unwrap();
    let err = harness.pool.acquire().await.unwrap_err();
    assert!(matches!(err, Error::PoolTimeout), "{err:?}");

    drop(held);
    harness.pool.acquire().await.unwrap();
    assert_eq!(harness.dials(), 1);
}

#[tokio::test]
async fn test_waiter_gets_released_connection() {
    let harness = Harness::new(ClientOptions {
        max_open_conns: 1,
        ..ClientOptions::default()
    });

    let held = harness.pool.acquire().await.unwrap();
    let pool = harness.pool.clone();
    let waiter = tokio::spawn(async move { pool.acquire().await.map(|_| ()) });

    tokio::task::yield_now().await;
    drop(held);
    waiter.await.unwrap().unwrap();
    assert_eq!(harness.dials(), 1);
}

#[tokio::test]
async fn test_close() {
    let harness = Harness::new(ClientOptions::default());

    let held = harness.pool.acquire().await.unwrap();
    harness.insert(&[1]).await.unwrap();
    assert_eq!(harness.pool.stats(), stats(2, 1));

    harness.pool.close();
    assert_eq!(harness.pool.stats(), stats(1, 0));
    assert!(matches!(
        harness.pool.acquire().await.unwrap_err(),
        Error::PoolClosed
    ));

    drop(held);
    assert_eq!(harness.pool.stats(), stats(0, 0));
}

// =============================================================================
// Task safety
// =============================================================================

fn assert_send<T: Send>(_: &T) {}

#[test]
fn test_pool_futures_are_send() {
    let pool = Pool::new(ClientOptions::default());

    assert_send(&pool.acquire());
    assert_send(&pool.prepare_batch("INSERT INTO example", QueryOptions::new()));
}

#[tokio::test]
async fn test_connection_futures_are_send() {
    let harness = Harness::new(ClientOptions::default());
    let mut conn = harness.pool.acquire().await.unwrap();

    let options = QueryOptions::new().on_progress(|_| {});
    assert_send(&conn.begin_insert("INSERT INTO example", options));
    assert_send(&conn.commit());

    let mut batch = harness
        .pool
        .prepare_batch("INSERT INTO example", QueryOptions::new())
        .await
        .unwrap();
    assert_send(&batch.send());
}

#[tokio::test]
async fn test_batches_from_spawned_tasks() {
    let harness = Harness::new(ClientOptions {
        max_open_conns: 2,
        ..ClientOptions::default()
    });

    let mut tasks = tokio::task::JoinSet::new();
    for id in 0..4u64 {
        let pool = harness.pool.clone();
        tasks.spawn(async move {
            let mut batch = pool
                .prepare_batch(
                    "INSERT INTO example",
                    QueryOptions::new().on_progress(|_| {}),
                )
                .await?;
            batch.append((id,))?;
            batch.send().await
        });
    }
    while let Some(joined) = tasks.join_next().await {
        joined.unwrap().unwrap();
    }

    assert_eq!(harness.recorder.blocks().len(), 4);
    assert!(harness.dials() <= 2);
}

#[tokio::test]
async fn test_pooled_connection_debug() {
    let harness = Harness::new(ClientOptions::default());
    let conn = harness.pool.acquire().await.unwrap();

    let rendered = format!("{conn:?}");
    assert!(rendered.starts_with("PooledConnection"), "{rendered}");
    assert!(rendered.contains("127.0.0.1:9000"), "{rendered}");
}
