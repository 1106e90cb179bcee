//! Connection pool
//!
//! Hands out one connection per checkout and takes it back through the
//! release path, deciding from the connection's last error whether it can
//! serve another query.
//!
//! - At most `max_open_conns` checkouts at a time (semaphore permits);
//!   waiting for a permit is bounded by `dial_timeout`
//! - Up to `max_idle_conns` connections kept between checkouts
//! - Connections older than `conn_max_lifetime` are closed, not reused

use std::collections::VecDeque;
use std::future::Future;
use std::ops::{Deref, DerefMut};
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, warn};

use crate::batch::{Batch, Release};
use crate::connection::Connection;
use crate::error::{Error, Result};
use crate::options::{ClientOptions, QueryOptions};

type ConnectFuture = Pin<Box<dyn Future<Output = Result<Connection>> + Send>>;
type Connector = Arc<dyn Fn() -> ConnectFuture + Send + Sync>;

/// Snapshot of pool occupancy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    /// Established connections, idle or checked out
    pub open: usize,
    pub idle: usize,
}

struct PoolInner {
    options: ClientOptions,
    connector: Connector,
    idle: Mutex<VecDeque<Connection>>,
    semaphore: Arc<Semaphore>,
    open: AtomicUsize,
}

impl PoolInner {
    fn is_expired(&self, conn: &Connection) -> bool {
        conn.created_at().elapsed() >= self.options.conn_max_lifetime
    }

    /// Take back a released connection, keeping it only if it is clean
    fn put(&self, mut conn: Connection) {
        let reason = if let Some(err) = conn.last_error().filter(|e| !e.is_reusable()) {
            Some(err.to_string())
        } else if conn.has_active_insert() {
            Some("insert still in progress".to_string())
        } else if self.is_expired(&conn) {
            Some("max lifetime exceeded".to_string())
        } else if self.semaphore.is_closed() {
            Some("pool closed".to_string())
        } else {
            None
        };

        if let Some(reason) = reason {
            self.open.fetch_sub(1, Ordering::SeqCst);
            warn!(reason = %reason, server = %conn.server(), "discarding connection");
            return;
        }

        let mut idle = self.idle.lock();
        if idle.len() >= self.options.max_idle_conns {
            drop(idle);
            self.open.fetch_sub(1, Ordering::SeqCst);
            debug!("idle list full, closing connection");
            return;
        }
        conn.set_last_error(None);
        conn.clear_deadline();
        idle.push_back(conn);
    }

    /// Next idle connection that is still within its lifetime
    fn pop_idle(&self) -> Option<Connection> {
        let mut idle = self.idle.lock();
        while let Some(conn) = idle.pop_front() {
            if !self.is_expired(&conn) {
                return Some(conn);
            }
            self.open.fetch_sub(1, Ordering::SeqCst);
            debug!("closing expired idle connection");
        }
        None
    }
}

/// Pool of connections to one server
///
/// Cheap to clone; clones share the same connections.
#[derive(Clone)]
pub struct Pool {
    inner: Arc<PoolInner>,
}

impl std::fmt::Debug for Pool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pool")
            .field("addr", &self.inner.options.addr)
            .field("stats", &self.stats())
            .finish()
    }
}

impl Pool {
    /// Pool dialing `options.addr` over TCP
    pub fn new(options: ClientOptions) -> Self {
        let dial = options.clone();
        Self::with_connector(options, move || {
            let options = dial.clone();
            async move { Connection::connect(&options).await }
        })
    }

    /// Pool creating connections with a custom connector
    pub fn with_connector<F, Fut>(options: ClientOptions, connector: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Connection>> + Send + 'static,
    {
        let connector: Connector = Arc::new(move || -> ConnectFuture { Box::pin(connector()) });
        Self {
            inner: Arc::new(PoolInner {
                semaphore: Arc::new(Semaphore::new(options.max_open_conns.max(1))),
                options,
                connector,
                idle: Mutex::new(VecDeque::new()),
                open: AtomicUsize::new(0),
            }),
        }
    }

    /// Check out a connection, reusing an idle one when possible
    ///
    /// # Errors
    ///
    /// `PoolTimeout` when no slot frees up within `dial_timeout`,
    /// `PoolClosed` after [`close`](Self::close), or the connect error.
    pub async fn acquire(&self) -> Result<PooledConnection> {
        let inner = &self.inner;
        let permit = match tokio::time::timeout(
            inner.options.dial_timeout,
            inner.semaphore.clone().acquire_owned(),
        )
        .await
        {
            Ok(Ok(permit)) => permit,
            Ok(Err(_)) => return Err(Error::PoolClosed),
            Err(_) => return Err(Error::PoolTimeout),
        };

        let conn = match inner.pop_idle() {
            Some(conn) => conn,
            None => {
                let conn = (inner.connector)().await?;
                inner.open.fetch_add(1, Ordering::SeqCst);
                conn
            }
        };

        Ok(PooledConnection {
            conn: Some(conn),
            inner: Arc::clone(inner),
            _permit: permit,
        })
    }

    /// Check out a connection and start a batch on it
    ///
    /// The batch returns the connection to this pool when it is sent, fails
    /// or is dropped.
    pub async fn prepare_batch(&self, query: &str, options: QueryOptions) -> Result<Batch> {
        let (conn, release) = self.acquire().await?.into_parts();
        conn.prepare_batch(query, options, release).await
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            open: self.inner.open.load(Ordering::SeqCst),
            idle: self.inner.idle.lock().len(),
        }
    }

    /// Refuse new checkouts and close idle connections
    ///
    /// Checked-out connections are closed as they come back.
    pub fn close(&self) {
        self.inner.semaphore.close();
        let closed: Vec<Connection> = self.inner.idle.lock().drain(..).collect();
        self.inner.open.fetch_sub(closed.len(), Ordering::SeqCst);
        debug!(closed = closed.len(), "pool closed");
    }
}

/// A checked-out connection, returned to the pool on drop
pub struct PooledConnection {
    conn: Option<Connection>,
    inner: Arc<PoolInner>,
    _permit: OwnedSemaphorePermit,
}

impl std::fmt::Debug for PooledConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PooledConnection")
            .field("conn", &self.conn)
            .field("addr", &self.inner.options.addr)
            .finish()
    }
}

impl PooledConnection {
    /// Split into the connection and a callback that returns it
    ///
    /// The checkout slot stays taken until the callback runs. Dropping the
    /// callback unused counts the connection as lost.
    pub fn into_parts(mut self) -> (Connection, Release) {
        let conn = self
            .conn
            .take()
            .expect("pooled connection present until released");
        let release: Release = Box::new(move |conn| {
            let mut slot = self;
            slot.conn = Some(conn);
        });
        (conn, release)
    }
}

impl Deref for PooledConnection {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        self.conn
            .as_ref()
            .expect("pooled connection present until released")
    }
}

impl DerefMut for PooledConnection {
    fn deref_mut(&mut self) -> &mut Connection {
        self.conn
            .as_mut()
            .expect("pooled connection present until released")
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        match self.conn.take() {
            Some(conn) => self.inner.put(conn),
            None => {
                self.inner.open.fetch_sub(1, Ordering::SeqCst);
                debug!("pooled connection dropped without release");
            }
        }
    }
}

#[cfg(test)]
#[path = "pool_test.rs"]
mod pool_test;
