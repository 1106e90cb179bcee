//! Bulk insert batches
//!
//! A [`Batch`] owns a connection from the moment the server answers an
//! INSERT with its header block until the batch is sent or fails. Rows are
//! buffered in a [`Block`] shaped like the header; [`Batch::send`] ships
//! them in one go:
//!
//! ```text
//! Data(block) -> Data(empty terminator) -> flush -> drain until EndOfStream
//! ```
//!
//! The connection goes back through the release callback exactly once, with
//! the terminal error (if any) recorded on it. That happens on send, on the
//! first failing column append, or when the batch is dropped while still
//! holding the connection.

use chwire_protocol::{Block, Value};
use tracing::debug;

use crate::connection::Connection;
use crate::error::{Error, Result};
use crate::options::{OnProcess, QueryOptions};
use crate::rewrite::insert_query;

/// Returns a connection to whoever lent it (usually a pool)
///
/// The connection's `last_error()` carries the outcome of the operation
/// that held it.
pub type Release = Box<dyn FnOnce(Connection) + Send>;

/// A connection paired with its release callback, released at most once
pub(crate) struct Lease {
    conn: Option<Connection>,
    release: Option<Release>,
}

impl Lease {
    pub(crate) fn new(conn: Connection, release: Release) -> Self {
        Self {
            conn: Some(conn),
            release: Some(release),
        }
    }

    pub(crate) fn conn(&self) -> Option<&Connection> {
        self.conn.as_ref()
    }

    pub(crate) fn conn_mut(&mut self) -> Result<&mut Connection> {
        self.conn
            .as_mut()
            .ok_or(Error::InvalidState("connection already released"))
    }

    pub(crate) fn is_released(&self) -> bool {
        self.conn.is_none()
    }

    /// Record `err` on the connection and hand it back; no-op once released
    pub(crate) fn release(&mut self, err: Option<Error>) {
        let Some(mut conn) = self.conn.take() else {
            return;
        };
        conn.set_last_error(err);
        match self.release.take() {
            Some(release) => release(conn),
            None => drop(conn),
        }
    }
}

impl Drop for Lease {
    fn drop(&mut self) {
        if self.conn.is_some() {
            debug!("releasing connection of abandoned batch");
            self.release(Some(Error::Abandoned));
        }
    }
}

/// Values that make up one row of a batch
///
/// Implemented for `Vec<T>`, `[T; N]` and tuples of up to twelve elements,
/// where every element converts into a [`Value`].
pub trait IntoRow {
    fn into_row(self) -> Vec<Value>;
}

impl<T: Into<Value>> IntoRow for Vec<T> {
    fn into_row(self) -> Vec<Value> {
        self.into_iter().map(Into::into).collect()
    }
}

impl<T: Into<Value>, const N: usize> IntoRow for [T; N] {
    fn into_row(self) -> Vec<Value> {
        self.into_iter().map(Into::into).collect()
    }
}

macro_rules! tuple_into_row {
    ($($name:ident),+) => {
        impl<$($name: Into<Value>),+> IntoRow for ($($name,)+) {
            #[allow(non_snake_case)]
            fn into_row(self) -> Vec<Value> {
                let ($($name,)+) = self;
                vec![$($name.into()),+]
            }
        }
    };
}

tuple_into_row!(A);
tuple_into_row!(A, B);
tuple_into_row!(A, B, C);
tuple_into_row!(A, B, C, D);
tuple_into_row!(A, B, C, D, E);
tuple_into_row!(A, B, C, D, E, F);
tuple_into_row!(A, B, C, D, E, F, G);
tuple_into_row!(A, B, C, D, E, F, G, H);
tuple_into_row!(A, B, C, D, E, F, G, H, I);
tuple_into_row!(A, B, C, D, E, F, G, H, I, J);
tuple_into_row!(A, B, C, D, E, F, G, H, I, J, K);
tuple_into_row!(A, B, C, D, E, F, G, H, I, J, K, L);

impl Connection {
    /// Start a bulk insert
    ///
    /// The statement is rewritten to end in `VALUES`, sent, and the server's
    /// header block becomes the batch's column layout. The options' deadline,
    /// if any, bounds this call only and is cleared before it returns.
    ///
    /// # Errors
    ///
    /// On any failure the error is recorded on the connection, the
    /// connection is handed to `release`, and the error is returned. A
    /// connection with a direct insert in progress is refused with
    /// `InvalidState`.
    pub async fn prepare_batch(
        self,
        query: &str,
        mut options: QueryOptions,
        release: Release,
    ) -> Result<Batch> {
        let mut lease = Lease::new(self, release);
        let conn = lease.conn_mut()?;

        if conn.has_active_insert() {
            let err = Error::InvalidState("direct insert in progress");
            lease.release(Some(err.clone()));
            return Err(err);
        }

        let query = insert_query(query);
        let mut on_process = std::mem::take(&mut options.on_process);
        if let Some(deadline) = options.deadline {
            conn.set_deadline(deadline);
        }
        let result = conn.start_insert(&query, &options.query_id, &options.settings, &mut on_process).await;
        conn.clear_deadline();

        match result {
            Ok(header) => {
                debug!(
                    query = %query,
                    columns = header.columns(),
                    "batch prepared"
                );
                Ok(Batch {
                    lease,
                    block: header.empty_like(),
                    sent: false,
                    err: None,
                    on_process,
                })
            }
            Err(err) => {
                debug!(query = %query, error = %err, "batch preparation failed");
                lease.release(Some(err.clone()));
                Err(err)
            }
        }
    }
}

/// One bulk insert, sent at most once
///
/// # Example
///
/// ```no_run
/// use chwire_client::{Pool, ClientOptions, QueryOptions};
///
/// # async fn run() -> chwire_client::Result<()> {
/// let pool = Pool::new(ClientOptions::default());
/// let mut batch = pool
///     .prepare_batch("INSERT INTO example (id, name)", QueryOptions::new())
///     .await?;
/// batch.append((1u64, "a"))?;
/// batch.append((2u64, "b"))?;
/// batch.send().await?;
/// # Ok(())
/// # }
/// ```
pub struct Batch {
    lease: Lease,
    block: Block,
    sent: bool,
    err: Option<Error>,
    on_process: OnProcess,
}

impl std::fmt::Debug for Batch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Batch")
            .field("block", &self.block)
            .field("sent", &self.sent)
            .field("err", &self.err)
            .field("released", &self.lease.is_released())
            .finish()
    }
}

impl Batch {
    /// Append one row
    ///
    /// A row that does not fit leaves the block unchanged and the batch
    /// usable.
    pub fn append(&mut self, row: impl IntoRow) -> Result<()> {
        self.check_open()?;
        self.block.append_row(row.into_row())?;
        Ok(())
    }

    /// Handle for appending to a single column
    ///
    /// An out-of-range index is not an error here; the returned handle fails
    /// on first use.
    pub fn column(&mut self, index: usize) -> BatchColumn<'_> {
        let columns = self.block.columns();
        let target = if index < columns {
            Ok(index)
        } else {
            Err(Error::InvalidColumnIndex {
                op: "batch.column",
                index,
                columns,
            })
        };
        BatchColumn {
            batch: self,
            target,
        }
    }

    /// Ship the buffered rows and release the connection
    ///
    /// # Errors
    ///
    /// - `BatchAlreadySent` on every call after the first, without I/O.
    /// - The error captured by a failed column append, without I/O.
    /// - Any transport or server error from the send sequence.
    pub async fn send(&mut self) -> Result<()> {
        if self.sent {
            return Err(Error::BatchAlreadySent);
        }
        self.sent = true;
        if let Some(err) = &self.err {
            return Err(err.clone());
        }

        let result = match self.lease.conn_mut() {
            Ok(conn) => send_block(conn, &self.block, &mut self.on_process).await,
            Err(err) => Err(err),
        };
        match &result {
            Ok(()) => debug!(rows = self.block.rows(), "batch sent"),
            Err(err) => debug!(rows = self.block.rows(), error = %err, "batch send failed"),
        }
        self.lease.release(result.as_ref().err().cloned());
        result
    }

    /// Bound the I/O of a later `send` by a deadline
    pub fn set_deadline(&mut self, deadline: tokio::time::Instant) -> Result<()> {
        self.lease.conn_mut()?.set_deadline(deadline);
        Ok(())
    }

    /// Buffered rows
    pub fn rows(&self) -> usize {
        self.block.rows()
    }

    pub fn column_count(&self) -> usize {
        self.block.columns()
    }

    pub fn block(&self) -> &Block {
        &self.block
    }

    pub fn is_sent(&self) -> bool {
        self.sent
    }

    /// Error captured by a failed column append
    pub fn err(&self) -> Option<&Error> {
        self.err.as_ref()
    }

    /// The held connection, `None` once released
    pub fn connection(&self) -> Option<&Connection> {
        self.lease.conn()
    }

    fn check_open(&self) -> Result<()> {
        if self.sent {
            return Err(Error::BatchAlreadySent);
        }
        match &self.err {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    /// Capture a terminal error and release the connection with it
    fn abort(&mut self, err: Error) {
        let err = self.err.get_or_insert(err).clone();
        self.lease.release(Some(err));
    }
}

/// Data block, terminator, flush, then drain the response
async fn send_block(conn: &mut Connection, block: &Block, on_process: &mut OnProcess) -> Result<()> {
    block.validate()?;
    conn.send_data(block, "").await?;
    conn.send_data(&Block::new(), "").await?;
    conn.flush().await?;
    conn.process(on_process).await
}

/// Column view of a [`Batch`]
///
/// A failed append aborts the whole batch: the error is captured, the
/// connection is released with it, and the batch's `send` returns it.
pub struct BatchColumn<'a> {
    batch: &'a mut Batch,
    target: std::result::Result<usize, Error>,
}

impl BatchColumn<'_> {
    /// Append one value to the column
    ///
    /// Fails without buffering once the batch is sent or aborted.
    pub fn append(&mut self, value: impl Into<Value>) -> Result<()> {
        self.batch.check_open()?;
        let err = match &self.target {
            Err(err) => err.clone(),
            Ok(index) => match self.batch.block.append_column(*index, value.into()) {
                Ok(()) => return Ok(()),
                Err(err) => err.into(),
            },
        };
        self.batch.abort(err.clone());
        Err(err)
    }

    /// Append values in order, stopping at the first failure
    pub fn append_all<I>(&mut self, values: I) -> Result<()>
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        for value in values {
            self.append(value)?;
        }
        Ok(())
    }

    /// Column index, or the captured error for an invalid handle
    pub fn index(&self) -> std::result::Result<usize, &Error> {
        self.target.as_ref().copied()
    }
}

#[cfg(test)]
#[path = "batch_test.rs"]
mod batch_test;
