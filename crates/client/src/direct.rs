//! Direct-write inserts
//!
//! The lower-level alternative to [`Batch`](crate::Batch) for callers that
//! drive the insert themselves:
//!
//! ```text
//! begin_insert -> block() / write_value -> write_block (any number)
//!              -> commit | rollback
//! ```
//!
//! Nothing here releases the connection; error handling is the caller's.
//! A connection with an insert in progress refuses `prepare_batch`, and a
//! batch owns its connection, so the two surfaces never overlap.

use chwire_protocol::{Block, Value};
use tracing::debug;

use crate::connection::Connection;
use crate::error::{Error, Result};
use crate::options::{OnProcess, QueryOptions};
use crate::rewrite::insert_query;

/// Insert in progress on a connection
#[derive(Debug)]
pub(crate) struct Insert {
    header: Block,
    on_process: OnProcess,
}

impl Connection {
    /// Send an INSERT and keep its header block for `block()`
    ///
    /// Failures are recorded as the connection's last error.
    pub async fn begin_insert(&mut self, query: &str, mut options: QueryOptions) -> Result<()> {
        if self.insert.is_some() {
            return Err(Error::InvalidState("insert already in progress"));
        }

        let query = insert_query(query);
        let mut on_process = std::mem::take(&mut options.on_process);
        if let Some(deadline) = options.deadline {
            self.set_deadline(deadline);
        }
        let result = self.start_insert(&query, &options.query_id, &options.settings, &mut on_process).await;
        self.clear_deadline();

        match result {
            Ok(header) => {
                debug!(query = %query, columns = header.columns(), "insert started");
                self.insert = Some(Insert { header, on_process });
                Ok(())
            }
            Err(err) => {
                self.set_last_error(Some(err.clone()));
                Err(err)
            }
        }
    }

    /// Empty block shaped like the active insert's header
    pub fn block(&self) -> Result<Block> {
        match &self.insert {
            Some(insert) => Ok(insert.header.empty_like()),
            None => Err(Error::InvalidState("no active insert")),
        }
    }

    /// Queue one data packet for the active insert
    ///
    /// No terminator, flush or response handling; see [`commit`](Self::commit).
    pub async fn write_block(&mut self, block: &Block) -> Result<()> {
        if self.insert.is_none() {
            return Err(Error::InvalidState("no active insert"));
        }
        let result = match block.validate() {
            Ok(()) => self.send_data(block, "").await,
            Err(err) => Err(err.into()),
        };
        if let Err(err) = &result {
            self.set_last_error(Some(err.clone()));
        }
        result
    }

    /// Append one value to one column of a caller-owned block
    pub fn write_value(&self, block: &mut Block, column: usize, value: impl Into<Value>) -> Result<()> {
        block.append_column(column, value.into())?;
        Ok(())
    }

    /// Finish the active insert: terminator, flush, drain the response
    pub async fn commit(&mut self) -> Result<()> {
        let Some(mut insert) = self.insert.take() else {
            return Err(Error::InvalidState("no active insert"));
        };
        let result = self.finish_insert(&mut insert.on_process).await;
        match &result {
            Ok(()) => debug!("insert committed"),
            Err(err) => self.set_last_error(Some(err.clone())),
        }
        result
    }

    async fn finish_insert(&mut self, on_process: &mut OnProcess) -> Result<()> {
        self.send_data(&Block::new(), "").await?;
        self.flush().await?;
        self.process(on_process).await
    }

    /// Abandon the active insert
    ///
    /// The server cannot be told to discard the rows already sent, so the
    /// connection is marked with `RolledBack` and its transport shut down.
    pub async fn rollback(&mut self) -> Result<()> {
        if self.insert.take().is_none() {
            return Err(Error::InvalidState("no active insert"));
        }
        self.set_last_error(Some(Error::RolledBack));
        if let Err(err) = self.shutdown().await {
            debug!(error = %err, "shutdown after rollback failed");
        }
        debug!("insert rolled back");
        Ok(())
    }
}

#[cfg(test)]
#[path = "direct_test.rs"]
mod direct_test;
