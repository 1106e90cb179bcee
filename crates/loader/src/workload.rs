//! Concurrent insert workload
//!
//! `concurrency` tasks each send `inserts` batches of `rows` rows into a
//! `(DateTime, UInt64)` table through one pool. Ids are unique across tasks,
//! batches and nodes, so several loaders can share a table and the result
//! can be checked with a count of distinct ids.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use chwire_client::{Pool, QueryOptions};
use chwire_config::LoaderConfig;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Shape of the load
#[derive(Debug, Clone)]
pub struct Workload {
    pub table: String,
    pub concurrency: usize,
    pub inserts: usize,
    pub rows: usize,
    pub node: u64,
}

impl From<&LoaderConfig> for Workload {
    fn from(config: &LoaderConfig) -> Self {
        Self {
            table: config.table.clone(),
            concurrency: config.concurrency,
            inserts: config.inserts,
            rows: config.rows,
            node: config.node,
        }
    }
}

impl Workload {
    /// Row id for task `task`, batch `batch`, row `row`
    pub fn id(&self, task: usize, batch: usize, row: usize) -> u64 {
        let (p, c, r) = (task as u64, batch as u64, row as u64);
        let tasks = self.concurrency as u64;
        let rows = self.rows as u64;
        let inserts = self.inserts as u64;

        let task_start = (p + self.node * tasks) * rows * inserts;
        task_start + rows * c + r
    }

    pub fn total_rows(&self) -> u64 {
        (self.concurrency * self.inserts * self.rows) as u64
    }

    fn query(&self) -> String {
        // columns come from the server's header block
        format!("INSERT INTO {}", self.table)
    }
}

/// Timestamp for a row: one row per millisecond from the epoch
pub fn timestamp(id: u64) -> DateTime<Utc> {
    let secs = (id / 1000) as i64;
    let nanos = ((id % 1000) * 1_000_000) as u32;
    DateTime::from_timestamp(secs, nanos).unwrap_or_default()
}

/// What a run achieved
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Report {
    pub rows: u64,
    pub batches: u64,
    pub elapsed: Duration,
    /// Stopped early by the cancellation token
    pub cancelled: bool,
}

impl Report {
    pub fn rows_per_sec(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.rows as f64 / secs
        } else {
            0.0
        }
    }
}

#[derive(Debug, Default)]
struct TaskReport {
    rows: u64,
    batches: u64,
}

/// Run the workload to completion or cancellation
///
/// The first failing task cancels the rest; its error is returned once all
/// tasks have stopped.
pub async fn run(pool: &Pool, workload: Workload, cancel: CancellationToken) -> Result<Report> {
    let workload = Arc::new(workload);
    let started = Instant::now();
    let mut tasks = JoinSet::new();

    for task in 0..workload.concurrency {
        let pool = pool.clone();
        let workload = Arc::clone(&workload);
        let cancel = cancel.clone();
        tasks.spawn(async move {
            let result = insert_task(&pool, &workload, task, &cancel).await;
            if result.is_err() {
                cancel.cancel();
            }
            result
        });
    }

    let mut report = Report {
        rows: 0,
        batches: 0,
        elapsed: Duration::ZERO,
        cancelled: false,
    };
    let mut first_error = None;

    while let Some(joined) = tasks.join_next().await {
        match joined.context("insert task panicked")? {
            Ok(task) => {
                report.rows += task.rows;
                report.batches += task.batches;
            }
            Err(e) => {
                warn!(error = %e, "insert task failed");
                first_error.get_or_insert(e);
            }
        }
    }

    if let Some(e) = first_error {
        return Err(e);
    }

    report.elapsed = started.elapsed();
    report.cancelled = report.rows < workload.total_rows();
    Ok(report)
}

async fn insert_task(
    pool: &Pool,
    workload: &Workload,
    task: usize,
    cancel: &CancellationToken,
) -> Result<TaskReport> {
    let query = workload.query();
    let started = Instant::now();
    let mut report = TaskReport::default();

    for c in 0..workload.inserts {
        if cancel.is_cancelled() {
            debug!(task, batch = c, "cancelled");
            break;
        }

        let mut batch = pool
            .prepare_batch(&query, QueryOptions::new())
            .await
            .with_context(|| format!("task {task}: prepare batch {c}"))?;

        for r in 0..workload.rows {
            let id = workload.id(task, c, r);
            batch
                .append((timestamp(id), id))
                .with_context(|| format!("task {task}: append row {id}"))?;
        }

        batch
            .send()
            .await
            .with_context(|| format!("task {task}: send batch {c}"))?;

        report.rows += workload.rows as u64;
        report.batches += 1;
    }

    let secs = started.elapsed().as_secs_f64();
    info!(
        task,
        rows = report.rows,
        batches = report.batches,
        rows_per_sec = if secs > 0.0 { report.rows as f64 / secs } else { 0.0 },
        "task done"
    );
    Ok(report)
}

#[cfg(test)]
#[path = "workload_test.rs"]
mod workload_test;
