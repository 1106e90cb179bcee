//! Load generator configuration

use serde::Deserialize;

/// Shape of the generated load
///
/// # Example
///
/// ```toml
/// [loader]
/// table = "example"
/// concurrency = 8
/// inserts = 100
/// rows = 10000
/// node = 0
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Target table, `(DateTime, UInt64)` columns
    pub table: String,

    /// Parallel insert tasks
    pub concurrency: usize,

    /// Batches per task
    pub inserts: usize,

    /// Rows per batch
    pub rows: usize,

    /// Node index when several loaders share one table; keeps ids disjoint
    pub node: u64,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            table: "example".into(),
            concurrency: 4,
            inserts: 10,
            rows: 10_000,
            node: 0,
        }
    }
}
