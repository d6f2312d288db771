//! Storage abstractions for table persistence.
//!
//! Every persisted entity is a [`Record`]: a typed row with a table name and a
//! natural key. Backends implement [`TableStorage`] with three write modes:
//!
//! - `overwrite`: the table becomes exactly the given rows
//! - `replace_records`: rows replace stored rows with the same key, others stay
//! - `extend`: append-only, split into partitions for large logs
//!
//! ## Directory Structure
//!
//! ```text
//! data/
//! ├── feeds.json
//! ├── feed_issues.json
//! ├── ...
//! └── posts/                # partitioned append-only log
//!     ├── part-00000.json
//!     └── part-00001.json
//! ```

pub mod local;

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::error::Result;

// Re-export for convenience
pub use local::LocalStorage;

/// A typed table row with a natural key.
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Table name, also the file stem on disk.
    const TABLE: &'static str;

    /// Rows per partition file for append-only tables; `None` keeps one file.
    const MAX_PARTITION_SIZE: Option<usize> = None;

    type Key: Ord + Clone + fmt::Debug + Send + Sync;

    fn key(&self) -> Self::Key;
}

/// Metadata about a storage write operation.
#[derive(Debug, Clone)]
pub struct WriteMetadata {
    /// Table that was written
    pub table: &'static str,
    /// Rows supplied by the caller
    pub written: usize,
    /// Rows in the table after the write
    pub total: usize,
    /// Timestamp of the write
    pub timestamp: DateTime<Utc>,
}

/// On-disk envelope for one table (or one partition).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableFile<R> {
    pub table: String,
    /// ISO 8601 timestamp of last update
    pub updated_at: DateTime<Utc>,
    pub count: usize,
    pub rows: Vec<R>,
}

impl<R: Record> TableFile<R> {
    pub fn new(rows: Vec<R>) -> Self {
        Self {
            table: R::TABLE.to_string(),
            updated_at: Utc::now(),
            count: rows.len(),
            rows,
        }
    }
}

/// Trait for table storage backends.
#[async_trait]
pub trait TableStorage: Send + Sync {
    /// Read every row of a table; a missing table reads as empty.
    async fn read_table<R: Record>(&self) -> Result<Vec<R>>;

    /// Replace the whole table with `rows`.
    async fn overwrite<R: Record>(&self, rows: &[R]) -> Result<WriteMetadata>;

    /// Upsert `rows` by key, keeping stored rows whose key is not supplied.
    async fn replace_records<R: Record>(&self, rows: &[R]) -> Result<WriteMetadata>;

    /// Append `rows` without any key check.
    async fn extend<R: Record>(&self, rows: &[R]) -> Result<WriteMetadata>;
}

/// Merge `incoming` into `existing` by key.
///
/// Incoming rows win over stored rows and later incoming rows win over earlier
/// ones. The result is ordered by key.
pub fn merge_by_key<R: Record>(existing: Vec<R>, incoming: &[R]) -> Vec<R> {
    let mut merged: BTreeMap<R::Key, R> = existing.into_iter().map(|r| (r.key(), r)).collect();
    for row in incoming {
        merged.insert(row.key(), row.clone());
    }
    merged.into_values().collect()
}

/// Drop rows whose key was already seen, keeping the first occurrence and the
/// input order.
pub fn dedup_by_key<R: Record>(rows: impl IntoIterator<Item = R>) -> Vec<R> {
    let mut seen = std::collections::BTreeSet::new();
    rows.into_iter()
        .filter(|r| seen.insert(r.key()))
        .collect()
}
