//! Local filesystem storage implementation.
//!
//! ## Storage Layout
//!
//! ```text
//! {root}/
//! ├── {table}.json          # single-file tables
//! └── {table}/              # partitioned tables
//!     └── part-NNNNN.json
//! ```
//!
//! Every file is written to a temporary sibling first and renamed into place.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use serde::{Serialize, de::DeserializeOwned};
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::storage::{Record, TableFile, TableStorage, WriteMetadata, merge_by_key};

/// Local filesystem storage backend.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root_dir: PathBuf,
}

impl LocalStorage {
    /// Create a new LocalStorage rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root_dir
    }

    /// Get the full path for a relative key.
    fn path(&self, key: &str) -> PathBuf {
        self.root_dir.join(key)
    }

    fn table_key(table: &str) -> String {
        format!("{table}.json")
    }

    fn partition_key(table: &str, index: usize) -> String {
        format!("{table}/part-{index:05}.json")
    }

    /// Ensure parent directory exists.
    async fn ensure_dir(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.path(key);
        self.ensure_dir(&path).await?;

        let tmp = path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    /// Write JSON data.
    async fn write_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(value)?;
        self.write_bytes(key, &bytes).await
    }

    /// Read bytes, returning None if file doesn't exist.
    async fn read_bytes(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path(key);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    /// Read JSON data.
    async fn read_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.read_bytes(key).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Partition file indices of a table, ascending.
    async fn partition_indices(&self, table: &str) -> Result<Vec<usize>> {
        let dir = self.path(table);
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(AppError::Io(e)),
        };

        let mut indices = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let index = name
                .to_str()
                .and_then(|n| n.strip_prefix("part-"))
                .and_then(|n| n.strip_suffix(".json"))
                .and_then(|n| n.parse::<usize>().ok());
            if let Some(index) = index {
                indices.push(index);
            }
        }
        indices.sort_unstable();
        Ok(indices)
    }

    async fn read_partition<R: Record>(&self, index: usize) -> Result<Vec<R>> {
        let key = Self::partition_key(R::TABLE, index);
        Ok(self
            .read_json::<TableFile<R>>(&key)
            .await?
            .map(|f| f.rows)
            .unwrap_or_default())
    }

    /// Write rows into fresh partitions starting at `first_index`.
    async fn write_partitions<R: Record>(
        &self,
        rows: &[R],
        first_index: usize,
        size: usize,
    ) -> Result<()> {
        for (offset, chunk) in rows.chunks(size.max(1)).enumerate() {
            let key = Self::partition_key(R::TABLE, first_index + offset);
            self.write_json(&key, &TableFile::<R>::new(chunk.to_vec()))
                .await?;
        }
        Ok(())
    }

    async fn remove_partitions(&self, table: &str) -> Result<()> {
        match tokio::fs::remove_dir_all(self.path(table)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    fn metadata<R: Record>(written: usize, total: usize) -> WriteMetadata {
        WriteMetadata {
            table: R::TABLE,
            written,
            total,
            timestamp: Utc::now(),
        }
    }
}

#[async_trait]
impl TableStorage for LocalStorage {
    async fn read_table<R: Record>(&self) -> Result<Vec<R>> {
        if R::MAX_PARTITION_SIZE.is_none() {
            let key = Self::table_key(R::TABLE);
            return Ok(self
                .read_json::<TableFile<R>>(&key)
                .await?
                .map(|f| f.rows)
                .unwrap_or_default());
        }

        let mut rows = Vec::new();
        for index in self.partition_indices(R::TABLE).await? {
            rows.extend(self.read_partition::<R>(index).await?);
        }
        Ok(rows)
    }

    async fn overwrite<R: Record>(&self, rows: &[R]) -> Result<WriteMetadata> {
        match R::MAX_PARTITION_SIZE {
            None => {
                let key = Self::table_key(R::TABLE);
                self.write_json(&key, &TableFile::<R>::new(rows.to_vec()))
                    .await?;
            }
            Some(size) => {
                self.remove_partitions(R::TABLE).await?;
                self.write_partitions(rows, 0, size).await?;
            }
        }
        log::debug!("Overwrote {} with {} rows", R::TABLE, rows.len());
        Ok(Self::metadata::<R>(rows.len(), rows.len()))
    }

    async fn replace_records<R: Record>(&self, rows: &[R]) -> Result<WriteMetadata> {
        let existing = self.read_table::<R>().await?;
        let merged = merge_by_key(existing, rows);
        let total = merged.len();
        self.overwrite(&merged).await?;
        log::debug!(
            "Replaced {} rows in {} ({} total)",
            rows.len(),
            R::TABLE,
            total
        );
        Ok(Self::metadata::<R>(rows.len(), total))
    }

    async fn extend<R: Record>(&self, rows: &[R]) -> Result<WriteMetadata> {
        let Some(size) = R::MAX_PARTITION_SIZE else {
            let mut existing = self.read_table::<R>().await?;
            existing.extend_from_slice(rows);
            let total = existing.len();
            self.overwrite(&existing).await?;
            return Ok(Self::metadata::<R>(rows.len(), total));
        };
        let size = size.max(1);

        let indices = self.partition_indices(R::TABLE).await?;
        let mut total: usize = 0;
        let mut remaining = rows;
        let mut next_index = 0;

        if let Some(&last) = indices.last() {
            for &index in &indices[..indices.len() - 1] {
                total += self.read_partition::<R>(index).await?.len();
            }

            // Top up the last partition before opening new ones.
            let mut tail = self.read_partition::<R>(last).await?;
            let room = size.saturating_sub(tail.len()).min(remaining.len());
            if room > 0 {
                tail.extend_from_slice(&remaining[..room]);
                remaining = &remaining[room..];
                let key = Self::partition_key(R::TABLE, last);
                self.write_json(&key, &TableFile::<R>::new(tail.clone()))
                    .await?;
            }
            total += tail.len();
            next_index = last + 1;
        }

        self.write_partitions(remaining, next_index, size).await?;
        total += remaining.len();

        log::debug!("Appended {} rows to {} ({} total)", rows.len(), R::TABLE, total);
        Ok(Self::metadata::<R>(rows.len(), total))
    }
}
