//! Metric persistence backends

use super::{MetricRecord, MetricStats};
use std::path::{Path, PathBuf};

pub type StorageResult<T> = Result<T, StorageError>;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Metrics storage backend
pub trait MetricsStore {
    fn write_batch(&mut self, records: &[MetricRecord]) -> StorageResult<()>;

    /// All records for `key`, in write order
    fn query_all(&self, key: &str) -> StorageResult<Vec<MetricRecord>>;

    fn query_stats(&self, key: &str) -> StorageResult<Option<MetricStats>> {
        let values: Vec<f64> = self.query_all(key)?.iter().map(|r| r.value).collect();
        Ok(MetricStats::from_values(&values))
    }

    fn count(&self) -> StorageResult<usize>;

    /// Flush pending writes
    fn flush(&mut self) -> StorageResult<()>;
}

fn matching(records: &[MetricRecord], key: &str) -> Vec<MetricRecord> {
    records.iter().filter(|r| r.key == key).cloned().collect()
}

#[derive(Debug, Default)]
pub struct InMemoryStore {
    records: Vec<MetricRecord>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all_records(&self) -> &[MetricRecord] {
        &self.records
    }
}

impl MetricsStore for InMemoryStore {
    fn write_batch(&mut self, records: &[MetricRecord]) -> StorageResult<()> {
        self.records.extend_from_slice(records);
        Ok(())
    }

    fn query_all(&self, key: &str) -> StorageResult<Vec<MetricRecord>> {
        Ok(matching(&self.records, key))
    }

    fn count(&self) -> StorageResult<usize> {
        Ok(self.records.len())
    }

    fn flush(&mut self) -> StorageResult<()> {
        Ok(())
    }
}

/// Store backed by a pretty-printed JSON array on disk.
///
/// Existing records are loaded on open; new ones are written on `flush` and on drop.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    records: Vec<MetricRecord>,
    dirty: bool,
}

impl JsonFileStore {
    pub fn open<P: AsRef<Path>>(path: P) -> StorageResult<Self> {
        let path = path.as_ref().to_path_buf();
        let records = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            serde_json::from_str(&content)
                .map_err(|e| StorageError::Serialization(e.to_string()))?
        } else {
            Vec::new()
        };

        Ok(Self {
            path,
            records,
            dirty: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl MetricsStore for JsonFileStore {
    fn write_batch(&mut self, records: &[MetricRecord]) -> StorageResult<()> {
        self.records.extend_from_slice(records);
        self.dirty = true;
        Ok(())
    }

    fn query_all(&self, key: &str) -> StorageResult<Vec<MetricRecord>> {
        Ok(matching(&self.records, key))
    }

    fn count(&self) -> StorageResult<usize> {
        Ok(self.records.len())
    }

    fn flush(&mut self) -> StorageResult<()> {
        if self.dirty {
            if let Some(parent) = self.path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let json = serde_json::to_string_pretty(&self.records)
                .map_err(|e| StorageError::Serialization(e.to_string()))?;
            std::fs::write(&self.path, json)?;
            self.dirty = false;
        }
        Ok(())
    }
}

impl Drop for JsonFileStore {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}
