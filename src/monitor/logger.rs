//! Sink for metrics logged by training hooks

use super::{InMemoryStore, MetricRecord, MetricsStore};
use crate::error::Result;
use std::collections::HashMap;

/// Where a logged entry is shown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LogOptions {
    /// Emit on the console progress line
    pub prog_bar: bool,
    /// Persist to the metrics store
    pub logger: bool,
}

impl LogOptions {
    /// Progress bar and persistent store
    pub fn both() -> Self {
        Self {
            prog_bar: true,
            logger: true,
        }
    }

    pub fn persist_only() -> Self {
        Self {
            prog_bar: false,
            logger: true,
        }
    }
}

/// Experiment logger.
///
/// Every logged value is kept in an in-process history for `latest`/`history`.
/// Entries with `prog_bar` become `tracing::info!` events; entries with `logger`
/// are written to the backing store tagged with the current epoch and stage.
pub struct MetricLogger {
    store: Box<dyn MetricsStore>,
    history: HashMap<String, Vec<f64>>,
    epoch: usize,
    stage: &'static str,
}

impl MetricLogger {
    /// Logger over an in-memory store
    pub fn new() -> Self {
        Self::with_store(Box::new(InMemoryStore::new()))
    }

    pub fn with_store(store: Box<dyn MetricsStore>) -> Self {
        Self {
            store,
            history: HashMap::new(),
            epoch: 0,
            stage: "fit",
        }
    }

    /// Set the tags attached to subsequent persisted records
    pub fn set_context(&mut self, epoch: usize, stage: &'static str) {
        self.epoch = epoch;
        self.stage = stage;
    }

    pub fn epoch(&self) -> usize {
        self.epoch
    }

    pub fn log(&mut self, key: &str, value: f64, options: LogOptions) -> Result<()> {
        self.log_dict(&[(key, value)], options)
    }

    pub fn log_dict(&mut self, entries: &[(&str, f64)], options: LogOptions) -> Result<()> {
        for &(key, value) in entries {
            self.history.entry(key.to_string()).or_default().push(value);
        }

        if options.prog_bar {
            let line = entries
                .iter()
                .map(|(key, value)| format!("{key}={value:.6}"))
                .collect::<Vec<_>>()
                .join(" ");
            tracing::info!(epoch = self.epoch, stage = self.stage, "{line}");
        }

        if options.logger {
            let epoch = self.epoch.to_string();
            let records: Vec<MetricRecord> = entries
                .iter()
                .map(|&(key, value)| {
                    MetricRecord::new(key, value)
                        .with_tag("epoch", &epoch)
                        .with_tag("stage", self.stage)
                })
                .collect();
            self.store.write_batch(&records)?;
        }

        Ok(())
    }

    /// Most recent value logged under `key`
    pub fn latest(&self, key: &str) -> Option<f64> {
        self.history.get(key).and_then(|values| values.last().copied())
    }

    pub fn history(&self, key: &str) -> &[f64] {
        self.history.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn store(&self) -> &dyn MetricsStore {
        self.store.as_ref()
    }

    pub fn flush(&mut self) -> Result<()> {
        self.store.flush()?;
        Ok(())
    }
}

impl Default for MetricLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MetricLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricLogger")
            .field("keys", &self.history.keys().collect::<Vec<_>>())
            .field("epoch", &self.epoch)
            .field("stage", &self.stage)
            .finish()
    }
}
