//! Experiment metric logging
//!
//! - **MetricRecord**: one logged value with timestamp and tags
//! - **MetricsStore**: persistence backend (`InMemoryStore`, `JsonFileStore`)
//! - **MetricLogger**: the sink training hooks write into, with separate
//!   progress-bar and persistence visibility per entry
//!
//! # Example
//!
//! ```
//! use abandono::monitor::{LogOptions, MetricLogger};
//!
//! let mut logger = MetricLogger::new();
//! logger.log_dict(&[("loss/val_loss", 0.42)], LogOptions::both()).unwrap();
//! assert_eq!(logger.latest("loss/val_loss"), Some(0.42));
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

mod logger;
pub mod storage;

pub use logger::{LogOptions, MetricLogger};
pub use storage::{InMemoryStore, JsonFileStore, MetricsStore, StorageError, StorageResult};

/// A single metric value with timestamp
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRecord {
    /// Unix timestamp in milliseconds
    pub timestamp: u64,
    /// Metric key, e.g. `loss/val_loss`
    pub key: String,
    pub value: f64,
    #[serde(default)]
    pub tags: HashMap<String, String>,
}

impl MetricRecord {
    /// Record stamped with the current time
    pub fn new(key: impl Into<String>, value: f64) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);

        Self {
            timestamp,
            key: key.into(),
            value,
            tags: HashMap::new(),
        }
    }

    pub fn with_tag(mut self, key: &str, value: &str) -> Self {
        self.tags.insert(key.to_string(), value.to_string());
        self
    }

    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }
}

/// Statistical summary for a single metric key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricStats {
    pub count: usize,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    /// Whether any NaN values were recorded
    pub has_nan: bool,
}

impl MetricStats {
    /// Summary over `values`; `None` when empty. NaNs are flagged and skipped.
    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let has_nan = values.iter().any(|v| v.is_nan());
        let finite: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
        let count = finite.len();
        let mean = if count == 0 {
            f64::NAN
        } else {
            finite.iter().sum::<f64>() / count as f64
        };

        Some(Self {
            count,
            mean,
            min: finite.iter().copied().fold(f64::INFINITY, f64::min),
            max: finite.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            has_nan,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_record_tags() {
        let record = MetricRecord::new("loss/train_loss", 0.5)
            .with_tag("epoch", "3")
            .with_tag("stage", "train");
        assert_eq!(record.tag("epoch"), Some("3"));
        assert_eq!(record.tag("stage"), Some("train"));
        assert!(record.timestamp > 0);
    }

    #[test]
    fn test_record_serde() {
        let record = MetricRecord::new("learning_rate", 1e-4).with_tag("epoch", "0");
        let json = serde_json::to_string(&record).unwrap();
        let back: MetricRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_stats() {
        let stats = MetricStats::from_values(&[1.0, 2.0, 3.0]).unwrap();
        assert_eq!(stats.count, 3);
        assert_abs_diff_eq!(stats.mean, 2.0);
        assert_abs_diff_eq!(stats.min, 1.0);
        assert_abs_diff_eq!(stats.max, 3.0);
        assert!(!stats.has_nan);

        assert!(MetricStats::from_values(&[]).is_none());
    }

    #[test]
    fn test_stats_flags_nan() {
        let stats = MetricStats::from_values(&[1.0, f64::NAN, 3.0]).unwrap();
        assert!(stats.has_nan);
        assert_eq!(stats.count, 2);
        assert_abs_diff_eq!(stats.mean, 2.0);
    }
}
