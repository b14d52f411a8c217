//! Trainer configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainerConfig {
    pub max_epochs: usize,

    /// Clip the global gradient norm to this value (None = no clipping)
    pub gradient_clip_val: Option<f32>,

    /// Emit a step-level progress line every N optimizer steps
    pub log_every_n_steps: usize,

    /// Write `best.json` and `last.json` checkpoints here
    pub checkpoint_dir: Option<PathBuf>,

    /// Run validation every N epochs
    pub check_val_every_n_epoch: usize,

    /// Register a [`super::ProgressCallback`] automatically
    pub enable_progress: bool,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            max_epochs: 10,
            gradient_clip_val: None,
            log_every_n_steps: 50,
            checkpoint_dir: None,
            check_val_every_n_epoch: 1,
            enable_progress: true,
        }
    }
}

impl TrainerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_epochs(mut self, max_epochs: usize) -> Self {
        self.max_epochs = max_epochs;
        self
    }

    pub fn with_grad_clip(mut self, max_norm: f32) -> Self {
        self.gradient_clip_val = Some(max_norm);
        self
    }

    pub fn with_log_every_n_steps(mut self, steps: usize) -> Self {
        self.log_every_n_steps = steps;
        self
    }

    pub fn with_checkpoint_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.checkpoint_dir = Some(dir.into());
        self
    }

    /// Zero is treated as one
    pub fn with_check_val_every_n_epoch(mut self, epochs: usize) -> Self {
        self.check_val_every_n_epoch = epochs.max(1);
        self
    }

    pub fn without_progress(mut self) -> Self {
        self.enable_progress = false;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TrainerConfig::default();
        assert_eq!(config.max_epochs, 10);
        assert!(config.gradient_clip_val.is_none());
        assert_eq!(config.check_val_every_n_epoch, 1);
        assert!(config.enable_progress);
    }

    #[test]
    fn test_builder() {
        let config = TrainerConfig::new()
            .with_max_epochs(3)
            .with_grad_clip(0.5)
            .with_checkpoint_dir("ckpt")
            .with_check_val_every_n_epoch(0)
            .without_progress();

        assert_eq!(config.max_epochs, 3);
        assert_eq!(config.gradient_clip_val, Some(0.5));
        assert_eq!(config.checkpoint_dir, Some(PathBuf::from("ckpt")));
        assert_eq!(config.check_val_every_n_epoch, 1);
        assert!(!config.enable_progress);
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config: TrainerConfig = serde_yaml::from_str("max_epochs: 4\n").unwrap();
        assert_eq!(config.max_epochs, 4);
        assert_eq!(config.log_every_n_steps, 50);
    }
}
