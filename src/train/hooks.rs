//! The contract between a training module and the trainer

use super::LossAccumulator;
use crate::data::Batch;
use crate::error::Result;
use crate::io::ModelState;
use crate::monitor::MetricLogger;
use crate::optim::{LRScheduler, Optimizer};
use crate::Tensor;
use serde::{Deserialize, Serialize};

/// When the scheduler advances
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Interval {
    Epoch,
    Step,
}

/// Scheduler plus the policy for stepping it
pub struct LrSchedulerConfig {
    pub scheduler: Box<dyn LRScheduler>,
    /// Logged metric that must exist when the scheduler steps
    pub monitor: Option<String>,
    pub interval: Interval,
    /// Step every `frequency` intervals
    pub frequency: usize,
}

impl std::fmt::Debug for LrSchedulerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LrSchedulerConfig")
            .field("lr", &self.scheduler.get_lr())
            .field("monitor", &self.monitor)
            .field("interval", &self.interval)
            .field("frequency", &self.frequency)
            .finish()
    }
}

/// What `configure_optimizers` hands back to the trainer
pub struct OptimizerConfig {
    pub optimizer: Box<dyn Optimizer>,
    pub lr_scheduler: Option<LrSchedulerConfig>,
}

impl OptimizerConfig {
    pub fn new(optimizer: Box<dyn Optimizer>) -> Self {
        Self {
            optimizer,
            lr_scheduler: None,
        }
    }

    pub fn with_scheduler(mut self, scheduler: LrSchedulerConfig) -> Self {
        self.lr_scheduler = Some(scheduler);
        self
    }
}

impl std::fmt::Debug for OptimizerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OptimizerConfig")
            .field("lr", &self.optimizer.lr())
            .field("lr_scheduler", &self.lr_scheduler)
            .finish()
    }
}

/// Per-stage hooks driven by [`super::Trainer`].
///
/// Epoch order is `training_step* → on_train_epoch_end → validation_step* →
/// on_validation_epoch_end`; after fitting, `test_step* → on_test_epoch_end`.
/// Validation and test losses go into an accumulator owned by the caller.
pub trait TrainingModule {
    /// Trainable parameters, in the order the optimizer sees them
    fn params_mut(&mut self) -> &mut [Tensor];

    /// Differentiable loss for one batch
    fn training_step(&mut self, batch: &Batch, batch_idx: usize) -> Result<Tensor>;

    fn on_train_epoch_end(&mut self, logger: &mut MetricLogger) -> Result<()>;

    fn validation_step(
        &mut self,
        acc: &mut LossAccumulator,
        batch: &Batch,
        batch_idx: usize,
    ) -> Result<f32>;

    /// Returns the epoch's validation loss; `lr` is the optimizer's current rate
    fn on_validation_epoch_end(
        &mut self,
        acc: &LossAccumulator,
        logger: &mut MetricLogger,
        lr: f32,
    ) -> Result<f32>;

    /// Returns the raw logits for the batch
    fn test_step(
        &mut self,
        acc: &mut LossAccumulator,
        batch: &Batch,
        batch_idx: usize,
    ) -> Result<Tensor>;

    fn on_test_epoch_end(&mut self, acc: &LossAccumulator, logger: &mut MetricLogger)
        -> Result<f32>;

    fn configure_optimizers(&self) -> Result<OptimizerConfig>;

    /// Snapshot written to checkpoints
    fn state(&self) -> ModelState;
}
