//! Churn classifier training module

use super::hooks::{Interval, LrSchedulerConfig, OptimizerConfig, TrainingModule};
use super::{BinaryCrossEntropyWithLogits, ClassWeights, LossAccumulator};
use crate::config::ModuleConfig;
use crate::data::Batch;
use crate::error::{Error, Result};
use crate::io::ModelState;
use crate::model::Model;
use crate::monitor::{LogOptions, MetricLogger};
use crate::optim::{Adam, CyclicLR, CyclicMode, LRScheduler};
use crate::tuning::{NoopReporter, TuningReporter};
use crate::Tensor;

/// L2 penalty applied by the optimizer
pub const WEIGHT_DECAY: f32 = 1e-4;
pub const BASE_LR: f32 = 1e-4;
pub const MAX_LR: f32 = 0.01;
pub const STEP_SIZE_UP: usize = 5;
pub const STEP_SIZE_DOWN: usize = 10;
pub const CYCLE_GAMMA: f32 = 0.5;
/// beta1 range cycled against the learning rate
pub const MOMENTUM_RANGE: (f32, f32) = (0.8, 0.9);

pub const TRAIN_LOSS_KEY: &str = "loss/train_loss";
pub const VAL_LOSS_KEY: &str = "loss/val_loss";
pub const TEST_LOSS_KEY: &str = "loss/test_loss";
pub const LEARNING_RATE_KEY: &str = "learning_rate";

/// Binary churn classifier over any logit [`Model`].
///
/// Training and validation losses use the class weights when present; test
/// losses never do. Only the last training batch's loss is kept and logged at
/// epoch end.
pub struct ChurnModule<M: Model> {
    model: M,
    config: ModuleConfig,
    class_weights: Option<ClassWeights>,
    loss_fn: BinaryCrossEntropyWithLogits,
    last_train_loss: Option<f32>,
    reporter: Box<dyn TuningReporter>,
}

impl<M: Model> ChurnModule<M> {
    pub fn new(model: M, config: ModuleConfig) -> Self {
        Self {
            model,
            config,
            class_weights: None,
            loss_fn: BinaryCrossEntropyWithLogits::new(),
            last_train_loss: None,
            reporter: Box::new(NoopReporter),
        }
    }

    pub fn with_class_weights(mut self, class_weights: Option<ClassWeights>) -> Self {
        self.class_weights = class_weights;
        self
    }

    pub fn with_reporter(mut self, reporter: impl TuningReporter + 'static) -> Self {
        self.reporter = Box::new(reporter);
        self
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn model_mut(&mut self) -> &mut M {
        &mut self.model
    }

    pub fn into_model(self) -> M {
        self.model
    }

    pub fn config(&self) -> &ModuleConfig {
        &self.config
    }

    pub fn class_weights(&self) -> Option<&ClassWeights> {
        self.class_weights.as_ref()
    }

    /// Loss of the most recent training batch
    pub fn last_train_loss(&self) -> Option<f32> {
        self.last_train_loss
    }

    fn batch_loss(&self, batch: &Batch, weighted: bool) -> Result<(Tensor, Tensor)> {
        let logits = self.model.forward(&batch.inputs, batch.rows)?;
        let sample_weights = match (&self.class_weights, weighted) {
            (Some(weights), true) => Some(weights.sample_weights(&batch.targets)?),
            _ => None,
        };
        let loss = self
            .loss_fn
            .forward_with_weights(&logits, &batch.targets, sample_weights.as_ref())?;
        Ok((loss, logits))
    }
}

impl<M: Model> TrainingModule for ChurnModule<M> {
    fn params_mut(&mut self) -> &mut [Tensor] {
        self.model.params_mut()
    }

    fn training_step(&mut self, batch: &Batch, batch_idx: usize) -> Result<Tensor> {
        let (loss, _) = self.batch_loss(batch, true)?;
        tracing::debug!(batch_idx, loss = loss.item(), "training step");
        self.last_train_loss = Some(loss.item());
        Ok(loss)
    }

    fn on_train_epoch_end(&mut self, logger: &mut MetricLogger) -> Result<()> {
        let loss = self.last_train_loss.ok_or(Error::EmptyEpoch("training"))?;
        logger.log(TRAIN_LOSS_KEY, f64::from(loss), LogOptions::both())
    }

    fn validation_step(
        &mut self,
        acc: &mut LossAccumulator,
        batch: &Batch,
        batch_idx: usize,
    ) -> Result<f32> {
        acc.begin_batch(batch_idx);
        let (loss, _) = self.batch_loss(batch, true)?;
        let value = loss.item();
        acc.push(value);
        Ok(value)
    }

    fn on_validation_epoch_end(
        &mut self,
        acc: &LossAccumulator,
        logger: &mut MetricLogger,
        lr: f32,
    ) -> Result<f32> {
        let mean = acc.mean().ok_or(Error::EmptyEpoch("validation"))?;
        logger.log_dict(
            &[
                (VAL_LOSS_KEY, f64::from(mean)),
                (LEARNING_RATE_KEY, f64::from(lr)),
            ],
            LogOptions::both(),
        )?;

        if self.config.nni {
            self.reporter.report_intermediate(f64::from(mean))?;
        }
        Ok(mean)
    }

    fn test_step(
        &mut self,
        acc: &mut LossAccumulator,
        batch: &Batch,
        batch_idx: usize,
    ) -> Result<Tensor> {
        acc.begin_batch(batch_idx);
        let (loss, logits) = self.batch_loss(batch, false)?;
        acc.push(loss.item());
        Ok(logits.detach())
    }

    fn on_test_epoch_end(
        &mut self,
        acc: &LossAccumulator,
        logger: &mut MetricLogger,
    ) -> Result<f32> {
        let mean = acc.mean().ok_or(Error::EmptyEpoch("test"))?;
        logger.log(TEST_LOSS_KEY, f64::from(mean), LogOptions::both())?;
        self.reporter.report_final(f64::from(mean))?;
        Ok(mean)
    }

    /// Adam with L2 decay under a per-epoch triangular cyclical schedule.
    ///
    /// The schedule starts at its base rate, so the configured learning rate
    /// only seeds the optimizer before the first cycle takes over.
    fn configure_optimizers(&self) -> Result<OptimizerConfig> {
        let lr = self
            .config
            .learning_rate
            .ok_or_else(|| Error::MissingConfig("learning_rate".to_string()))?;

        let mut optimizer = Adam::default_params(lr as f32).with_weight_decay(WEIGHT_DECAY);
        let scheduler = CyclicLR::new(BASE_LR, MAX_LR, STEP_SIZE_UP, STEP_SIZE_DOWN)
            .with_mode(CyclicMode::Triangular)
            .with_gamma(CYCLE_GAMMA)
            .with_momentum_cycling(MOMENTUM_RANGE.0, MOMENTUM_RANGE.1);
        scheduler.apply(&mut optimizer);

        Ok(OptimizerConfig::new(Box::new(optimizer)).with_scheduler(LrSchedulerConfig {
            scheduler: Box::new(scheduler),
            monitor: Some(VAL_LOSS_KEY.to_string()),
            interval: Interval::Epoch,
            frequency: 1,
        }))
    }

    fn state(&self) -> ModelState {
        self.model.state()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Mlp;
    use crate::tuning::{Trial, TrialReporter, TrialStatus};
    use approx::assert_abs_diff_eq;
    use std::collections::BTreeMap;

    fn batch(features: Vec<f32>, labels: Vec<f32>, cols: usize) -> Batch {
        let rows = labels.len();
        Batch::new(
            Tensor::from_vec(features, false),
            Tensor::from_vec(labels, false),
            rows,
            cols,
        )
        .unwrap()
    }

    /// Logistic model with all-zero parameters: every logit is 0
    fn zero_module(cols: usize, config: ModuleConfig) -> ChurnModule<Mlp> {
        let mut model = Mlp::logistic(cols, 0).unwrap();
        for param in model.params_mut() {
            param.data_mut().fill(0.0);
        }
        ChurnModule::new(model, config)
    }

    fn lr_config() -> ModuleConfig {
        ModuleConfig::new().with_learning_rate(1e-3)
    }

    #[test]
    fn test_training_step_keeps_last_loss() {
        let mut module = zero_module(2, lr_config());
        let b = batch(vec![1.0, 2.0, 3.0, 4.0], vec![0.0, 1.0], 2);

        let loss = module.training_step(&b, 0).unwrap();
        assert!(loss.requires_grad());
        assert_abs_diff_eq!(loss.item(), std::f32::consts::LN_2, epsilon = 1e-6);
        assert_eq!(module.last_train_loss(), Some(loss.item()));

        let mut logger = MetricLogger::new();
        module.on_train_epoch_end(&mut logger).unwrap();
        assert_abs_diff_eq!(
            logger.latest(TRAIN_LOSS_KEY).unwrap(),
            f64::from(std::f32::consts::LN_2),
            epsilon = 1e-6
        );
    }

    #[test]
    fn test_train_epoch_end_without_steps() {
        let mut module = zero_module(2, lr_config());
        let mut logger = MetricLogger::new();
        assert!(matches!(
            module.on_train_epoch_end(&mut logger),
            Err(Error::EmptyEpoch("training"))
        ));
    }

    #[test]
    fn test_weighted_training_loss() {
        let weights = ClassWeights::new(vec![2.0, 1.0]).unwrap();
        let mut module = zero_module(2, lr_config()).with_class_weights(Some(weights));
        let b = batch(vec![1.0, 2.0, 3.0, 4.0], vec![0.0, 1.0], 2);

        let loss = module.training_step(&b, 0).unwrap();
        assert_abs_diff_eq!(loss.item(), 1.5 * std::f32::consts::LN_2, epsilon = 1e-6);
    }

    #[test]
    fn test_validation_epoch_mean_and_reset() {
        let mut module = zero_module(1, lr_config());
        let mut acc = LossAccumulator::new();
        let mut logger = MetricLogger::new();

        for epoch in 0..2 {
            for idx in 0..3 {
                module
                    .validation_step(&mut acc, &batch(vec![1.0], vec![1.0], 1), idx)
                    .unwrap();
            }
            assert_eq!(acc.len(), 3, "epoch {epoch} accumulated across epochs");
            let mean = module
                .on_validation_epoch_end(&acc, &mut logger, 0.01)
                .unwrap();
            assert_abs_diff_eq!(mean, std::f32::consts::LN_2, epsilon = 1e-6);
        }

        assert_eq!(logger.history(VAL_LOSS_KEY).len(), 2);
        assert_abs_diff_eq!(logger.latest(LEARNING_RATE_KEY).unwrap(), 0.01, epsilon = 1e-9);
    }

    #[test]
    fn test_empty_validation_epoch() {
        let mut module = zero_module(1, lr_config());
        let mut logger = MetricLogger::new();
        let err = module
            .on_validation_epoch_end(&LossAccumulator::new(), &mut logger, 0.1)
            .unwrap_err();
        assert!(matches!(err, Error::EmptyEpoch("validation")));
    }

    #[test]
    fn test_intermediate_reports_follow_nni_flag() {
        for nni in [false, true] {
            let reporter = TrialReporter::new(Trial::new(0, BTreeMap::new()));
            let trial = reporter.trial();
            let mut module = zero_module(1, lr_config().with_nni(nni)).with_reporter(reporter);

            let mut acc = LossAccumulator::new();
            let mut logger = MetricLogger::new();
            module
                .validation_step(&mut acc, &batch(vec![0.0], vec![0.0], 1), 0)
                .unwrap();
            module
                .on_validation_epoch_end(&acc, &mut logger, 1e-4)
                .unwrap();

            assert_eq!(trial.borrow().intermediate.len(), usize::from(nni));
        }
    }

    #[test]
    fn test_test_loss_ignores_class_weights() {
        let weights = ClassWeights::new(vec![5.0, 0.1]).unwrap();
        let reporter = TrialReporter::new(Trial::new(0, BTreeMap::new()));
        let trial = reporter.trial();
        let mut module = zero_module(2, lr_config())
            .with_class_weights(Some(weights))
            .with_reporter(reporter);

        let mut acc = LossAccumulator::new();
        let b = batch(vec![1.0, 2.0, 3.0, 4.0], vec![0.0, 1.0], 2);
        let logits = module.test_step(&mut acc, &b, 0).unwrap();
        assert_eq!(logits.to_vec(), vec![0.0, 0.0]);
        assert!(!logits.requires_grad());

        let mut logger = MetricLogger::new();
        let mean = module.on_test_epoch_end(&acc, &mut logger).unwrap();
        assert_abs_diff_eq!(mean, std::f32::consts::LN_2, epsilon = 1e-6);

        // Final result is reported even though nni is off
        let trial = trial.borrow();
        assert_eq!(trial.status, TrialStatus::Completed);
        assert_abs_diff_eq!(trial.score.unwrap(), f64::from(mean), epsilon = 1e-9);
        assert!(logger.latest(TEST_LOSS_KEY).is_some());
    }

    #[test]
    fn test_configure_optimizers() {
        let module = zero_module(3, ModuleConfig::new().with_learning_rate(0.05));
        let config = module.configure_optimizers().unwrap();

        // The cyclical schedule starts the optimizer at its base rate
        assert_abs_diff_eq!(config.optimizer.lr(), BASE_LR, epsilon = 1e-9);
        assert_abs_diff_eq!(config.optimizer.momentum().unwrap(), 0.9, epsilon = 1e-6);

        let scheduler = config.lr_scheduler.unwrap();
        assert_eq!(scheduler.monitor.as_deref(), Some(VAL_LOSS_KEY));
        assert_eq!(scheduler.interval, Interval::Epoch);
        assert_eq!(scheduler.frequency, 1);
    }

    #[test]
    fn test_configure_optimizers_needs_learning_rate() {
        let module = zero_module(3, ModuleConfig::new());
        assert!(matches!(
            module.configure_optimizers(),
            Err(Error::MissingConfig(key)) if key == "learning_rate"
        ));
    }

    #[test]
    fn test_invalid_label_with_weights() {
        let weights = ClassWeights::new(vec![1.0, 1.0]).unwrap();
        let mut module = zero_module(1, lr_config()).with_class_weights(Some(weights));
        let mut acc = LossAccumulator::new();
        let err = module
            .validation_step(&mut acc, &batch(vec![0.0], vec![3.0], 1), 0)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidLabel { .. }));
    }
}
