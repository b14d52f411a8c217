//! Loop engine driving a [`TrainingModule`] over a [`DataModule`]

use super::callback::{CallbackAction, CallbackContext, CallbackManager, TrainerCallback};
use super::hooks::{Interval, LrSchedulerConfig, OptimizerConfig, TrainingModule};
use super::{ClassificationReport, LossAccumulator, ProgressCallback, TrainerConfig};
use crate::autograd::backward;
use crate::data::{DataModule, Stage};
use crate::error::Result;
use crate::io::{save_checkpoint, Checkpoint};
use crate::monitor::{LogOptions, MetricLogger};
use crate::optim::{clip_grad_norm, Optimizer};
use crate::Tensor;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{info, warn};

/// Outcome of [`Trainer::fit`]
#[derive(Debug, Clone)]
pub struct FitResult {
    pub epochs_completed: usize,
    /// Last-batch training loss per epoch
    pub train_losses: Vec<f32>,
    /// Validation loss per validated epoch
    pub val_losses: Vec<f32>,
    pub best_val_loss: Option<f32>,
    pub best_epoch: Option<usize>,
    pub best_checkpoint: Option<PathBuf>,
    pub stopped_early: bool,
    pub final_lr: f32,
    pub global_steps: usize,
    pub elapsed_secs: f64,
}

/// Outcome of [`Trainer::test`]
#[derive(Debug, Clone)]
pub struct TestResult {
    /// Mean unweighted test loss over batches
    pub loss: f32,
    /// Raw logits in loader order
    pub logits: Vec<f32>,
    pub labels: Vec<f32>,
    pub metrics: ClassificationReport,
}

/// Runs fit and test stages.
///
/// # Example
///
/// ```no_run
/// use abandono::config::ModuleConfig;
/// use abandono::data::{ChurnDataModule, ChurnDataset};
/// use abandono::model::Mlp;
/// use abandono::train::{ChurnModule, EarlyStopping, Trainer, TrainerConfig};
///
/// # fn main() -> abandono::Result<()> {
/// # let (train, valid, test): (ChurnDataset, ChurnDataset, ChurnDataset) = todo!();
/// let mut datamodule = ChurnDataModule::new(32).with_seed(7);
/// datamodule.prepare(train, valid, test)?;
///
/// let model = Mlp::new(&[10, 16, 1], 0)?;
/// let mut module = ChurnModule::new(model, ModuleConfig::new().with_learning_rate(1e-3));
///
/// let mut trainer = Trainer::new(TrainerConfig::new().with_max_epochs(30));
/// trainer.add_callback(EarlyStopping::new(5, 1e-4));
///
/// let fit = trainer.fit(&mut module, &mut datamodule)?;
/// let test = trainer.test(&mut module, &mut datamodule)?;
/// println!("best val {:?}, test loss {:.4}", fit.best_val_loss, test.loss);
/// # Ok(())
/// # }
/// ```
pub struct Trainer {
    config: TrainerConfig,
    callbacks: CallbackManager,
    logger: MetricLogger,
    global_step: usize,
    epochs_run: usize,
}

impl Trainer {
    pub fn new(config: TrainerConfig) -> Self {
        let mut callbacks = CallbackManager::new();
        if config.enable_progress {
            callbacks.add(ProgressCallback::new(config.log_every_n_steps));
        }
        Self {
            config,
            callbacks,
            logger: MetricLogger::new(),
            global_step: 0,
            epochs_run: 0,
        }
    }

    /// Replace the default in-memory logger
    pub fn with_logger(mut self, logger: MetricLogger) -> Self {
        self.logger = logger;
        self
    }

    pub fn add_callback<C: TrainerCallback + 'static>(&mut self, callback: C) {
        self.callbacks.add(callback);
    }

    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    pub fn callbacks(&self) -> &CallbackManager {
        &self.callbacks
    }

    pub fn logger(&self) -> &MetricLogger {
        &self.logger
    }

    pub fn logger_mut(&mut self) -> &mut MetricLogger {
        &mut self.logger
    }

    pub fn global_step(&self) -> usize {
        self.global_step
    }

    /// Train with per-epoch validation.
    ///
    /// Each batch: zero grads, `training_step`, backward, optional clipping,
    /// optimizer step. Each epoch: `on_train_epoch_end`, the validation
    /// epoch, then the scheduler.
    pub fn fit<T, D>(&mut self, module: &mut T, datamodule: &mut D) -> Result<FitResult>
    where
        T: TrainingModule,
        D: DataModule,
    {
        datamodule.setup(Stage::Fit)?;
        let mut train_loader = datamodule.train_dataloader()?;
        let mut val_loader = datamodule.val_dataloader()?;

        let OptimizerConfig {
            mut optimizer,
            mut lr_scheduler,
        } = module.configure_optimizers()?;

        let start = Instant::now();
        let max_epochs = self.config.max_epochs;
        let steps_per_epoch = train_loader.len();
        let mut val_acc = LossAccumulator::new();

        let mut train_losses = Vec::with_capacity(max_epochs);
        let mut val_losses = Vec::new();
        let mut best: Option<(usize, f32)> = None;
        let mut best_checkpoint = None;
        let mut stopped_early = false;
        let mut epochs_completed = 0;
        let mut last_loss = 0.0;

        let mut ctx = CallbackContext {
            max_epochs,
            steps_per_epoch,
            lr: optimizer.lr(),
            ..Default::default()
        };

        if self.callbacks.on_train_begin(&ctx) == CallbackAction::Stop {
            stopped_early = true;
        }

        'epochs: for epoch in 0..max_epochs {
            if stopped_early {
                break;
            }
            self.logger.set_context(epoch, "train");
            ctx.epoch = epoch;
            ctx.step = 0;
            ctx.val_loss = None;
            ctx.lr = optimizer.lr();
            match self.callbacks.on_epoch_begin(&ctx) {
                CallbackAction::Stop => {
                    stopped_early = true;
                    break;
                }
                CallbackAction::SkipEpoch => continue,
                CallbackAction::Continue => {}
            }

            for (batch_idx, batch) in train_loader.iter().enumerate() {
                ctx.step = batch_idx;
                if self.callbacks.on_step_begin(&ctx) == CallbackAction::Stop {
                    stopped_early = true;
                    break 'epochs;
                }

                optimizer.zero_grad(module.params_mut());
                let loss = module.training_step(&batch, batch_idx)?;
                backward(&loss, None);
                if let Some(max_norm) = self.config.gradient_clip_val {
                    clip_grad_norm(module.params_mut(), max_norm);
                }
                optimizer.step(module.params_mut());
                self.global_step += 1;
                last_loss = loss.item();

                if let Some(sched) = lr_scheduler.as_mut() {
                    if sched.interval == Interval::Step
                        && self.global_step.is_multiple_of(sched.frequency.max(1))
                    {
                        step_scheduler(sched, optimizer.as_mut(), &self.logger);
                    }
                }

                ctx.global_step = self.global_step;
                ctx.loss = last_loss;
                ctx.lr = optimizer.lr();
                if self.callbacks.on_step_end(&ctx) == CallbackAction::Stop {
                    stopped_early = true;
                    break 'epochs;
                }
            }

            module.on_train_epoch_end(&mut self.logger)?;
            train_losses.push(last_loss);

            let validate = (epoch + 1).is_multiple_of(self.config.check_val_every_n_epoch.max(1));
            if validate && !val_loader.is_empty() {
                self.logger.set_context(epoch, "validate");
                for (batch_idx, batch) in val_loader.iter().enumerate() {
                    module.validation_step(&mut val_acc, &batch, batch_idx)?;
                }
                let val_loss =
                    module.on_validation_epoch_end(&val_acc, &mut self.logger, optimizer.lr())?;
                val_losses.push(val_loss);
                ctx.val_loss = Some(val_loss);

                if best.is_none_or(|(_, b)| val_loss < b) {
                    best = Some((epoch, val_loss));
                    ctx.best_val_loss = Some(val_loss);
                    if let Some(dir) = &self.config.checkpoint_dir {
                        let path = dir.join("best.json");
                        save_checkpoint(
                            &Checkpoint {
                                epoch,
                                val_loss: Some(val_loss),
                                model: module.state(),
                            },
                            &path,
                        )?;
                        best_checkpoint = Some(path);
                    }
                }
            }

            if let Some(sched) = lr_scheduler.as_mut() {
                if sched.interval == Interval::Epoch
                    && (epoch + 1).is_multiple_of(sched.frequency.max(1))
                {
                    step_scheduler(sched, optimizer.as_mut(), &self.logger);
                }
            }

            epochs_completed = epoch + 1;
            self.epochs_run += 1;
            ctx.lr = optimizer.lr();
            ctx.elapsed_secs = start.elapsed().as_secs_f64();
            if self.callbacks.on_epoch_end(&ctx) == CallbackAction::Stop {
                stopped_early = true;
                break;
            }
        }

        ctx.elapsed_secs = start.elapsed().as_secs_f64();
        self.callbacks.on_train_end(&ctx);

        if let Some(dir) = &self.config.checkpoint_dir {
            save_checkpoint(
                &Checkpoint {
                    epoch: epochs_completed.saturating_sub(1),
                    val_loss: val_losses.last().copied(),
                    model: module.state(),
                },
                dir.join("last.json"),
            )?;
        }
        self.logger.flush()?;

        info!(
            epochs = epochs_completed,
            steps = self.global_step,
            best_val_loss = ?best.map(|(_, v)| v),
            stopped_early,
            "fit finished"
        );

        Ok(FitResult {
            epochs_completed,
            train_losses,
            val_losses,
            best_val_loss: best.map(|(_, v)| v),
            best_epoch: best.map(|(e, _)| e),
            best_checkpoint,
            stopped_early,
            final_lr: optimizer.lr(),
            global_steps: self.global_step,
            elapsed_secs: start.elapsed().as_secs_f64(),
        })
    }

    /// Evaluate on the test split with the module's current parameters
    pub fn test<T, D>(&mut self, module: &mut T, datamodule: &mut D) -> Result<TestResult>
    where
        T: TrainingModule,
        D: DataModule,
    {
        datamodule.setup(Stage::Test)?;
        let mut loader = datamodule.test_dataloader()?;
        self.logger
            .set_context(self.epochs_run.saturating_sub(1), "test");

        let mut acc = LossAccumulator::new();
        let mut logits = Vec::new();
        let mut labels = Vec::new();
        for (batch_idx, batch) in loader.iter().enumerate() {
            let out = module.test_step(&mut acc, &batch, batch_idx)?;
            logits.extend(out.data().iter().copied());
            labels.extend(batch.targets.data().iter().copied());
        }

        let loss = module.on_test_epoch_end(&acc, &mut self.logger)?;
        let metrics = ClassificationReport::from_logits(
            &Tensor::from_vec(logits.clone(), false),
            &Tensor::from_vec(labels.clone(), false),
        )?;
        self.logger.log_dict(
            &[
                ("test/accuracy", f64::from(metrics.accuracy)),
                ("test/precision", f64::from(metrics.precision)),
                ("test/recall", f64::from(metrics.recall)),
                ("test/f1", f64::from(metrics.f1)),
            ],
            LogOptions::persist_only(),
        )?;
        self.logger.flush()?;

        info!(
            loss,
            accuracy = metrics.accuracy,
            f1 = metrics.f1,
            "test finished"
        );

        Ok(TestResult {
            loss,
            logits,
            labels,
            metrics,
        })
    }
}

fn step_scheduler(
    sched: &mut LrSchedulerConfig,
    optimizer: &mut dyn Optimizer,
    logger: &MetricLogger,
) {
    if let Some(monitor) = &sched.monitor {
        if logger.latest(monitor).is_none() {
            warn!(monitor = %monitor, "scheduler monitor metric has not been logged yet");
        }
    }
    sched.scheduler.step();
    sched.scheduler.apply(optimizer);
}
