//! Callback system for training events
//!
//! Hooks fire around the whole run, each epoch and each optimizer step. Every
//! hook has a no-op default, so a callback implements only what it needs.
//!
//! # Example
//!
//! ```rust
//! use abandono::train::{CallbackAction, CallbackContext, TrainerCallback};
//!
//! struct StopOnNan;
//!
//! impl TrainerCallback for StopOnNan {
//!     fn on_step_end(&mut self, ctx: &CallbackContext) -> CallbackAction {
//!         if ctx.loss.is_nan() {
//!             CallbackAction::Stop
//!         } else {
//!             CallbackAction::Continue
//!         }
//!     }
//! }
//! ```

use tracing::{debug, info};

/// Training state visible to callbacks
#[derive(Clone, Debug, Default)]
pub struct CallbackContext {
    /// Current epoch (0-indexed)
    pub epoch: usize,
    pub max_epochs: usize,
    /// Step within the epoch
    pub step: usize,
    pub steps_per_epoch: usize,
    pub global_step: usize,
    /// Most recent training batch loss
    pub loss: f32,
    pub lr: f32,
    /// Best validation loss so far
    pub best_val_loss: Option<f32>,
    /// Validation loss of this epoch, if validation ran
    pub val_loss: Option<f32>,
    pub elapsed_secs: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallbackAction {
    Continue,
    /// Stop training after this event
    Stop,
    /// Skip the rest of the current epoch (only honoured at epoch begin)
    SkipEpoch,
}

pub trait TrainerCallback {
    fn on_train_begin(&mut self, _ctx: &CallbackContext) -> CallbackAction {
        CallbackAction::Continue
    }

    fn on_train_end(&mut self, _ctx: &CallbackContext) {}

    fn on_epoch_begin(&mut self, _ctx: &CallbackContext) -> CallbackAction {
        CallbackAction::Continue
    }

    /// After training, validation and the scheduler step of an epoch
    fn on_epoch_end(&mut self, _ctx: &CallbackContext) -> CallbackAction {
        CallbackAction::Continue
    }

    fn on_step_begin(&mut self, _ctx: &CallbackContext) -> CallbackAction {
        CallbackAction::Continue
    }

    fn on_step_end(&mut self, _ctx: &CallbackContext) -> CallbackAction {
        CallbackAction::Continue
    }

    fn name(&self) -> &str {
        "TrainerCallback"
    }
}

/// Stop when the monitored loss has not improved by `min_delta` for
/// `patience` epochs.
///
/// Monitors the validation loss, falling back to the training loss on epochs
/// without validation.
///
/// ```rust
/// use abandono::train::EarlyStopping;
///
/// let early_stop = EarlyStopping::new(5, 0.001);
/// assert_eq!(early_stop.best_loss(), f32::INFINITY);
/// ```
#[derive(Clone, Debug)]
pub struct EarlyStopping {
    patience: usize,
    min_delta: f32,
    best_loss: f32,
    epochs_without_improvement: usize,
}

impl EarlyStopping {
    pub fn new(patience: usize, min_delta: f32) -> Self {
        Self {
            patience,
            min_delta,
            best_loss: f32::INFINITY,
            epochs_without_improvement: 0,
        }
    }

    pub fn reset(&mut self) {
        self.best_loss = f32::INFINITY;
        self.epochs_without_improvement = 0;
    }

    pub fn best_loss(&self) -> f32 {
        self.best_loss
    }

    fn check_improvement(&mut self, loss: f32) -> bool {
        if loss < self.best_loss - self.min_delta {
            self.best_loss = loss;
            self.epochs_without_improvement = 0;
            true
        } else {
            self.epochs_without_improvement += 1;
            false
        }
    }
}

impl TrainerCallback for EarlyStopping {
    fn on_train_begin(&mut self, _ctx: &CallbackContext) -> CallbackAction {
        self.reset();
        CallbackAction::Continue
    }

    fn on_epoch_end(&mut self, ctx: &CallbackContext) -> CallbackAction {
        self.check_improvement(ctx.val_loss.unwrap_or(ctx.loss));

        if self.epochs_without_improvement >= self.patience {
            info!(
                patience = self.patience,
                best_loss = self.best_loss,
                "early stopping: no improvement"
            );
            CallbackAction::Stop
        } else {
            CallbackAction::Continue
        }
    }

    fn name(&self) -> &str {
        "EarlyStopping"
    }
}

/// Epoch summaries at `info`, step losses every `log_interval` steps at `debug`
#[derive(Clone, Debug)]
pub struct ProgressCallback {
    log_interval: usize,
}

impl ProgressCallback {
    pub fn new(log_interval: usize) -> Self {
        Self {
            log_interval: log_interval.max(1),
        }
    }
}

impl Default for ProgressCallback {
    fn default() -> Self {
        Self::new(50)
    }
}

impl TrainerCallback for ProgressCallback {
    fn on_epoch_begin(&mut self, ctx: &CallbackContext) -> CallbackAction {
        debug!(
            epoch = ctx.epoch + 1,
            max_epochs = ctx.max_epochs,
            lr = ctx.lr,
            "epoch starting"
        );
        CallbackAction::Continue
    }

    fn on_epoch_end(&mut self, ctx: &CallbackContext) -> CallbackAction {
        let val = ctx
            .val_loss
            .map(|v| format!(" val_loss={v:.4}"))
            .unwrap_or_default();
        info!(
            "Epoch {}/{}: loss={:.4}{} lr={:.2e} ({:.1}s)",
            ctx.epoch + 1,
            ctx.max_epochs,
            ctx.loss,
            val,
            ctx.lr,
            ctx.elapsed_secs
        );
        CallbackAction::Continue
    }

    fn on_step_end(&mut self, ctx: &CallbackContext) -> CallbackAction {
        if ctx.global_step > 0 && ctx.global_step.is_multiple_of(self.log_interval) {
            debug!(
                "  Step {}/{}: loss={:.4}",
                ctx.step + 1,
                ctx.steps_per_epoch,
                ctx.loss
            );
        }
        CallbackAction::Continue
    }

    fn name(&self) -> &str {
        "ProgressCallback"
    }
}

/// Dispatches events to registered callbacks in order; the first `Stop` wins
#[derive(Default)]
pub struct CallbackManager {
    callbacks: Vec<Box<dyn TrainerCallback>>,
}

impl CallbackManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<C: TrainerCallback + 'static>(&mut self, callback: C) {
        self.callbacks.push(Box::new(callback));
    }

    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    pub fn names(&self) -> Vec<&str> {
        self.callbacks.iter().map(|cb| cb.name()).collect()
    }

    pub fn on_train_begin(&mut self, ctx: &CallbackContext) -> CallbackAction {
        for cb in &mut self.callbacks {
            if cb.on_train_begin(ctx) == CallbackAction::Stop {
                return CallbackAction::Stop;
            }
        }
        CallbackAction::Continue
    }

    pub fn on_train_end(&mut self, ctx: &CallbackContext) {
        for cb in &mut self.callbacks {
            cb.on_train_end(ctx);
        }
    }

    pub fn on_epoch_begin(&mut self, ctx: &CallbackContext) -> CallbackAction {
        for cb in &mut self.callbacks {
            match cb.on_epoch_begin(ctx) {
                CallbackAction::Stop => return CallbackAction::Stop,
                CallbackAction::SkipEpoch => return CallbackAction::SkipEpoch,
                CallbackAction::Continue => {}
            }
        }
        CallbackAction::Continue
    }

    pub fn on_epoch_end(&mut self, ctx: &CallbackContext) -> CallbackAction {
        self.dispatch(ctx, |cb, ctx| cb.on_epoch_end(ctx))
    }

    pub fn on_step_begin(&mut self, ctx: &CallbackContext) -> CallbackAction {
        self.dispatch(ctx, |cb, ctx| cb.on_step_begin(ctx))
    }

    pub fn on_step_end(&mut self, ctx: &CallbackContext) -> CallbackAction {
        self.dispatch(ctx, |cb, ctx| cb.on_step_end(ctx))
    }

    fn dispatch<F>(&mut self, ctx: &CallbackContext, mut event: F) -> CallbackAction
    where
        F: FnMut(&mut dyn TrainerCallback, &CallbackContext) -> CallbackAction,
    {
        for cb in &mut self.callbacks {
            if event(cb.as_mut(), ctx) == CallbackAction::Stop {
                return CallbackAction::Stop;
            }
        }
        CallbackAction::Continue
    }
}

impl std::fmt::Debug for CallbackManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
