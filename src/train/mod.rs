//! Training stage: loss, metrics, the churn module and the loop that drives it
//!
//! - [`BinaryCrossEntropyWithLogits`] with optional per-class weights
//! - [`ChurnModule`] implementing the [`TrainingModule`] hooks
//! - [`Trainer`] running fit and test over a [`crate::data::DataModule`]
//! - Callbacks for progress and early stopping
//!
//! # Example
//!
//! ```
//! use abandono::train::{BinaryCrossEntropyWithLogits, ClassWeights, LossFn};
//! use abandono::Tensor;
//!
//! let loss_fn = BinaryCrossEntropyWithLogits::weighted(ClassWeights::new(vec![2.0, 1.0])?);
//! let logits = Tensor::from_vec(vec![0.0, 0.0], true);
//! let labels = Tensor::from_vec(vec![0.0, 1.0], false);
//!
//! let loss = loss_fn.forward(&logits, &labels)?;
//! assert!((loss.item() - 1.5 * std::f32::consts::LN_2).abs() < 1e-5);
//! # Ok::<(), abandono::Error>(())
//! ```

mod accumulator;
pub mod callback;
mod config;
mod hooks;
mod loss;
mod metrics;
mod module;
mod trainer;

pub use accumulator::LossAccumulator;
pub use callback::{
    CallbackAction, CallbackContext, CallbackManager, EarlyStopping, ProgressCallback,
    TrainerCallback,
};
pub use config::TrainerConfig;
pub use hooks::{Interval, LrSchedulerConfig, OptimizerConfig, TrainingModule};
pub use loss::{BinaryCrossEntropyWithLogits, ClassWeights, LossFn};
pub use metrics::{Accuracy, ClassificationReport, F1Score, Metric, Precision, Recall};
pub use module::{
    ChurnModule, BASE_LR, CYCLE_GAMMA, LEARNING_RATE_KEY, MAX_LR, MOMENTUM_RANGE, STEP_SIZE_DOWN,
    STEP_SIZE_UP, TEST_LOSS_KEY, TRAIN_LOSS_KEY, VAL_LOSS_KEY, WEIGHT_DECAY,
};
pub use trainer::{FitResult, TestResult, Trainer};
