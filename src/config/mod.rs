//! Declarative YAML configuration
//!
//! # Example
//!
//! ```yaml
//! data:
//!   batch_size: 64
//!   seed: 42
//!
//! module:
//!   learning_rate: 0.001
//!   nni: true
//!
//! class_weights: [1.0, 2.77]
//!
//! model:
//!   hidden: [32, 16]
//!   seed: 7
//!
//! trainer:
//!   max_epochs: 30
//!   gradient_clip_val: 1.0
//!   checkpoint_dir: checkpoints
//! ```

mod builder;
mod load;
mod schema;
mod validate;

#[cfg(test)]
mod tests;

pub use builder::{build_datamodule, build_model, build_module};
pub use load::{load_config, parse_config};
pub use schema::{DataSpec, ExperimentSpec, ModelSpec, ModuleConfig};
pub use validate::{validate_config, ValidationError};
