//! # Abandono: customer-churn classifier training
//!
//! A small tape-based autograd engine and the pipeline around it for a binary
//! churn classifier trained with weighted BCE-with-logits, Adam and a
//! cyclical learning rate.
//!
//! ## Architecture
//!
//! - **autograd**: Tensors with shared gradient cells and backward ops
//! - **data**: Sample container, batch loader and split orchestration
//! - **model**: Feed-forward networks producing one logit per row
//! - **optim**: Adam, gradient clipping, cyclical LR schedule
//! - **train**: Loss, metrics, the churn training module and the trainer
//! - **monitor**: Metric logging into pluggable stores
//! - **tuning**: Hyperparameter search and intermediate/final reporting
//! - **config**: Declarative YAML experiment configuration
//! - **io**: JSON checkpoints

pub mod autograd;
pub mod config;
pub mod data;
pub mod io;
pub mod model;
pub mod monitor;
pub mod optim;
pub mod train;
pub mod tuning;

pub mod error;

// Re-export commonly used types
pub use autograd::{backward, Tensor};
pub use error::{Error, Result};
