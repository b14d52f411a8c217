//! Error types for abandono

use crate::monitor::StorageError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Index {index} out of range for dataset of length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        got: Vec<usize>,
    },

    #[error("Missing configuration key: {0}")]
    MissingConfig(String),

    #[error("The {split} split is not available until stage `{stage}` has been set up")]
    StageNotActive {
        split: &'static str,
        stage: &'static str,
    },

    #[error("Datasets have not been prepared")]
    NotPrepared,

    #[error("Datasets were already prepared; splits cannot be reassigned")]
    AlreadyPrepared,

    #[error("Unknown stage: {0}")]
    UnknownStage(String),

    #[error("Label {label} has no class weight (weights cover {num_classes} classes)")]
    InvalidLabel { label: f32, num_classes: usize },

    #[error("No {0} batches were processed this epoch")]
    EmptyEpoch(&'static str),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Metrics storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Tuning report failed: {0}")]
    Tuning(String),
}

pub type Result<T> = std::result::Result<T, Error>;
