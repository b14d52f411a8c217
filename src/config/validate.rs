//! Configuration validation

use super::schema::ExperimentSpec;

#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid batch size: {0} (must be > 0)")]
    InvalidBatchSize(usize),

    #[error("Missing learning rate (module.learning_rate)")]
    MissingLearningRate,

    #[error("Invalid learning rate: {0} (must be > 0.0)")]
    InvalidLearningRate(f64),

    #[error("Invalid class weight at index {index}: {value} (must be finite and >= 0.0)")]
    InvalidClassWeight { index: usize, value: f32 },

    #[error("Invalid epochs: {0} (must be > 0)")]
    InvalidEpochs(usize),

    #[error("Invalid gradient clip value: {0} (must be > 0.0)")]
    InvalidGradClip(f32),

    #[error("Invalid hidden layer width at index {0} (must be > 0)")]
    InvalidHiddenWidth(usize),
}

/// Validate an experiment file
///
/// Checks numeric ranges only; datasets are supplied by the caller.
pub fn validate_config(spec: &ExperimentSpec) -> Result<(), ValidationError> {
    if spec.data.batch_size == 0 {
        return Err(ValidationError::InvalidBatchSize(spec.data.batch_size));
    }

    match spec.module.learning_rate {
        None => return Err(ValidationError::MissingLearningRate),
        Some(lr) if !(lr > 0.0 && lr.is_finite()) => {
            return Err(ValidationError::InvalidLearningRate(lr))
        }
        Some(_) => {}
    }

    if let Some(weights) = &spec.class_weights {
        if let Some((index, &value)) = weights
            .iter()
            .enumerate()
            .find(|(_, w)| !(w.is_finite() && **w >= 0.0))
        {
            return Err(ValidationError::InvalidClassWeight { index, value });
        }
    }

    if spec.trainer.max_epochs == 0 {
        return Err(ValidationError::InvalidEpochs(spec.trainer.max_epochs));
    }

    if let Some(clip) = spec.trainer.gradient_clip_val {
        if clip <= 0.0 {
            return Err(ValidationError::InvalidGradClip(clip));
        }
    }

    if let Some(index) = spec.model.hidden.iter().position(|&w| w == 0) {
        return Err(ValidationError::InvalidHiddenWidth(index));
    }

    Ok(())
}
