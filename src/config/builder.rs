//! Build training components from an experiment file

use super::schema::ExperimentSpec;
use crate::data::ChurnDataModule;
use crate::error::Result;
use crate::model::Mlp;
use crate::train::{ChurnModule, ClassWeights};

/// `input_dim → hidden.. → 1` network seeded from the model section
pub fn build_model(spec: &ExperimentSpec, input_dim: usize) -> Result<Mlp> {
    let mut dims = Vec::with_capacity(spec.model.hidden.len() + 2);
    dims.push(input_dim);
    dims.extend_from_slice(&spec.model.hidden);
    dims.push(1);
    Mlp::new(&dims, spec.model.seed)
}

pub fn build_datamodule(spec: &ExperimentSpec) -> ChurnDataModule {
    ChurnDataModule::new(spec.data.batch_size).with_seed(spec.data.seed)
}

/// Training module with the configured class weights and a no-op reporter
pub fn build_module(spec: &ExperimentSpec, input_dim: usize) -> Result<ChurnModule<Mlp>> {
    let model = build_model(spec, input_dim)?;
    let weights = spec
        .class_weights
        .clone()
        .map(ClassWeights::new)
        .transpose()?;
    Ok(ChurnModule::new(model, spec.module.clone()).with_class_weights(weights))
}
