//! Configuration schema

use crate::train::TrainerConfig;
use crate::tuning::ParameterValue;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Settings read by the training module.
///
/// Unknown keys are kept in `extra` so tuner-sampled parameters that the module
/// does not interpret survive a round trip.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModuleConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub learning_rate: Option<f64>,

    /// Report validation losses to the tuner as intermediate results
    #[serde(default)]
    pub nni: bool,

    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl ModuleConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_learning_rate(mut self, learning_rate: f64) -> Self {
        self.learning_rate = Some(learning_rate);
        self
    }

    pub fn with_nni(mut self, nni: bool) -> Self {
        self.nni = nni;
        self
    }

    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.extra.get(key)
    }

    /// Merge a sampled trial configuration; `learning_rate` and `nni` are
    /// interpreted, everything else lands in `extra`
    pub fn apply_parameters(&mut self, params: &BTreeMap<String, ParameterValue>) {
        for (name, value) in params {
            match (name.as_str(), value) {
                ("learning_rate", v) if v.as_float().is_some() => {
                    self.learning_rate = v.as_float();
                }
                ("nni", ParameterValue::Int(v)) => self.nni = *v != 0,
                _ => {
                    self.extra.insert(name.clone(), value.to_json());
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSpec {
    pub batch_size: usize,
    /// Seed for the training split's shuffling
    #[serde(default)]
    pub seed: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelSpec {
    /// Hidden layer widths; empty means logistic regression
    #[serde(default)]
    pub hidden: Vec<usize>,
    #[serde(default)]
    pub seed: u64,
}

/// Experiment file
///
/// ```yaml
/// data:
///   batch_size: 32
///   seed: 7
/// module:
///   learning_rate: 0.001
///   nni: false
/// class_weights: [1.0, 2.5]
/// model:
///   hidden: [16]
/// trainer:
///   max_epochs: 20
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentSpec {
    pub data: DataSpec,
    #[serde(default)]
    pub module: ModuleConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_weights: Option<Vec<f32>>,
    #[serde(default)]
    pub model: ModelSpec,
    #[serde(default)]
    pub trainer: TrainerConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_config_keeps_unknown_keys() {
        let yaml = "learning_rate: 0.01\nnni: true\ndropout: 0.2\n";
        let config: ModuleConfig = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.learning_rate, Some(0.01));
        assert!(config.nni);
        assert_eq!(config.get("dropout"), Some(&serde_json::json!(0.2)));
    }

    #[test]
    fn test_module_config_defaults() {
        let config: ModuleConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config, ModuleConfig::new());
        assert!(!config.nni);
        assert!(config.learning_rate.is_none());
    }

    #[test]
    fn test_apply_parameters_overrides_learning_rate() {
        let mut config = ModuleConfig::new().with_learning_rate(0.1);
        let mut params = BTreeMap::new();
        params.insert("learning_rate".to_string(), ParameterValue::Float(3e-3));
        params.insert("hidden".to_string(), ParameterValue::Int(32));

        config.apply_parameters(&params);

        assert_eq!(config.learning_rate, Some(3e-3));
        assert_eq!(config.get("hidden"), Some(&serde_json::json!(32)));
    }
}
