//! Integration tests for config module

use super::*;
use crate::data::DataModule;
use crate::model::Model;
use std::io::Write;
use tempfile::NamedTempFile;

const FULL_YAML: &str = r#"
data:
  batch_size: 16
  seed: 3

module:
  learning_rate: 0.005
  nni: true
  note: baseline

class_weights: [1.0, 2.5]

model:
  hidden: [8, 4]
  seed: 11

trainer:
  max_epochs: 12
  gradient_clip_val: 1.0
  log_every_n_steps: 5
  checkpoint_dir: /tmp/abandono-ckpt
  check_val_every_n_epoch: 2
"#;

#[test]
fn test_end_to_end_config_loading() {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(FULL_YAML.as_bytes()).unwrap();

    let spec = load_config(temp_file.path()).unwrap();

    assert_eq!(spec.data.batch_size, 16);
    assert_eq!(spec.data.seed, 3);
    assert_eq!(spec.module.learning_rate, Some(0.005));
    assert!(spec.module.nni);
    assert_eq!(spec.module.get("note"), Some(&serde_json::json!("baseline")));
    assert_eq!(spec.class_weights, Some(vec![1.0, 2.5]));
    assert_eq!(spec.model.hidden, vec![8, 4]);
    assert_eq!(spec.trainer.max_epochs, 12);
    assert_eq!(spec.trainer.gradient_clip_val, Some(1.0));
    assert_eq!(spec.trainer.check_val_every_n_epoch, 2);
}

#[test]
fn test_minimal_config() {
    let yaml = r#"
data:
  batch_size: 4
module:
  learning_rate: 0.01
"#;

    let spec = parse_config(yaml).unwrap();
    assert!(spec.class_weights.is_none());
    assert!(spec.model.hidden.is_empty());
    assert!(!spec.module.nni);
    assert_eq!(spec.trainer, crate::train::TrainerConfig::default());
}

#[test]
fn test_missing_learning_rate_rejected() {
    let err = parse_config("data:\n  batch_size: 4\n").unwrap_err();
    assert!(matches!(err, crate::Error::ConfigError(msg) if msg.contains("learning rate")));
}

#[test]
fn test_malformed_yaml() {
    assert!(matches!(
        parse_config("data: [unclosed"),
        Err(crate::Error::ConfigError(_))
    ));
}

#[test]
fn test_missing_file() {
    assert!(matches!(
        load_config("/nonexistent/experiment.yaml"),
        Err(crate::Error::ConfigError(_))
    ));
}

#[test]
fn test_builders_follow_experiment_file() {
    let spec = parse_config(FULL_YAML).unwrap();

    let model = build_model(&spec, 5).unwrap();
    assert_eq!(model.dims(), &[5, 8, 4, 1]);

    let module = build_module(&spec, 5).unwrap();
    assert_eq!(module.class_weights().unwrap().as_slice(), &[1.0, 2.5]);
    assert_eq!(module.model().num_parameters(), model.num_parameters());

    let mut datamodule = build_datamodule(&spec);
    assert_eq!(datamodule.batch_size(), 16);
    assert!(datamodule.setup(crate::data::Stage::Fit).is_err());
}

#[test]
fn test_experiment_yaml_round_trip() {
    let spec = parse_config(FULL_YAML).unwrap();
    let yaml = serde_yaml::to_string(&spec).unwrap();
    assert_eq!(parse_config(&yaml).unwrap(), spec);
}
