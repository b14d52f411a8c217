//! JSON checkpoints of model parameters

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// One named parameter tensor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterState {
    /// e.g. "layer0.weight"
    pub name: String,
    pub shape: Vec<usize>,
    pub data: Vec<f32>,
}

/// Serializable snapshot of a model's parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelState {
    pub architecture: String,
    pub parameters: Vec<ParameterState>,
}

/// Model state plus the point in training it was taken at
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    pub epoch: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub val_loss: Option<f32>,
    pub model: ModelState,
}

pub fn save_checkpoint(checkpoint: &Checkpoint, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let data = serde_json::to_string_pretty(checkpoint)
        .map_err(|e| Error::Serialization(format!("JSON serialization failed: {e}")))?;
    fs::write(path, data)?;
    Ok(())
}

pub fn load_checkpoint(path: impl AsRef<Path>) -> Result<Checkpoint> {
    let content = fs::read_to_string(path.as_ref())?;
    serde_json::from_str(&content)
        .map_err(|e| Error::Serialization(format!("JSON deserialization failed: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_checkpoint_file_layout() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("best.json");

        let checkpoint = Checkpoint {
            epoch: 4,
            val_loss: Some(0.31),
            model: ModelState {
                architecture: "mlp".to_string(),
                parameters: vec![ParameterState {
                    name: "layer0.bias".to_string(),
                    shape: vec![1],
                    data: vec![0.5],
                }],
            },
        };
        save_checkpoint(&checkpoint, &path).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["epoch"], 4);
        assert_eq!(raw["model"]["parameters"][0]["name"], "layer0.bias");

        let loaded = load_checkpoint(&path).unwrap();
        assert_eq!(loaded.model, checkpoint.model);
    }

    #[test]
    fn test_load_garbage_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(load_checkpoint(&path), Err(Error::Serialization(_))));
    }
}
