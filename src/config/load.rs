//! Reading experiment files

use super::schema::ExperimentSpec;
use super::validate::validate_config;
use crate::error::{Error, Result};
use std::fs;
use std::path::Path;

/// Load and validate an experiment file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<ExperimentSpec> {
    let yaml = fs::read_to_string(path.as_ref()).map_err(|e| {
        Error::ConfigError(format!(
            "Failed to read config file {}: {}",
            path.as_ref().display(),
            e
        ))
    })?;
    parse_config(&yaml)
}

/// Parse and validate YAML text
pub fn parse_config(yaml: &str) -> Result<ExperimentSpec> {
    let spec: ExperimentSpec = serde_yaml::from_str(yaml)
        .map_err(|e| Error::ConfigError(format!("Failed to parse YAML config: {e}")))?;

    validate_config(&spec).map_err(|e| Error::ConfigError(format!("Invalid config: {e}")))?;

    Ok(spec)
}
