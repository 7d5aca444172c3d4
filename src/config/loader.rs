//! Configuration loading from disk.

use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::config::schema::AgentConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a JSON file.
///
/// Files with a `.toml` extension are parsed as TOML with the same keys.
pub fn load_config(path: &Path) -> Result<AgentConfig, ConfigError> {
    let content = fs::read_to_string(path)?;

    let config: AgentConfig = match path.extension().and_then(|ext| ext.to_str()) {
        Some("toml") => toml::from_str(&content)?,
        _ => serde_json::from_str(&content)?,
    };

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}
