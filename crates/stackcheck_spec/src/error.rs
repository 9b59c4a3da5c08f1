//! Error types for the specification module.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for specification operations.
pub type SpecResult<T> = Result<T, SpecError>;

/// Errors that can occur while loading specifications and configuration.
#[derive(Error, Debug)]
pub enum SpecError {
    #[error("Specification not found at path: {0}")]
    NotFound(PathBuf),

    #[error("Unsupported configuration format: {0}")]
    UnsupportedFormat(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),
}
