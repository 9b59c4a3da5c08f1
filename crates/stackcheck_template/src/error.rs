//! Error types for template processing.

use thiserror::Error;

/// Result type alias for template operations.
pub type TemplateResult<T> = Result<T, TemplateError>;

/// Errors that can occur while normalizing or decoding a template.
#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("Template is not valid UTF-8 text: {0}")]
    NotText(#[from] std::str::Utf8Error),

    #[error("Malformed shorthand at line {line}: {message}")]
    Normalize { line: usize, message: String },

    #[error("Template decode error at line {line}, column {column}: {message}")]
    Decode {
        line: usize,
        column: usize,
        message: String,
    },

    #[error("Resource {resource}: {attribute} must be one of \"\", Delete, Retain, Snapshot (got {value})")]
    InvalidPolicy {
        resource: String,
        attribute: String,
        value: String,
    },

    #[error("Template structure error: {0}")]
    Structure(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl TemplateError {
    pub(crate) fn normalize(line: usize, message: impl Into<String>) -> Self {
        Self::Normalize {
            line,
            message: message.into(),
        }
    }
}
