//! Error types for the validator module.

use thiserror::Error;

use stackcheck_spec::SpecError;
use stackcheck_template::TemplateError;

/// Result type alias for validator operations.
pub type ValidatorResult<T> = Result<T, ValidatorError>;

/// Errors that abort a validation run.
///
/// Structural problems in a template are never errors here; they are
/// collected in the [`ValidationReport`](crate::report::ValidationReport).
#[derive(Error, Debug)]
pub enum ValidatorError {
    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    #[error("Specification error: {0}")]
    Spec(#[from] SpecError),

    #[error("Invalid rule pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
