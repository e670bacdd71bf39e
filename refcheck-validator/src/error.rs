//! Error types for reference validation.

use refcheck_storage::StorageError;
use refcheck_types::FieldPath;
use thiserror::Error;

use crate::FieldErrors;

/// Result type for document validation.
pub type ValidateResult<T> = Result<T, ValidationError>;

/// Why a single reference check could not produce a pass/fail answer.
#[derive(Debug, Error)]
pub enum CheckError {
    /// The backend failed to answer the existence query.
    #[error("backend error: {0}")]
    Backend(#[from] StorageError),

    /// The reference cannot be resolved to a collection on a connection.
    #[error("configuration error: {0}")]
    Configuration(String),
}

/// Errors returned when validating a document.
///
/// Backend errors take precedence over configuration errors, which take
/// precedence over failed references.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// One or more references point at missing records.
    #[error("invalid references: {0}")]
    Invalid(FieldErrors),

    /// The backend failed while checking `path`.
    #[error("backend error while checking {path}: {source}")]
    Backend {
        path: FieldPath,
        #[source]
        source: StorageError,
    },

    /// The reference at `path` is misconfigured.
    #[error("configuration error at {path}: {reason}")]
    Configuration { path: FieldPath, reason: String },
}

impl ValidationError {
    /// The failed references, when this is a plain validation failure.
    pub fn field_errors(&self) -> Option<&FieldErrors> {
        match self {
            Self::Invalid(errors) => Some(errors),
            _ => None,
        }
    }
}
