//! Error types for the model layer.

use thiserror::Error;

/// Result type for model operations.
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors raised while building schemas or editing records.
#[derive(Debug, Error)]
pub enum ModelError {
    /// Two definitions share a schema name.
    #[error("schema defined twice: {0}")]
    DuplicateSchema(String),

    /// A field embeds a schema that was not defined.
    #[error("field {field} embeds unknown schema {schema}")]
    UnknownSchema { field: String, schema: String },

    /// A field declares more than one of `ref`, `ref_path` and `schema`.
    #[error("field {0} declares more than one of ref, ref_path and schema")]
    ConflictingTarget(String),

    /// Conditions were given on a field that is not a reference.
    #[error("field {0} has conditions but is not a reference")]
    DanglingConditions(String),

    /// Invalid field path.
    #[error(transparent)]
    Path(#[from] refcheck_types::Error),
}
