//! Core type definitions for refcheck.
//!
//! This crate defines the small, backend-agnostic types shared by the model,
//! storage and validator crates:
//! - [`FieldPath`] — dotted document paths with `$` array wildcards
//! - [`RecordId`] and [`RefValue`] — identity of referenced records
//! - [`SessionId`] — handle of an open backend session/transaction

mod ids;
mod path;

pub use ids::{ID_FIELD, RecordId, RefValue, SessionId};
pub use path::{Expansion, FieldPath, Segment};

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid field path: {0:?}")]
    InvalidPath(String),

    #[error("cannot write through {0}: not an object or array")]
    NotAContainer(String),
}
