//! Document and schema model for refcheck.
//!
//! Defines the collaborator types the reference validator works against:
//! - [`Document`] — read access to a document's JSON, its change tracking and session
//! - [`Record`] — the change-tracked document container (collection, JSON data, persisted snapshot)
//! - [`Schema`] / [`FieldDef`] — declares a collection's fields, references and embedded schemas
//! - [`Condition`] — extra predicates a referenced record must satisfy
//! - [`SchemaDefinition`] — the serde form of a schema, for configuration files
//!
//! Schemas are shared as [`SchemaRef`] (`Arc<Schema>`). A schema may embed itself,
//! which is why fields can be added after construction with [`Schema::add`].

mod condition;
mod definition;
mod document;
mod error;
mod schema;

pub use condition::{Condition, Conditions, Rule};
pub use definition::{FieldDefinition, SchemaDefinition, build_schemas};
pub use document::{Document, Record};
pub use error::{ModelError, ModelResult};
pub use schema::{FieldDef, RefAnnotation, RefTarget, Schema, SchemaRef};
