//! Reference validation for refcheck.
//!
//! Given a schema, the validator finds every field declared as a reference to
//! another collection and, each time a document is validated, asks the backend
//! whether the referenced records exist (and satisfy the reference's extra
//! conditions).
//!
//! # Architecture
//!
//! - [`extract_descriptors`] walks a schema once at registration, recursing
//!   into embedded schemas, and yields one [`ReferenceDescriptor`] per reference
//! - [`resolve_conditions`] turns a descriptor's conditions into a concrete
//!   filter for one document
//! - [`is_modified`] gates checks on fields that did not change since the last save
//! - [`Lookup`] and [`execute`] run one existence count and interpret it
//! - [`IdValidator`] owns the enabled flag and registers schemas; the resulting
//!   [`SchemaValidator`] orchestrates the checks for each document
//!
//! ```ignore
//! let validator = IdValidator::new();
//! let cars = validator.register(&car_schema, ValidatorOptions::default().with_connection(store));
//! cars.validate(&car).await?;
//! ```

mod changes;
mod conditions;
mod descriptor;
mod engine;
mod error;
mod executor;
mod options;
mod outcome;

pub use changes::is_modified;
pub use conditions::resolve_conditions;
pub use descriptor::{Cardinality, ReferenceDescriptor, extract_descriptors};
pub use engine::{IdValidator, SchemaValidator, register};
pub use error::{CheckError, ValidateResult, ValidationError};
pub use executor::{Lookup, execute};
pub use options::{DEFAULT_MESSAGE, PATH_PLACEHOLDER, ValidatorOptions};
pub use outcome::{FieldCheck, FieldError, FieldErrors, ValidationOutcome};
