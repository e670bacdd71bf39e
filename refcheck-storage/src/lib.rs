//! Storage layer for refcheck.
//!
//! The validator never reads records: it asks a [`Backend`] how many records of
//! a collection match a [`Filter`] and interprets the number. This crate defines
//! that seam and two stores implementing it.
//!
//! # Architecture
//!
//! - [`Backend`] is the async count interface, optionally scoped to a session
//! - [`Filter`] is identity (`_id` equals / is one of) plus extra conditions
//! - [`MemoryStore`] keeps collections in memory, with staged session writes
//! - [`DuckDbStore`] keeps records as JSON text in DuckDB; sessions are open
//!   transactions on cloned connections
//! - A process-wide default [`Connection`] serves validators that were not
//!   given one explicitly

mod backend;
mod duckdb_store;
mod error;
mod filter;
mod memory;

pub use backend::{
    Backend, Connection, clear_default_connection, default_connection, set_default_connection,
};
pub use duckdb_store::DuckDbStore;
pub use error::{StorageError, StorageResult};
pub use filter::{Filter, IdMatch};
pub use memory::MemoryStore;
