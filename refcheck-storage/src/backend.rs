//! Backend abstraction.
//!
//! Defines the count interface the validator queries, allowing it to work with
//! any store.

use async_trait::async_trait;
use refcheck_types::SessionId;
use std::sync::{Arc, PoisonError, RwLock};

use crate::error::StorageResult;
use crate::filter::Filter;

/// A store that can count matching records.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Human-readable name, used in logs.
    fn name(&self) -> &str;

    /// Returns whether the collection is known to the store.
    async fn has_collection(&self, collection: &str) -> StorageResult<bool>;

    /// Counts records of `collection` matching `filter`.
    ///
    /// When `session` is given the count observes that session's uncommitted
    /// writes. Each record counts once, however many times its id appears in
    /// the filter.
    async fn count(
        &self,
        collection: &str,
        filter: &Filter,
        session: Option<SessionId>,
    ) -> StorageResult<u64>;
}

/// Shared handle to a backend.
pub type Connection = Arc<dyn Backend>;

static DEFAULT_CONNECTION: RwLock<Option<Connection>> = RwLock::new(None);

/// Installs the process-wide default connection.
pub fn set_default_connection(connection: Connection) {
    *DEFAULT_CONNECTION
        .write()
        .unwrap_or_else(PoisonError::into_inner) = Some(connection);
}

/// Returns the process-wide default connection, if one is installed.
pub fn default_connection() -> Option<Connection> {
    DEFAULT_CONNECTION
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

/// Removes the process-wide default connection.
pub fn clear_default_connection() {
    *DEFAULT_CONNECTION
        .write()
        .unwrap_or_else(PoisonError::into_inner) = None;
}
