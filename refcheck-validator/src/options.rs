//! Registration options.

use refcheck_storage::Connection;
use refcheck_types::FieldPath;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Placeholder replaced by the failing path in messages.
pub const PATH_PLACEHOLDER: &str = "{PATH}";

/// Message used when none is configured.
pub const DEFAULT_MESSAGE: &str = "{PATH} references a non existing ID";

/// Options given when registering a schema.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorOptions {
    /// Failure message template; `{PATH}` is replaced by the field path.
    pub message: String,
    /// Backend to query. Falls back to the process-wide default connection.
    #[serde(skip)]
    pub connection: Option<Connection>,
    /// Check each distinct id once instead of every list position.
    pub allow_duplicates: bool,
}

impl Default for ValidatorOptions {
    fn default() -> Self {
        Self {
            message: DEFAULT_MESSAGE.to_string(),
            connection: None,
            allow_duplicates: false,
        }
    }
}

impl ValidatorOptions {
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    #[must_use]
    pub fn with_connection(mut self, connection: Connection) -> Self {
        self.connection = Some(connection);
        self
    }

    #[must_use]
    pub fn with_allow_duplicates(mut self, allow: bool) -> Self {
        self.allow_duplicates = allow;
        self
    }

    /// Renders the failure message for `path`.
    pub fn render_message(&self, path: &FieldPath) -> String {
        self.message.replace(PATH_PLACEHOLDER, &path.to_string())
    }
}

impl fmt::Debug for ValidatorOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let connection = self.connection.as_ref().map(|c| c.name().to_string());
        f.debug_struct("ValidatorOptions")
            .field("message", &self.message)
            .field("connection", &connection)
            .field("allow_duplicates", &self.allow_duplicates)
            .finish()
    }
}
