//! Per-field results.

use refcheck_types::FieldPath;
use serde::Serialize;
use std::fmt;

use crate::CheckError;

/// Result of checking one reference path.
#[derive(Debug)]
pub enum ValidationOutcome {
    /// The reference is valid, absent, unmodified, or validation is disabled.
    Pass,
    /// The referenced record(s) do not exist or fail the conditions.
    Fail,
    /// The check could not be carried out.
    Error(CheckError),
}

impl ValidationOutcome {
    pub fn is_pass(&self) -> bool {
        matches!(self, Self::Pass)
    }

    pub fn is_fail(&self) -> bool {
        matches!(self, Self::Fail)
    }
}

/// Outcome of one concrete reference path.
#[derive(Debug)]
pub struct FieldCheck {
    pub path: FieldPath,
    pub outcome: ValidationOutcome,
}

/// A failing reference and its rendered message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub path: FieldPath,
    pub message: String,
}

/// Every failing reference of a document, in check order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(Vec<FieldError>);

impl FieldErrors {
    pub fn new(errors: Vec<FieldError>) -> Self {
        Self(errors)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.0.iter()
    }

    /// Message for a path written in dotted form, e.g. `contacts.0.contactId`.
    pub fn message(&self, path: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|e| e.path.to_string() == path)
            .map(|e| e.message.as_str())
    }

    pub fn paths(&self) -> Vec<String> {
        self.0.iter().map(|e| e.path.to_string()).collect()
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<&str> = self.0.iter().map(|e| e.message.as_str()).collect();
        f.write_str(&messages.join("; "))
    }
}

impl IntoIterator for FieldErrors {
    type Item = FieldError;
    type IntoIter = std::vec::IntoIter<FieldError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
