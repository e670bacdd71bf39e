//! Extra predicates on referenced records.

use refcheck_types::FieldPath;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::Document;

/// A rule computing a condition value from the document being validated.
pub type Rule = Arc<dyn Fn(&dyn Document) -> Value + Send + Sync>;

/// One condition value: fixed, or computed per document at validation time.
#[derive(Clone)]
pub enum Condition {
    Literal(Value),
    Computed(Rule),
}

impl Condition {
    pub fn literal(value: impl Into<Value>) -> Self {
        Self::Literal(value.into())
    }

    pub fn computed<F>(rule: F) -> Self
    where
        F: Fn(&dyn Document) -> Value + Send + Sync + 'static,
    {
        Self::Computed(Arc::new(rule))
    }

    /// A computed condition that copies the value at `path` from the document
    /// (`null` when absent).
    pub fn from_field(path: FieldPath) -> Self {
        Self::computed(move |doc| doc.get(&path).cloned().unwrap_or(Value::Null))
    }
}

impl fmt::Debug for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Literal(value) => f.debug_tuple("Literal").field(value).finish(),
            Condition::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

/// Condition map keyed by the referenced record's field name.
#[derive(Debug, Clone, Default)]
pub struct Conditions(BTreeMap<String, Condition>);

impl Conditions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a condition, returning the extended map.
    #[must_use]
    pub fn with(mut self, field: impl Into<String>, condition: Condition) -> Self {
        self.0.insert(field.into(), condition);
        self
    }

    pub fn insert(&mut self, field: impl Into<String>, condition: Condition) {
        self.0.insert(field.into(), condition);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Condition)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<K: Into<String>> FromIterator<(K, Condition)> for Conditions {
    fn from_iter<I: IntoIterator<Item = (K, Condition)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}
