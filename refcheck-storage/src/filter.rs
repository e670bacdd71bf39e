//! Existence filters.
//!
//! A filter selects records by identity and then applies extra conditions.
//! Condition keys are dotted paths into the stored record. A condition value
//! matches when it equals the stored value, or when the stored value is an
//! array containing it. Objects whose keys all start with `$` are operators:
//! `$eq`, `$ne`, `$in`, `$nin`, `$exists`.

use refcheck_types::{FieldPath, ID_FIELD, RecordId, RefValue};
use serde_json::{Map, Value};
use std::collections::BTreeSet;

use crate::error::{StorageError, StorageResult};

/// Identity part of a filter.
#[derive(Debug, Clone, PartialEq)]
pub enum IdMatch {
    Eq(RecordId),
    In(Vec<RecordId>),
}

/// Identity plus extra conditions.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub id: IdMatch,
    pub conditions: Map<String, Value>,
}

impl Filter {
    pub fn id_eq(id: RecordId) -> Self {
        Self {
            id: IdMatch::Eq(id),
            conditions: Map::new(),
        }
    }

    pub fn id_in(ids: Vec<RecordId>) -> Self {
        Self {
            id: IdMatch::In(ids),
            conditions: Map::new(),
        }
    }

    #[must_use]
    pub fn with_conditions(mut self, conditions: Map<String, Value>) -> Self {
        self.conditions = conditions;
        self
    }

    /// Distinct ids selected by the filter, in order.
    pub fn distinct_ids(&self) -> BTreeSet<&RecordId> {
        match &self.id {
            IdMatch::Eq(id) => BTreeSet::from([id]),
            IdMatch::In(ids) => ids.iter().collect(),
        }
    }

    /// Rejects conditions that cannot be evaluated.
    pub fn validate(&self) -> StorageResult<()> {
        for (key, expected) in &self.conditions {
            FieldPath::parse(key)
                .map_err(|e| StorageError::InvalidFilter(format!("condition key {key}: {e}")))?;
            if let Some(ops) = operators(expected) {
                for (op, arg) in ops {
                    let valid = match op.as_str() {
                        "$eq" | "$ne" => true,
                        "$in" | "$nin" => arg.is_array(),
                        "$exists" => arg.is_boolean(),
                        _ => false,
                    };
                    if !valid {
                        return Err(StorageError::InvalidFilter(format!(
                            "condition {key}: unsupported operator {op} {arg}"
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    /// Whether a stored record is selected by identity and passes every condition.
    pub fn matches(&self, record: &Value) -> bool {
        let RefValue::Id(id) = RefValue::classify(record.get(ID_FIELD)) else {
            return false;
        };
        let selected = match &self.id {
            IdMatch::Eq(expected) => *expected == id,
            IdMatch::In(ids) => ids.contains(&id),
        };
        selected && self.matches_conditions(record)
    }

    /// Whether a stored record passes every condition, ignoring identity.
    pub fn matches_conditions(&self, record: &Value) -> bool {
        self.conditions.iter().all(|(key, expected)| {
            let Ok(path) = FieldPath::parse(key) else {
                return false;
            };
            condition_matches(path.lookup(record), expected)
        })
    }
}

fn operators(value: &Value) -> Option<&Map<String, Value>> {
    match value {
        Value::Object(map) if !map.is_empty() && map.keys().all(|k| k.starts_with('$')) => {
            Some(map)
        }
        _ => None,
    }
}

fn condition_matches(stored: Option<&Value>, expected: &Value) -> bool {
    match operators(expected) {
        Some(ops) => ops
            .iter()
            .all(|(op, arg)| operator_matches(stored, op, arg)),
        None => value_matches(stored, expected),
    }
}

fn operator_matches(stored: Option<&Value>, op: &str, arg: &Value) -> bool {
    match (op, arg) {
        ("$eq", _) => value_matches(stored, arg),
        ("$ne", _) => !value_matches(stored, arg),
        ("$in", Value::Array(options)) => options.iter().any(|o| value_matches(stored, o)),
        ("$nin", Value::Array(options)) => !options.iter().any(|o| value_matches(stored, o)),
        ("$exists", Value::Bool(wanted)) => stored.is_some() == *wanted,
        _ => false,
    }
}

fn value_matches(stored: Option<&Value>, expected: &Value) -> bool {
    match stored {
        Some(Value::Array(items)) if !expected.is_array() => items.contains(expected),
        Some(value) => value == expected,
        None => expected.is_null(),
    }
}
