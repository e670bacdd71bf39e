//! Identifier types used throughout refcheck.
//!
//! Sessions use UUID v7 for time-ordered, globally unique handles. Record ids
//! are strings or integers, compared by kind and value.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

/// Name of the identity key on every stored record.
pub const ID_FIELD: &str = "_id";

/// Handle of an open backend session (transaction).
///
/// Queries scoped to a session observe the session's uncommitted writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of a stored record (the value of its `_id` member).
///
/// The JSON kind is part of the identity: `5` and `"5"` name different records.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Int(i64),
    Str(String),
}

impl RecordId {
    /// Generates a fresh, time-ordered string identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self::Str(Uuid::now_v7().simple().to_string())
    }

    /// The identifier as a JSON value, suitable for storing under `_id`.
    pub fn to_value(&self) -> Value {
        match self {
            Self::Int(n) => Value::from(*n),
            Self::Str(s) => Value::String(s.clone()),
        }
    }

    /// Storage key that keeps the JSON kind: the id's JSON text (`5`, `"5"`).
    pub fn to_key(&self) -> String {
        self.to_value().to_string()
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(n) => write!(f, "{n}"),
            Self::Str(s) => f.write_str(s),
        }
    }
}

impl From<&str> for RecordId {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for RecordId {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<i64> for RecordId {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

/// Classification of a raw value found at a reference path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefValue {
    /// `null` or missing: nothing to check.
    Absent,
    /// A value identifying one record.
    Id(RecordId),
    /// A value that cannot identify any record.
    Malformed,
}

impl RefValue {
    /// Classifies a raw document value.
    ///
    /// Strings and integers that fit an `i64` are ids, each keeping its kind.
    /// An object with an `_id` member is a populated copy of the referenced
    /// record and classifies as that id.
    pub fn classify(value: Option<&Value>) -> Self {
        match value {
            None | Some(Value::Null) => Self::Absent,
            Some(Value::String(s)) if s.is_empty() => Self::Malformed,
            Some(Value::String(s)) => Self::Id(RecordId::Str(s.clone())),
            Some(Value::Number(n)) => match n.as_i64() {
                Some(i) => Self::Id(RecordId::Int(i)),
                None => Self::Malformed,
            },
            Some(Value::Object(map)) => match map.get(ID_FIELD) {
                Some(inner @ (Value::String(_) | Value::Number(_))) => Self::classify(Some(inner)),
                _ => Self::Malformed,
            },
            Some(_) => Self::Malformed,
        }
    }
}
