//! Existence query execution.
//!
//! A reference value is first planned into a [`Lookup`], without touching the
//! backend. Only a lookup carrying ids turns into a count query; the check
//! passes when the count equals the number of ids asked for.

use refcheck_storage::{Backend, Filter, StorageError};
use refcheck_types::{RecordId, RefValue, SessionId};
use serde_json::{Map, Value};
use std::collections::HashSet;
use tracing::{trace, warn};

use crate::{Cardinality, CheckError, ValidationOutcome};

/// What a reference value asks the backend for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    /// Absent value or empty list: passes without a query.
    Nothing,
    /// The value cannot identify a record: fails without a query.
    Malformed,
    /// One record must exist.
    One(RecordId),
    /// Every listed id must be matched.
    Many(Vec<RecordId>),
}

impl Lookup {
    /// Plans the check for a raw reference value.
    ///
    /// For collections, `null` elements are ignored and a bare value counts as
    /// a one-element list. With `allow_duplicates` the ids are deduplicated,
    /// keeping first occurrences; otherwise repeated ids stay and each position
    /// must be matched, which a repeated id never can be.
    pub fn plan(value: Option<&Value>, cardinality: Cardinality, allow_duplicates: bool) -> Self {
        match cardinality {
            Cardinality::Scalar => match RefValue::classify(value) {
                RefValue::Absent => Self::Nothing,
                RefValue::Id(id) => Self::One(id),
                RefValue::Malformed => Self::Malformed,
            },
            Cardinality::Collection => {
                let items: Vec<&Value> = match value {
                    None | Some(Value::Null) => return Self::Nothing,
                    Some(Value::Array(items)) => items.iter().collect(),
                    Some(single) => vec![single],
                };

                let mut ids = Vec::with_capacity(items.len());
                for item in items {
                    match RefValue::classify(Some(item)) {
                        RefValue::Absent => {}
                        RefValue::Id(id) => ids.push(id),
                        RefValue::Malformed => return Self::Malformed,
                    }
                }
                if allow_duplicates {
                    let mut seen = HashSet::new();
                    ids.retain(|id| seen.insert(id.clone()));
                }

                if ids.is_empty() {
                    Self::Nothing
                } else {
                    Self::Many(ids)
                }
            }
        }
    }

    /// Number of matching records required to pass.
    pub fn expected(&self) -> u64 {
        match self {
            Self::Nothing | Self::Malformed => 0,
            Self::One(_) => 1,
            Self::Many(ids) => ids.len() as u64,
        }
    }

    /// True when the lookup needs a backend query.
    pub fn needs_query(&self) -> bool {
        matches!(self, Self::One(_) | Self::Many(_))
    }
}

/// Runs the existence count for `lookup` against `collection`.
///
/// A collection the backend does not know is a configuration error; any other
/// backend failure is reported as a backend error, never as a failed check.
pub async fn execute(
    backend: &dyn Backend,
    collection: &str,
    lookup: Lookup,
    conditions: Map<String, Value>,
    session: Option<SessionId>,
) -> ValidationOutcome {
    let expected = lookup.expected();
    let filter = match lookup {
        Lookup::Nothing => return ValidationOutcome::Pass,
        Lookup::Malformed => return ValidationOutcome::Fail,
        Lookup::One(id) => Filter::id_eq(id),
        Lookup::Many(ids) => Filter::id_in(ids),
    }
    .with_conditions(conditions);

    match backend.count(collection, &filter, session).await {
        Ok(count) => {
            trace!(
                "{}: {} expected {}, found {}",
                backend.name(),
                collection,
                expected,
                count
            );
            if count == expected {
                ValidationOutcome::Pass
            } else {
                ValidationOutcome::Fail
            }
        }
        Err(StorageError::UnknownCollection(name)) => ValidationOutcome::Error(
            CheckError::Configuration(format!("unknown collection {name}")),
        ),
        Err(e) => {
            warn!("{}: count on {} failed: {}", backend.name(), collection, e);
            ValidationOutcome::Error(CheckError::Backend(e))
        }
    }
}
