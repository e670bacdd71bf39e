//! Condition evaluation.

use refcheck_model::{Condition, Conditions, Document};
use serde_json::{Map, Value};

/// Produces the concrete extra filter for one document.
///
/// Literal values are copied; computed rules are invoked with the document.
/// Conditions are only ever read, so resolving them for one document cannot
/// affect another.
pub fn resolve_conditions(conditions: &Conditions, doc: &dyn Document) -> Map<String, Value> {
    if conditions.is_empty() {
        return Map::new();
    }
    conditions
        .iter()
        .map(|(field, condition)| {
            let value = match condition {
                Condition::Literal(value) => value.clone(),
                Condition::Computed(rule) => rule(doc),
            };
            (field.to_string(), value)
        })
        .collect()
}
