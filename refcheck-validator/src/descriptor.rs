//! Reference descriptor extraction.
//!
//! Runs once per registered schema. The result is a flat list: references in
//! embedded schemas are listed with their full path, and arrays of embedded
//! documents contribute a `$` segment (`contacts.$.contactId`).

use refcheck_model::{Conditions, RefTarget, Schema, SchemaRef};
use refcheck_types::FieldPath;
use std::collections::HashSet;
use tracing::debug;

/// Whether a reference holds one id or a list of ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    Scalar,
    Collection,
}

/// One reference field, as seen from the root of the registered schema.
#[derive(Debug, Clone)]
pub struct ReferenceDescriptor {
    pub path: FieldPath,
    pub cardinality: Cardinality,
    /// Dynamic target paths are absolute, like `path`.
    pub target: RefTarget,
    pub conditions: Conditions,
    pub allow_duplicates: bool,
}

/// Lists every reference reachable from `schema`.
///
/// A schema already being walked on the current branch is not entered again,
/// so self-embedding schemas terminate.
pub fn extract_descriptors(
    schema: &SchemaRef,
    allow_duplicates: bool,
) -> Vec<ReferenceDescriptor> {
    let mut descriptors = Vec::new();
    let mut visiting = HashSet::new();
    walk(
        schema,
        &FieldPath::default(),
        allow_duplicates,
        &mut visiting,
        &mut descriptors,
    );
    debug!(
        "schema {}: {} reference descriptor(s)",
        schema.name(),
        descriptors.len()
    );
    descriptors
}

fn walk(
    schema: &SchemaRef,
    prefix: &FieldPath,
    allow_duplicates: bool,
    visiting: &mut HashSet<*const Schema>,
    out: &mut Vec<ReferenceDescriptor>,
) {
    let identity = SchemaRef::as_ptr(schema);
    if !visiting.insert(identity) {
        return;
    }

    for field in schema.fields() {
        let path = prefix.child(&field.name);

        if let Some(reference) = &field.reference {
            let target = match &reference.target {
                RefTarget::Fixed(collection) => RefTarget::Fixed(collection.clone()),
                RefTarget::Dynamic(field_path) => RefTarget::Dynamic(prefix.join(field_path)),
            };
            out.push(ReferenceDescriptor {
                path: path.clone(),
                cardinality: if field.array {
                    Cardinality::Collection
                } else {
                    Cardinality::Scalar
                },
                target,
                conditions: reference.conditions.clone(),
                allow_duplicates,
            });
        }

        if let Some(embedded) = &field.embedded {
            let nested = if field.array { path.each() } else { path };
            walk(embedded, &nested, allow_duplicates, visiting, out);
        }
    }

    visiting.remove(&identity);
}
