use refcheck_types::FieldPath;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use crate::{Condition, Conditions};

/// Shared handle to a schema. Identity (`Arc::ptr_eq`) distinguishes schemas.
pub type SchemaRef = Arc<Schema>;

/// Describes a collection's document structure.
///
/// Fields live behind a lock so a schema can be extended after it is shared,
/// which is how a schema comes to embed itself.
pub struct Schema {
    name: String,
    fields: RwLock<Vec<FieldDef>>,
}

impl Schema {
    pub fn new(name: impl Into<String>, fields: Vec<FieldDef>) -> SchemaRef {
        Arc::new(Self {
            name: name.into(),
            fields: RwLock::new(fields),
        })
    }

    /// A schema with no fields yet.
    pub fn empty(name: impl Into<String>) -> SchemaRef {
        Self::new(name, Vec::new())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Appends a field.
    pub fn add(&self, field: FieldDef) {
        self.fields
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(field);
    }

    /// Snapshot of the current fields.
    pub fn fields(&self) -> Vec<FieldDef> {
        self.fields
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn field(&self, name: &str) -> Option<FieldDef> {
        self.fields
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|f| f.name == name)
            .cloned()
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("name", &self.name)
            .field("fields", &self.fields())
            .finish()
    }
}

/// One declared field.
#[derive(Clone)]
pub struct FieldDef {
    pub name: String,
    /// The field holds zero or more values.
    pub array: bool,
    /// Present when the field refers to records of another collection.
    pub reference: Option<RefAnnotation>,
    /// Present when the field holds sub-documents of this schema.
    pub embedded: Option<SchemaRef>,
}

impl FieldDef {
    /// A field with no reference or embedded schema.
    pub fn plain(name: &str) -> Self {
        Self {
            name: name.into(),
            array: false,
            reference: None,
            embedded: None,
        }
    }

    /// Reference to a record in `collection`.
    pub fn reference(name: &str, collection: &str) -> Self {
        Self {
            reference: Some(RefAnnotation::new(RefTarget::Fixed(collection.into()))),
            ..Self::plain(name)
        }
    }

    /// Array of references to records in `collection`.
    pub fn reference_array(name: &str, collection: &str) -> Self {
        Self::reference(name, collection).array()
    }

    /// Reference whose collection is named by the document value at `target_field`.
    pub fn dynamic_reference(name: &str, target_field: FieldPath) -> Self {
        Self {
            reference: Some(RefAnnotation::new(RefTarget::Dynamic(target_field))),
            ..Self::plain(name)
        }
    }

    /// A single embedded sub-document.
    pub fn embedded(name: &str, schema: &SchemaRef) -> Self {
        Self {
            embedded: Some(Arc::clone(schema)),
            ..Self::plain(name)
        }
    }

    /// An array of embedded sub-documents.
    pub fn embedded_array(name: &str, schema: &SchemaRef) -> Self {
        Self::embedded(name, schema).array()
    }

    /// Marks the field as array-typed.
    #[must_use]
    pub fn array(mut self) -> Self {
        self.array = true;
        self
    }

    /// Attaches a condition to the field's reference annotation. No-op on
    /// fields that are not references.
    #[must_use]
    pub fn with_condition(mut self, field: &str, condition: Condition) -> Self {
        if let Some(reference) = &mut self.reference {
            reference.conditions.insert(field, condition);
        }
        self
    }

    pub fn is_reference(&self) -> bool {
        self.reference.is_some()
    }
}

impl fmt::Debug for FieldDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Embedded schemas print by name; a self-embedding schema would recurse.
        f.debug_struct("FieldDef")
            .field("name", &self.name)
            .field("array", &self.array)
            .field("reference", &self.reference)
            .field("embedded", &self.embedded.as_ref().map(|s| s.name()))
            .finish()
    }
}

/// The reference annotation of a field.
#[derive(Debug, Clone)]
pub struct RefAnnotation {
    pub target: RefTarget,
    pub conditions: Conditions,
}

impl RefAnnotation {
    pub fn new(target: RefTarget) -> Self {
        Self {
            target,
            conditions: Conditions::new(),
        }
    }
}

/// Where a reference points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefTarget {
    /// A fixed collection name.
    Fixed(String),
    /// The collection named by the document value at this path.
    Dynamic(FieldPath),
}
