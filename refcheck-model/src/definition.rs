//! Serde form of schemas, for configuration files.
//!
//! ```json
//! { "name": "Car", "fields": [
//!   { "name": "manufacturer", "ref": "Manufacturer" },
//!   { "name": "colours", "array": true, "ref": "Colour",
//!     "conditions": { "active": true, "owner": { "$field": "ownerId" } } },
//!   { "name": "contacts", "array": true, "schema": "Contact" } ] }
//! ```
//!
//! A condition value of the form `{"$field": "<path>"}` becomes a computed
//! condition reading that path off the validated document.

use refcheck_types::FieldPath;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::{
    Condition, FieldDef, ModelError, ModelResult, RefAnnotation, RefTarget, Schema, SchemaRef,
};

const FIELD_RULE_KEY: &str = "$field";

/// A schema as written in a configuration file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaDefinition {
    pub name: String,
    #[serde(default)]
    pub fields: Vec<FieldDefinition>,
}

/// A field as written in a configuration file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDefinition {
    pub name: String,
    #[serde(default)]
    pub array: bool,
    /// Fixed target collection.
    #[serde(rename = "ref", default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    /// Path of the document field naming the target collection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ref_path: Option<FieldPath>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub conditions: BTreeMap<String, Value>,
    /// Name of the embedded schema.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
}

/// Builds every definition, resolving embedded schemas by name. A definition
/// may embed itself or any other definition in the same batch.
pub fn build_schemas(
    definitions: &[SchemaDefinition],
) -> ModelResult<BTreeMap<String, SchemaRef>> {
    let mut schemas = BTreeMap::new();
    for def in definitions {
        if schemas.insert(def.name.clone(), Schema::empty(&def.name)).is_some() {
            return Err(ModelError::DuplicateSchema(def.name.clone()));
        }
    }

    for def in definitions {
        let schema = &schemas[&def.name];
        for field in &def.fields {
            schema.add(field.build(&schemas)?);
        }
    }

    Ok(schemas)
}

impl FieldDefinition {
    fn build(&self, schemas: &BTreeMap<String, SchemaRef>) -> ModelResult<FieldDef> {
        let targets = [
            self.reference.is_some(),
            self.ref_path.is_some(),
            self.schema.is_some(),
        ];
        if targets.iter().filter(|set| **set).count() > 1 {
            return Err(ModelError::ConflictingTarget(self.name.clone()));
        }

        let target = match (&self.reference, &self.ref_path) {
            (Some(collection), _) => Some(RefTarget::Fixed(collection.clone())),
            (None, Some(path)) => Some(RefTarget::Dynamic(path.clone())),
            (None, None) => None,
        };

        let embedded = match &self.schema {
            Some(name) => Some(schemas.get(name).cloned().ok_or_else(|| {
                ModelError::UnknownSchema {
                    field: self.name.clone(),
                    schema: name.clone(),
                }
            })?),
            None => None,
        };

        let reference = match target {
            Some(target) => {
                let mut annotation = RefAnnotation::new(target);
                for (key, value) in &self.conditions {
                    annotation.conditions.insert(key, condition_from_value(value)?);
                }
                Some(annotation)
            }
            None if !self.conditions.is_empty() => {
                return Err(ModelError::DanglingConditions(self.name.clone()));
            }
            None => None,
        };

        Ok(FieldDef {
            name: self.name.clone(),
            array: self.array,
            reference,
            embedded,
        })
    }
}

fn condition_from_value(value: &Value) -> ModelResult<Condition> {
    if let Value::Object(map) = value {
        if let (1, Some(Value::String(path))) = (map.len(), map.get(FIELD_RULE_KEY)) {
            return Ok(Condition::from_field(FieldPath::parse(path)?));
        }
    }
    Ok(Condition::Literal(value.clone()))
}
