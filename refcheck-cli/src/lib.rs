//! Fixture loading and reporting for the `refcheck` binary.
//!
//! A fixture is one JSON file holding schema definitions, the records to seed
//! the backend with, and the documents to validate:
//!
//! ```json
//! {
//!   "schemas": [{ "name": "Car", "fields": [{ "name": "manufacturer", "ref": "Manufacturer" }] }],
//!   "collections": ["Manufacturer"],
//!   "records": { "Manufacturer": [{ "_id": "m1", "name": "Car Maker" }] },
//!   "options": { "message": "{PATH} ID is bad" },
//!   "documents": [{ "schema": "Car", "data": { "manufacturer": "m1" } }]
//! }
//! ```

use anyhow::{Context, Result, bail};
use refcheck_model::{Record, RefTarget, SchemaDefinition, build_schemas};
use refcheck_storage::{Connection, DuckDbStore, MemoryStore};
use refcheck_validator::{FieldErrors, IdValidator, ValidationError, ValidatorOptions};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Contents of a fixture file.
#[derive(Debug, Deserialize)]
pub struct Fixture {
    pub schemas: Vec<SchemaDefinition>,
    /// Collections to declare even when no record is seeded into them.
    #[serde(default)]
    pub collections: Vec<String>,
    #[serde(default)]
    pub records: BTreeMap<String, Vec<Value>>,
    #[serde(default)]
    pub options: ValidatorOptions,
    #[serde(default)]
    pub documents: Vec<FixtureDocument>,
}

/// A document to validate against one of the fixture's schemas.
#[derive(Debug, Deserialize)]
pub struct FixtureDocument {
    pub schema: String,
    pub data: Value,
}

impl Fixture {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("invalid fixture")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read fixture {}", path.display()))?;
        Self::from_json(&json).with_context(|| format!("in {}", path.display()))
    }

    fn collection_names(&self) -> BTreeSet<&str> {
        self.collections
            .iter()
            .map(String::as_str)
            .chain(self.records.keys().map(String::as_str))
            .collect()
    }

    /// Seeds a fresh in-memory store.
    pub fn seed_memory(&self) -> Result<Arc<MemoryStore>> {
        let store = Arc::new(MemoryStore::new());
        for name in self.collection_names() {
            store.create_collection(name);
        }
        for (collection, records) in &self.records {
            for data in records {
                store
                    .save(&mut Record::new(collection.as_str(), data.clone()))
                    .with_context(|| format!("failed to seed {collection}"))?;
            }
        }
        Ok(store)
    }

    /// Seeds a DuckDB store, on disk when `path` is given.
    pub fn seed_duckdb(&self, path: Option<&Path>) -> Result<Arc<DuckDbStore>> {
        let store = match path {
            Some(path) => DuckDbStore::open(path)
                .with_context(|| format!("failed to open {}", path.display()))?,
            None => DuckDbStore::open_in_memory()?,
        };
        for name in self.collection_names() {
            store.create_collection(name)?;
        }
        for (collection, records) in &self.records {
            for data in records {
                store
                    .save(&mut Record::new(collection.as_str(), data.clone()))
                    .with_context(|| format!("failed to seed {collection}"))?;
            }
        }
        Ok(Arc::new(store))
    }
}

/// Validation result of one fixture document.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DocumentStatus {
    Valid,
    Invalid { errors: FieldErrors },
    Error { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentReport {
    pub index: usize,
    pub schema: String,
    pub id: Option<String>,
    #[serde(flatten)]
    pub status: DocumentStatus,
}

/// Results for every document of a fixture, in fixture order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Report {
    pub documents: Vec<DocumentReport>,
}

impl Report {
    /// True when any document is invalid or could not be checked.
    pub fn failed(&self) -> bool {
        self.documents
            .iter()
            .any(|d| d.status != DocumentStatus::Valid)
    }

    pub fn valid_count(&self) -> usize {
        self.documents
            .iter()
            .filter(|d| d.status == DocumentStatus::Valid)
            .count()
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for doc in &self.documents {
            let id = doc.id.as_deref().unwrap_or("-");
            match &doc.status {
                DocumentStatus::Valid => writeln!(f, "#{} {} {}: ok", doc.index, doc.schema, id)?,
                DocumentStatus::Invalid { errors } => {
                    writeln!(f, "#{} {} {}: invalid", doc.index, doc.schema, id)?;
                    for error in errors.iter() {
                        writeln!(f, "    {}", error.message)?;
                    }
                }
                DocumentStatus::Error { reason } => {
                    writeln!(f, "#{} {} {}: error: {}", doc.index, doc.schema, id, reason)?
                }
            }
        }
        write!(
            f,
            "{}/{} document(s) valid",
            self.valid_count(),
            self.documents.len()
        )
    }
}

/// Validates every fixture document against `connection`.
///
/// Unknown schema names in documents are fixture errors. Backend and
/// configuration errors are reported per document.
pub async fn run(
    fixture: &Fixture,
    connection: Connection,
    options: ValidatorOptions,
) -> Result<Report> {
    let schemas = build_schemas(&fixture.schemas).context("invalid schema definitions")?;
    let options = options.with_connection(Arc::clone(&connection));
    let validator = IdValidator::new();
    let registered: BTreeMap<&str, _> = schemas
        .iter()
        .map(|(name, schema)| (name.as_str(), validator.register(schema, options.clone())))
        .collect();

    let mut targets = BTreeSet::new();
    for schema in registered.values() {
        for descriptor in schema.descriptors() {
            if let RefTarget::Fixed(collection) = &descriptor.target {
                targets.insert(collection.as_str());
            }
        }
    }
    for collection in targets {
        if !connection.has_collection(collection).await? {
            warn!("collection {} is referenced but not declared", collection);
        }
    }

    let mut report = Report::default();
    for (index, doc) in fixture.documents.iter().enumerate() {
        let Some(schema) = registered.get(doc.schema.as_str()) else {
            bail!("document #{index}: unknown schema {}", doc.schema);
        };
        let record = Record::new(doc.schema.as_str(), doc.data.clone());
        let status = match schema.validate(&record).await {
            Ok(()) => DocumentStatus::Valid,
            Err(ValidationError::Invalid(errors)) => DocumentStatus::Invalid { errors },
            Err(e) => DocumentStatus::Error {
                reason: e.to_string(),
            },
        };
        debug!("document #{} ({}): {:?}", index, doc.schema, status);
        report.documents.push(DocumentReport {
            index,
            schema: doc.schema.clone(),
            id: record.id().map(|id| id.to_string()),
            status,
        });
    }

    info!(
        "{} of {} document(s) valid",
        report.valid_count(),
        report.documents.len()
    );
    Ok(report)
}
