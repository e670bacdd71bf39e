use refcheck_types::{FieldPath, ID_FIELD, RecordId, RefValue, SessionId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ModelResult;

/// Read access to a document being validated.
///
/// Only [`Document::root`] is required. Documents without change tracking
/// return `None` from [`Document::is_modified`], which callers must treat as
/// "modified".
pub trait Document: Send + Sync {
    /// The document's JSON body.
    fn root(&self) -> &Value;

    /// Value at `path`, if present.
    fn get(&self, path: &FieldPath) -> Option<&Value> {
        path.lookup(self.root())
    }

    /// Whether `path` differs from the last persisted state.
    fn is_modified(&self, path: &FieldPath) -> Option<bool> {
        let _ = path;
        None
    }

    /// Session (transaction) the document is bound to.
    fn session(&self) -> Option<SessionId> {
        None
    }
}

/// Plain JSON has no change tracking and no session.
impl Document for Value {
    fn root(&self) -> &Value {
        self
    }
}

/// A document belonging to a collection, with change tracking.
///
/// `data` holds arbitrary JSON whose `_id` member identifies the record.
/// `persisted` is the snapshot taken at load or last save; a record without a
/// snapshot is new and every path counts as modified.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
    pub collection: String,
    pub data: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    persisted: Option<Value>,
    #[serde(skip)]
    session: Option<SessionId>,
}

impl Record {
    /// Creates a new, unsaved record. An `_id` is generated when `data` is an
    /// object without one.
    pub fn new(collection: impl Into<String>, mut data: Value) -> Self {
        if let Value::Object(map) = &mut data {
            map.entry(ID_FIELD)
                .or_insert_with(|| RecordId::generate().to_value());
        }
        Self {
            collection: collection.into(),
            data,
            persisted: None,
            session: None,
        }
    }

    /// Wraps a record just read from storage.
    pub fn loaded(collection: impl Into<String>, data: Value) -> Self {
        Self {
            collection: collection.into(),
            persisted: Some(data.clone()),
            data,
            session: None,
        }
    }

    /// Binds the record to a session.
    #[must_use]
    pub fn with_session(mut self, session: SessionId) -> Self {
        self.session = Some(session);
        self
    }

    pub fn set_session(&mut self, session: Option<SessionId>) {
        self.session = session;
    }

    /// The record's identity, if `_id` holds a usable value.
    pub fn id(&self) -> Option<RecordId> {
        match RefValue::classify(self.data.get(ID_FIELD)) {
            RefValue::Id(id) => Some(id),
            _ => None,
        }
    }

    /// The raw `_id` value, for use as a reference in another document.
    pub fn id_value(&self) -> Value {
        self.data.get(ID_FIELD).cloned().unwrap_or(Value::Null)
    }

    /// True until the first [`Record::mark_persisted`].
    pub fn is_new(&self) -> bool {
        self.persisted.is_none()
    }

    /// Writes `value` at a dotted `path`.
    pub fn set(&mut self, path: &str, value: Value) -> ModelResult<()> {
        FieldPath::parse(path)?.set(&mut self.data, value)?;
        Ok(())
    }

    /// Records the current data as the persisted state.
    pub fn mark_persisted(&mut self) {
        self.persisted = Some(self.data.clone());
    }
}

impl Document for Record {
    fn root(&self) -> &Value {
        &self.data
    }

    fn is_modified(&self, path: &FieldPath) -> Option<bool> {
        Some(match &self.persisted {
            None => true,
            Some(snapshot) => path.lookup(&self.data) != path.lookup(snapshot),
        })
    }

    fn session(&self) -> Option<SessionId> {
        self.session
    }
}
