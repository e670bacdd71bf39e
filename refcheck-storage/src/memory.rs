//! In-memory store.
//!
//! Collections are maps from record id to JSON. Sessions stage puts and
//! removals that only become visible to other readers on [`MemoryStore::commit`].

use async_trait::async_trait;
use refcheck_model::{Document, Record};
use refcheck_types::{ID_FIELD, RecordId, RefValue, SessionId};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

use crate::backend::Backend;
use crate::error::{StorageError, StorageResult};
use crate::filter::Filter;

type Collection = BTreeMap<RecordId, Value>;

#[derive(Default)]
struct State {
    collections: BTreeMap<String, Collection>,
    sessions: HashMap<SessionId, Staged>,
}

#[derive(Default)]
struct Staged {
    puts: BTreeMap<String, Collection>,
    removals: BTreeMap<String, BTreeSet<RecordId>>,
}

impl Staged {
    /// `Some(Some(record))` when staged, `Some(None)` when staged for removal,
    /// `None` when the session did not touch the record.
    fn lookup(&self, collection: &str, id: &RecordId) -> Option<Option<&Value>> {
        if let Some(record) = self.puts.get(collection).and_then(|c| c.get(id)) {
            return Some(Some(record));
        }
        if self.removals.get(collection).is_some_and(|r| r.contains(id)) {
            return Some(None);
        }
        None
    }
}

/// A thread-safe in-memory store.
///
/// Besides implementing [`Backend`], it counts the queries it serves and can be
/// switched offline, which makes it the store of choice for tests.
pub struct MemoryStore {
    name: String,
    state: RwLock<State>,
    queries: AtomicU64,
    offline: AtomicBool,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::named("memory")
    }

    /// Creates an empty store with a name used in logs.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: RwLock::new(State::default()),
            queries: AtomicU64::new(0),
            offline: AtomicBool::new(false),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, State> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, State> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Declares a collection. Existing collections are left untouched.
    pub fn create_collection(&self, name: &str) {
        self.write().collections.entry(name.to_string()).or_default();
    }

    /// Inserts or replaces a record, creating the collection if needed.
    pub fn put(&self, collection: &str, record: Value) -> StorageResult<RecordId> {
        let id = record_id(&record)?;
        self.write()
            .collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.clone(), record);
        Ok(id)
    }

    /// Removes a record. Returns whether it existed.
    pub fn remove(&self, collection: &str, id: &RecordId) -> bool {
        self.write()
            .collections
            .get_mut(collection)
            .is_some_and(|c| c.remove(id).is_some())
    }

    /// Removes every record of a collection, keeping the collection.
    pub fn clear(&self, collection: &str) {
        if let Some(c) = self.write().collections.get_mut(collection) {
            c.clear();
        }
    }

    /// Number of committed records in a collection.
    pub fn len(&self, collection: &str) -> usize {
        self.read().collections.get(collection).map_or(0, |c| c.len())
    }

    /// Saves a record into its collection (through its session, if bound) and
    /// marks it persisted.
    pub fn save(&self, record: &mut Record) -> StorageResult<RecordId> {
        let id = match record.session() {
            Some(session) => self.put_in(session, &record.collection, record.data.clone())?,
            None => self.put(&record.collection, record.data.clone())?,
        };
        record.mark_persisted();
        Ok(id)
    }

    /// Opens a session.
    pub fn begin_session(&self) -> SessionId {
        let session = SessionId::new();
        self.write().sessions.insert(session, Staged::default());
        debug!("{}: began session {}", self.name, session);
        session
    }

    /// Stages a put inside a session. The collection itself is created
    /// immediately.
    pub fn put_in(
        &self,
        session: SessionId,
        collection: &str,
        record: Value,
    ) -> StorageResult<RecordId> {
        let id = record_id(&record)?;
        let mut state = self.write();
        state.collections.entry(collection.to_string()).or_default();
        let staged = state
            .sessions
            .get_mut(&session)
            .ok_or(StorageError::UnknownSession(session))?;
        if let Some(removals) = staged.removals.get_mut(collection) {
            removals.remove(&id);
        }
        staged
            .puts
            .entry(collection.to_string())
            .or_default()
            .insert(id.clone(), record);
        Ok(id)
    }

    /// Stages a removal inside a session.
    pub fn remove_in(
        &self,
        session: SessionId,
        collection: &str,
        id: &RecordId,
    ) -> StorageResult<()> {
        let mut state = self.write();
        let staged = state
            .sessions
            .get_mut(&session)
            .ok_or(StorageError::UnknownSession(session))?;
        if let Some(puts) = staged.puts.get_mut(collection) {
            puts.remove(id);
        }
        staged
            .removals
            .entry(collection.to_string())
            .or_default()
            .insert(id.clone());
        Ok(())
    }

    /// Applies a session's staged writes and closes it.
    pub fn commit(&self, session: SessionId) -> StorageResult<()> {
        let mut state = self.write();
        let staged = state
            .sessions
            .remove(&session)
            .ok_or(StorageError::UnknownSession(session))?;
        for (collection, ids) in staged.removals {
            if let Some(c) = state.collections.get_mut(&collection) {
                for id in ids {
                    c.remove(&id);
                }
            }
        }
        for (collection, records) in staged.puts {
            state
                .collections
                .entry(collection)
                .or_default()
                .extend(records);
        }
        debug!("{}: committed session {}", self.name, session);
        Ok(())
    }

    /// Discards a session's staged writes and closes it.
    pub fn abort(&self, session: SessionId) -> StorageResult<()> {
        self.write()
            .sessions
            .remove(&session)
            .map(|_| debug!("{}: aborted session {}", self.name, session))
            .ok_or(StorageError::UnknownSession(session))
    }

    /// Number of count queries received so far.
    pub fn query_count(&self) -> u64 {
        self.queries.load(Ordering::SeqCst)
    }

    pub fn reset_query_count(&self) {
        self.queries.store(0, Ordering::SeqCst);
    }

    /// While offline every count fails with [`StorageError::Unavailable`].
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }
}

#[async_trait]
impl Backend for MemoryStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn has_collection(&self, collection: &str) -> StorageResult<bool> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable(self.name.clone()));
        }
        Ok(self.read().collections.contains_key(collection))
    }

    async fn count(
        &self,
        collection: &str,
        filter: &Filter,
        session: Option<SessionId>,
    ) -> StorageResult<u64> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        if self.offline.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable(self.name.clone()));
        }
        filter.validate()?;

        let state = self.read();
        let committed = state
            .collections
            .get(collection)
            .ok_or_else(|| StorageError::UnknownCollection(collection.to_string()))?;
        let staged = match session {
            Some(s) => Some(
                state
                    .sessions
                    .get(&s)
                    .ok_or(StorageError::UnknownSession(s))?,
            ),
            None => None,
        };

        let count = filter
            .distinct_ids()
            .into_iter()
            .filter_map(|id| match staged.and_then(|s| s.lookup(collection, id)) {
                Some(visible) => visible,
                None => committed.get(id),
            })
            .filter(|record| filter.matches_conditions(record))
            .count();
        Ok(count as u64)
    }
}

fn record_id(record: &Value) -> StorageResult<RecordId> {
    if !record.is_object() {
        return Err(StorageError::InvalidRecord(format!("not an object: {record}")));
    }
    match RefValue::classify(record.get(ID_FIELD)) {
        RefValue::Id(id) => Ok(id),
        _ => Err(StorageError::InvalidRecord(format!("missing or unusable {ID_FIELD}"))),
    }
}
