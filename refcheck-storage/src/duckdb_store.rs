//! DuckDB-backed store.
//!
//! Records are kept as JSON text keyed by `(collection, id)`, where `id` is
//! the JSON text of the record id so `5` and `"5"` stay apart. Identity
//! selection runs in SQL; conditions are evaluated on the decoded rows so both
//! stores share one matching semantics. A session is a cloned connection with
//! an open transaction, which gives read-your-writes inside the session.

use async_trait::async_trait;
use duckdb::{Connection, params, params_from_iter};
use refcheck_model::{Document, Record};
use refcheck_types::{ID_FIELD, RecordId, RefValue, SessionId};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

use crate::backend::Backend;
use crate::error::{StorageError, StorageResult};
use crate::filter::Filter;

const SCHEMA_SQL: &str = "
    CREATE TABLE IF NOT EXISTS collections (
        name VARCHAR PRIMARY KEY
    );
    CREATE TABLE IF NOT EXISTS records (
        collection VARCHAR NOT NULL,
        id VARCHAR NOT NULL,
        data VARCHAR NOT NULL,
        PRIMARY KEY (collection, id)
    );
";

/// Persistent store on a DuckDB database.
///
/// DuckDB calls block, so backend queries run on the blocking thread pool.
pub struct DuckDbStore {
    name: String,
    inner: Arc<Inner>,
}

struct Inner {
    conn: Mutex<Connection>,
    sessions: Mutex<HashMap<SessionId, Connection>>,
}

impl Inner {
    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn sessions(&self) -> MutexGuard<'_, HashMap<SessionId, Connection>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs `f` on the session's connection, or the main one when `session` is `None`.
    fn with_conn<T>(
        &self,
        session: Option<SessionId>,
        f: impl FnOnce(&Connection) -> StorageResult<T>,
    ) -> StorageResult<T> {
        match session {
            Some(s) => {
                let sessions = self.sessions();
                let conn = sessions.get(&s).ok_or(StorageError::UnknownSession(s))?;
                f(conn)
            }
            None => f(&self.conn()),
        }
    }
}

impl DuckDbStore {
    /// Opens (or creates) a database file.
    pub fn open(path: &Path) -> StorageResult<Self> {
        let conn = open_with_wal_recovery(path)?;
        Self::init(conn, path.display().to_string())
    }

    /// Opens a private in-memory database.
    pub fn open_in_memory() -> StorageResult<Self> {
        Self::init(Connection::open_in_memory()?, "duckdb::memory".to_string())
    }

    fn init(conn: Connection, name: String) -> StorageResult<Self> {
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self {
            name,
            inner: Arc::new(Inner {
                conn: Mutex::new(conn),
                sessions: Mutex::new(HashMap::new()),
            }),
        })
    }

    fn with_conn<T>(
        &self,
        session: Option<SessionId>,
        f: impl FnOnce(&Connection) -> StorageResult<T>,
    ) -> StorageResult<T> {
        self.inner.with_conn(session, f)
    }

    /// Runs `f` against the store on the blocking pool.
    async fn run_blocking<T, F>(&self, session: Option<SessionId>, f: F) -> StorageResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> StorageResult<T> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || inner.with_conn(session, f))
            .await
            .map_err(|e| StorageError::Task(e.to_string()))?
    }

    /// Declares a collection. Existing collections are left untouched.
    pub fn create_collection(&self, name: &str) -> StorageResult<()> {
        create_collection_on(&self.inner.conn(), name)
    }

    /// Inserts or replaces a record, creating the collection if needed.
    pub fn put(&self, collection: &str, record: &Value) -> StorageResult<RecordId> {
        self.with_conn(None, |conn| put_on(conn, collection, record))
    }

    /// Removes a record. Returns whether it existed.
    pub fn remove(&self, collection: &str, id: &RecordId) -> StorageResult<bool> {
        self.with_conn(None, |conn| remove_on(conn, collection, id))
    }

    /// Saves a record into its collection (through its session, if bound) and
    /// marks it persisted.
    pub fn save(&self, record: &mut Record) -> StorageResult<RecordId> {
        let id = self.with_conn(record.session(), |conn| {
            put_on(conn, &record.collection, &record.data)
        })?;
        record.mark_persisted();
        Ok(id)
    }

    /// Opens a session: a new connection with an open transaction.
    pub fn begin_session(&self) -> StorageResult<SessionId> {
        let conn = self.inner.conn().try_clone()?;
        conn.execute_batch("BEGIN TRANSACTION")?;
        let session = SessionId::new();
        self.inner.sessions().insert(session, conn);
        debug!("{}: began session {}", self.name, session);
        Ok(session)
    }

    /// Writes a record inside a session.
    pub fn put_in(
        &self,
        session: SessionId,
        collection: &str,
        record: &Value,
    ) -> StorageResult<RecordId> {
        self.with_conn(Some(session), |conn| put_on(conn, collection, record))
    }

    /// Removes a record inside a session.
    pub fn remove_in(
        &self,
        session: SessionId,
        collection: &str,
        id: &RecordId,
    ) -> StorageResult<bool> {
        self.with_conn(Some(session), |conn| remove_on(conn, collection, id))
    }

    /// Commits a session's transaction and closes it.
    pub fn commit(&self, session: SessionId) -> StorageResult<()> {
        self.finish(session, "COMMIT")
    }

    /// Rolls back a session's transaction and closes it.
    pub fn abort(&self, session: SessionId) -> StorageResult<()> {
        self.finish(session, "ROLLBACK")
    }

    fn finish(&self, session: SessionId, statement: &str) -> StorageResult<()> {
        let conn = self
            .inner
            .sessions()
            .remove(&session)
            .ok_or(StorageError::UnknownSession(session))?;
        conn.execute_batch(statement)?;
        debug!("{}: {} session {}", self.name, statement, session);
        Ok(())
    }
}

#[async_trait]
impl Backend for DuckDbStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn has_collection(&self, collection: &str) -> StorageResult<bool> {
        let collection = collection.to_string();
        self.run_blocking(None, move |conn| collection_exists(conn, &collection))
            .await
    }

    async fn count(
        &self,
        collection: &str,
        filter: &Filter,
        session: Option<SessionId>,
    ) -> StorageResult<u64> {
        filter.validate()?;
        let collection = collection.to_string();
        let filter = filter.clone();
        self.run_blocking(session, move |conn| count_on(conn, &collection, &filter))
            .await
    }
}

/// Opens `path`, retrying once without its `.wal` file when the first open
/// fails. An unclean shutdown can leave a WAL that blocks reopening.
fn open_with_wal_recovery(path: &Path) -> StorageResult<Connection> {
    let first_err = match Connection::open(path) {
        Ok(conn) => return Ok(conn),
        Err(e) => e,
    };
    let wal = match path.extension() {
        Some(ext) => path.with_extension(format!("{}.wal", ext.to_string_lossy())),
        None => path.with_extension("wal"),
    };
    if !wal.exists() {
        return Err(first_err.into());
    }
    warn!("{}: open failed ({}), retrying without stale WAL", path.display(), first_err);
    std::fs::remove_file(&wal)?;
    Ok(Connection::open(path)?)
}

fn create_collection_on(conn: &Connection, name: &str) -> StorageResult<()> {
    conn.execute(
        "INSERT INTO collections (name) VALUES (?) ON CONFLICT DO NOTHING",
        params![name],
    )?;
    Ok(())
}

fn collection_exists(conn: &Connection, name: &str) -> StorageResult<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM collections WHERE name = ?",
        params![name],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

fn put_on(conn: &Connection, collection: &str, record: &Value) -> StorageResult<RecordId> {
    if !record.is_object() {
        return Err(StorageError::InvalidRecord(format!("not an object: {record}")));
    }
    let RefValue::Id(id) = RefValue::classify(record.get(ID_FIELD)) else {
        return Err(StorageError::InvalidRecord(format!("missing or unusable {ID_FIELD}")));
    };
    create_collection_on(conn, collection)?;
    conn.execute(
        "INSERT OR REPLACE INTO records (collection, id, data) VALUES (?, ?, ?)",
        params![collection, id.to_key(), serde_json::to_string(record)?],
    )?;
    Ok(id)
}

fn remove_on(conn: &Connection, collection: &str, id: &RecordId) -> StorageResult<bool> {
    let removed = conn.execute(
        "DELETE FROM records WHERE collection = ? AND id = ?",
        params![collection, id.to_key()],
    )?;
    Ok(removed > 0)
}

fn count_on(conn: &Connection, collection: &str, filter: &Filter) -> StorageResult<u64> {
    if !collection_exists(conn, collection)? {
        return Err(StorageError::UnknownCollection(collection.to_string()));
    }

    let ids = filter.distinct_ids();
    if ids.is_empty() {
        return Ok(0);
    }
    let placeholders = vec!["?"; ids.len()].join(", ");
    let sql = format!("SELECT data FROM records WHERE collection = ? AND id IN ({placeholders})");
    let values: Vec<String> = std::iter::once(collection.to_string())
        .chain(ids.iter().map(|id| id.to_key()))
        .collect();

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(values), |row| row.get::<_, String>(0))?;

    let mut count = 0u64;
    for row in rows {
        let record: Value = serde_json::from_str(&row?)?;
        if filter.matches_conditions(&record) {
            count += 1;
        }
    }
    Ok(count)
}
