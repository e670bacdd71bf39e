use refcheck_model::Record;
use refcheck_storage::{Backend, Filter, MemoryStore, StorageError};
use refcheck_types::RecordId;
use serde_json::{Map, json};

fn store_with_people() -> MemoryStore {
    let store = MemoryStore::new();
    store.put("Person", json!({"_id": "jack", "gender": "m"})).unwrap();
    store.put("Person", json!({"_id": "jill", "gender": "f"})).unwrap();
    store.put("Person", json!({"_id": "ann", "gender": "f"})).unwrap();
    store
}

fn ids(list: &[&str]) -> Vec<RecordId> {
    list.iter().map(|s| RecordId::from(*s)).collect()
}

// ── Writes ────────────────────────────────────────────────────────

#[test]
fn put_requires_object_with_id() {
    let store = MemoryStore::new();
    assert!(matches!(store.put("X", json!("scalar")), Err(StorageError::InvalidRecord(_))));
    assert!(matches!(store.put("X", json!({"name": "x"})), Err(StorageError::InvalidRecord(_))));
}

#[test]
fn put_replaces_existing_record() {
    let store = MemoryStore::new();
    store.put("X", json!({"_id": "a", "v": 1})).unwrap();
    store.put("X", json!({"_id": "a", "v": 2})).unwrap();
    assert_eq!(store.len("X"), 1);
}

#[test]
fn save_marks_record_persisted() {
    let store = MemoryStore::new();
    let mut record = Record::new("Manufacturer", json!({"name": "Car Maker"}));
    let id = store.save(&mut record).unwrap();
    assert_eq!(Some(id), record.id());
    assert!(!record.is_new());
    assert_eq!(store.len("Manufacturer"), 1);
}

#[test]
fn remove_and_clear() {
    let store = store_with_people();
    assert!(store.remove("Person", &RecordId::from("jack")));
    assert!(!store.remove("Person", &RecordId::from("jack")));
    store.clear("Person");
    assert_eq!(store.len("Person"), 0);
}

// ── Counting ──────────────────────────────────────────────────────

#[tokio::test]
async fn count_by_identity() {
    let store = store_with_people();
    assert_eq!(store.count("Person", &Filter::id_eq("jack".into()), None).await.unwrap(), 1);
    assert_eq!(store.count("Person", &Filter::id_eq("nobody".into()), None).await.unwrap(), 0);
    assert_eq!(
        store.count("Person", &Filter::id_in(ids(&["jack", "jill", "zed"])), None).await.unwrap(),
        2
    );
}

#[tokio::test]
async fn integer_id_does_not_match_string_id() {
    let store = MemoryStore::new();
    store.put("Manufacturer", json!({"_id": "5"})).unwrap();
    let int = Filter::id_eq(RecordId::Int(5));
    assert_eq!(store.count("Manufacturer", &int, None).await.unwrap(), 0);
    let text = Filter::id_eq("5".into());
    assert_eq!(store.count("Manufacturer", &text, None).await.unwrap(), 1);
}

#[tokio::test]
async fn duplicate_ids_count_once() {
    let store = store_with_people();
    let filter = Filter::id_in(ids(&["jack", "jack"]));
    assert_eq!(store.count("Person", &filter, None).await.unwrap(), 1);
}

#[tokio::test]
async fn count_applies_conditions() {
    let store = store_with_people();
    let mut female = Map::new();
    female.insert("gender".into(), json!("f"));
    let filter = Filter::id_in(ids(&["jill", "jack", "ann"])).with_conditions(female);
    assert_eq!(store.count("Person", &filter, None).await.unwrap(), 2);
}

#[tokio::test]
async fn unknown_collection_is_an_error() {
    let store = MemoryStore::new();
    let err = store.count("Nope", &Filter::id_eq("a".into()), None).await.unwrap_err();
    assert!(matches!(err, StorageError::UnknownCollection(c) if c == "Nope"));
    assert!(!store.has_collection("Nope").await.unwrap());
    store.create_collection("Nope");
    assert!(store.has_collection("Nope").await.unwrap());
    assert_eq!(store.count("Nope", &Filter::id_eq("a".into()), None).await.unwrap(), 0);
}

#[tokio::test]
async fn offline_store_fails_and_counts_attempts() {
    let store = store_with_people();
    store.set_offline(true);
    let err = store.count("Person", &Filter::id_eq("jack".into()), None).await.unwrap_err();
    assert!(matches!(err, StorageError::Unavailable(_)));
    assert_eq!(store.query_count(), 1);

    store.set_offline(false);
    store.reset_query_count();
    assert_eq!(store.count("Person", &Filter::id_eq("jack".into()), None).await.unwrap(), 1);
    assert_eq!(store.query_count(), 1);
}

// ── Sessions ──────────────────────────────────────────────────────

#[tokio::test]
async fn session_sees_its_own_writes_only() {
    let store = store_with_people();
    let session = store.begin_session();
    store.put_in(session, "Person", json!({"_id": "bob", "gender": "m"})).unwrap();
    store.remove_in(session, "Person", &RecordId::from("jack")).unwrap();

    let bob = Filter::id_eq("bob".into());
    let jack = Filter::id_eq("jack".into());
    assert_eq!(store.count("Person", &bob, Some(session)).await.unwrap(), 1);
    assert_eq!(store.count("Person", &jack, Some(session)).await.unwrap(), 0);
    assert_eq!(store.count("Person", &bob, None).await.unwrap(), 0);
    assert_eq!(store.count("Person", &jack, None).await.unwrap(), 1);

    store.commit(session).unwrap();
    assert_eq!(store.count("Person", &bob, None).await.unwrap(), 1);
    assert_eq!(store.count("Person", &jack, None).await.unwrap(), 0);
}

#[tokio::test]
async fn aborted_session_leaves_no_trace() {
    let store = store_with_people();
    let session = store.begin_session();
    store.put_in(session, "Person", json!({"_id": "bob"})).unwrap();
    store.abort(session).unwrap();

    assert_eq!(store.count("Person", &Filter::id_eq("bob".into()), None).await.unwrap(), 0);
    let err = store.count("Person", &Filter::id_eq("bob".into()), Some(session)).await.unwrap_err();
    assert!(matches!(err, StorageError::UnknownSession(s) if s == session));
    assert!(store.commit(session).is_err());
}

#[test]
fn save_routes_through_record_session() {
    let store = MemoryStore::new();
    let session = store.begin_session();
    let mut record = Record::new("Contact", json!({"_id": "c1"})).with_session(session);
    store.save(&mut record).unwrap();
    assert_eq!(store.len("Contact"), 0);
    store.commit(session).unwrap();
    assert_eq!(store.len("Contact"), 1);
}
