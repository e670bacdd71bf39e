use pretty_assertions::assert_eq;
use refcheck_cli::{DocumentStatus, Fixture, run};
use refcheck_storage::Connection;
use refcheck_validator::ValidatorOptions;
use serde_json::json;
use std::path::PathBuf;

fn cars_fixture() -> Fixture {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures/cars.json");
    Fixture::load(&path).unwrap()
}

fn statuses(report: &refcheck_cli::Report) -> Vec<&'static str> {
    report
        .documents
        .iter()
        .map(|d| match d.status {
            DocumentStatus::Valid => "valid",
            DocumentStatus::Invalid { .. } => "invalid",
            DocumentStatus::Error { .. } => "error",
        })
        .collect()
}

#[tokio::test]
async fn memory_backend_report() {
    let fixture = cars_fixture();
    let connection: Connection = fixture.seed_memory().unwrap();
    let report = run(&fixture, connection, fixture.options.clone()).await.unwrap();

    assert_eq!(statuses(&report), vec!["valid", "invalid", "invalid"]);
    assert!(report.failed());

    let DocumentStatus::Invalid { errors } = &report.documents[1].status else {
        panic!("expected invalid");
    };
    assert_eq!(errors.paths(), vec!["manufacturer", "colours"]);

    let DocumentStatus::Invalid { errors } = &report.documents[2].status else {
        panic!("expected invalid");
    };
    assert_eq!(
        errors.message("contacts.0.contactId"),
        Some("contacts.0.contactId references a non existing ID")
    );
}

#[tokio::test]
async fn duckdb_backend_agrees_with_memory() {
    let dir = tempfile::tempdir().unwrap();
    let fixture = cars_fixture();
    let connection: Connection = fixture
        .seed_duckdb(Some(&dir.path().join("refs.duckdb")))
        .unwrap();
    let report = run(&fixture, connection, fixture.options.clone()).await.unwrap();
    assert_eq!(statuses(&report), vec!["valid", "invalid", "invalid"]);
}

#[tokio::test]
async fn options_come_from_fixture_and_overrides() {
    let fixture = Fixture::from_json(
        &json!({
            "schemas": [{ "name": "Car", "fields": [
                { "name": "colours", "array": true, "ref": "Colour" }
            ]}],
            "records": { "Colour": [{ "_id": "red" }] },
            "options": { "message": "{PATH} ID is bad" },
            "documents": [{ "schema": "Car", "data": { "colours": ["red", "red", "blue"] } }]
        })
        .to_string(),
    )
    .unwrap();

    let connection: Connection = fixture.seed_memory().unwrap();
    let report = run(&fixture, connection, fixture.options.clone()).await.unwrap();
    let DocumentStatus::Invalid { errors } = &report.documents[0].status else {
        panic!("expected invalid");
    };
    assert_eq!(errors.message("colours"), Some("colours ID is bad"));

    let connection: Connection = fixture.seed_memory().unwrap();
    let lenient = fixture.options.clone().with_allow_duplicates(true);
    let report = run(&fixture, connection, lenient).await.unwrap();
    assert!(report.failed());

    let fixture = Fixture::from_json(
        &json!({
            "schemas": [{ "name": "Car", "fields": [
                { "name": "colours", "array": true, "ref": "Colour" }
            ]}],
            "records": { "Colour": [{ "_id": "red" }] },
            "documents": [{ "schema": "Car", "data": { "colours": ["red", "red"] } }]
        })
        .to_string(),
    )
    .unwrap();
    let connection: Connection = fixture.seed_memory().unwrap();
    let strict = run(&fixture, connection.clone(), ValidatorOptions::default()).await.unwrap();
    assert!(strict.failed());
    let lenient = ValidatorOptions::default().with_allow_duplicates(true);
    let report = run(&fixture, connection, lenient).await.unwrap();
    assert!(!report.failed());
}

#[tokio::test]
async fn unknown_collection_is_reported_as_error() {
    let fixture = Fixture::from_json(
        &json!({
            "schemas": [
                { "name": "Car", "fields": [{ "name": "manufacturer", "ref": "Manufacturer" }] }
            ],
            "documents": [{ "schema": "Car", "data": { "_id": "c1", "manufacturer": "m1" } }]
        })
        .to_string(),
    )
    .unwrap();
    let connection: Connection = fixture.seed_memory().unwrap();
    let report = run(&fixture, connection, ValidatorOptions::default()).await.unwrap();

    assert_eq!(statuses(&report), vec!["error"]);
    assert_eq!(report.documents[0].id.as_deref(), Some("c1"));
    let rendered = serde_json::to_value(&report).unwrap();
    assert_eq!(rendered["documents"][0]["status"], json!("error"));
}

#[tokio::test]
async fn unknown_document_schema_is_a_fixture_error() {
    let fixture = Fixture::from_json(
        &json!({
            "schemas": [],
            "documents": [{ "schema": "Ghost", "data": {} }]
        })
        .to_string(),
    )
    .unwrap();
    let connection: Connection = fixture.seed_memory().unwrap();
    assert!(run(&fixture, connection, ValidatorOptions::default()).await.is_err());
}

#[test]
fn report_renders_summary() {
    let fixture = cars_fixture();
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let connection: Connection = fixture.seed_memory().unwrap();
    let report = runtime
        .block_on(run(&fixture, connection, fixture.options.clone()))
        .unwrap();
    let text = report.to_string();
    assert!(text.contains("#0 Car"));
    assert!(text.contains("manufacturer references a non existing ID"));
    assert!(text.ends_with("1/3 document(s) valid"));
}

#[test]
fn missing_fixture_file_has_context() {
    let err = Fixture::load(std::path::Path::new("/nonexistent/fixture.json")).unwrap_err();
    assert!(format!("{err:#}").contains("failed to read fixture"));
}
