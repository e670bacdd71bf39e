use refcheck_model::{Condition, Conditions, Document, FieldDef, RefTarget, Schema};
use refcheck_types::FieldPath;
use serde_json::json;
use std::sync::Arc;

// ── FieldDef constructors ────────────────────────────────────────

#[test]
fn plain_field_has_no_annotations() {
    let f = FieldDef::plain("name");
    assert!(!f.array);
    assert!(!f.is_reference());
    assert!(f.embedded.is_none());
}

#[test]
fn reference_field_targets_collection() {
    let f = FieldDef::reference("manufacturer", "Manufacturer");
    assert!(!f.array);
    let reference = f.reference.unwrap();
    assert_eq!(reference.target, RefTarget::Fixed("Manufacturer".into()));
    assert!(reference.conditions.is_empty());
}

#[test]
fn reference_array_is_array_typed() {
    let f = FieldDef::reference_array("colours", "Colour");
    assert!(f.array);
    assert!(f.is_reference());
}

#[test]
fn dynamic_reference_targets_path() {
    let f = FieldDef::dynamic_reference("item", FieldPath::field("kind"));
    assert_eq!(
        f.reference.unwrap().target,
        RefTarget::Dynamic(FieldPath::field("kind"))
    );
}

#[test]
fn with_condition_attaches_to_reference() {
    let f = FieldDef::reference("bestMaleFriend", "Person")
        .with_condition("gender", Condition::literal("m"));
    assert_eq!(f.reference.unwrap().conditions.len(), 1);
}

#[test]
fn with_condition_ignored_on_plain_field() {
    let f = FieldDef::plain("name").with_condition("gender", Condition::literal("m"));
    assert!(f.reference.is_none());
}

#[test]
fn embedded_field_shares_schema() {
    let contact = Schema::new("Contact", vec![FieldDef::reference("contactId", "Contact")]);
    let f = FieldDef::embedded_array("contacts", &contact);
    assert!(f.array);
    assert!(Arc::ptr_eq(f.embedded.as_ref().unwrap(), &contact));
}

// ── Schema ───────────────────────────────────────────────────────

#[test]
fn schema_add_and_lookup() {
    let schema = Schema::empty("Tasks");
    schema.add(FieldDef::plain("title"));
    assert_eq!(schema.name(), "Tasks");
    assert_eq!(schema.fields().len(), 1);
    assert!(schema.field("title").is_some());
    assert!(schema.field("missing").is_none());
}

#[test]
fn self_embedding_schema_debug_terminates() {
    let tasks = Schema::empty("Tasks");
    tasks.add(FieldDef::plain("title"));
    tasks.add(FieldDef::embedded_array("subtasks", &tasks));
    let rendered = format!("{tasks:?}");
    assert!(rendered.contains("subtasks"));
    assert!(rendered.contains("Some(\"Tasks\")"));
}

// ── Conditions ───────────────────────────────────────────────────

#[test]
fn computed_condition_reads_document() {
    let condition = Condition::computed(|doc| {
        let female = doc
            .get(&FieldPath::field("mustBeFemale"))
            .and_then(|v| v.as_bool())
            .unwrap_or(false);
        serde_json::Value::from(if female { "f" } else { "m" })
    });
    let Condition::Computed(rule) = condition else {
        panic!("expected computed condition");
    };
    assert_eq!(rule(&json!({"mustBeFemale": true}) as &dyn Document), json!("f"));
    assert_eq!(rule(&json!({}) as &dyn Document), json!("m"));
}

#[test]
fn from_field_condition_copies_value() {
    let Condition::Computed(rule) = Condition::from_field(FieldPath::field("owner")) else {
        panic!("expected computed condition");
    };
    assert_eq!(rule(&json!({"owner": "u1"}) as &dyn Document), json!("u1"));
    assert_eq!(rule(&json!({}) as &dyn Document), json!(null));
}

#[test]
fn conditions_collect_and_iterate_in_key_order() {
    let conditions: Conditions = [
        ("b", Condition::literal(2)),
        ("a", Condition::literal(1)),
    ]
    .into_iter()
    .collect();
    let keys: Vec<&str> = conditions.iter().map(|(k, _)| k).collect();
    assert_eq!(keys, vec!["a", "b"]);
    assert!(format!("{:?}", Condition::from_field(FieldPath::field("x"))).contains("Computed"));
}

#[test]
fn document_trait_is_object_safe() {
    let doc: Box<dyn Document> = Box::new(json!({"a": 1}));
    assert_eq!(doc.get(&FieldPath::field("a")), Some(&json!(1)));
}
