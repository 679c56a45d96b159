//! Unit tests for output-schema staging.

use serde_json::json;

use codex_exec_bridge::exec::schema::OutputSchemaFile;
use codex_exec_bridge::AppError;

#[test]
fn object_schema_is_written_verbatim() {
    let schema = json!({
        "type": "object",
        "properties": { "summary": { "type": "string" } },
        "required": ["summary"],
    });

    let staged = OutputSchemaFile::stage(&schema).expect("schema stages");
    assert!(staged.path().is_file());
    assert_eq!(
        staged.path().file_name().and_then(|name| name.to_str()),
        Some("schema.json")
    );

    let raw = std::fs::read_to_string(staged.path()).expect("read staged schema");
    let parsed: serde_json::Value = serde_json::from_str(&raw).expect("staged JSON parses");
    assert_eq!(parsed, schema);
}

#[test]
fn staged_dir_uses_recognisable_prefix() {
    let staged = OutputSchemaFile::stage(&json!({})).expect("schema stages");
    let dir_name = staged
        .path()
        .parent()
        .and_then(|dir| dir.file_name())
        .and_then(|name| name.to_str())
        .expect("parent dir name");
    assert!(dir_name.starts_with("codex-output-schema-"), "got {dir_name}");
}

#[test]
fn non_object_schema_is_rejected() {
    for schema in [json!([1, 2]), json!("string"), json!(null), json!(42)] {
        let err = OutputSchemaFile::stage(&schema).expect_err("non-object schema");
        assert!(matches!(err, AppError::Schema(_)), "got {err:?}");
        assert_eq!(err.to_string(), "schema: output schema must be a JSON object");
    }
}

#[test]
fn cleanup_removes_file_and_directory() {
    let staged = OutputSchemaFile::stage(&json!({"type": "object"})).expect("schema stages");
    let file = staged.path().to_path_buf();
    let dir = file.parent().expect("parent").to_path_buf();

    staged.cleanup().expect("cleanup succeeds");
    assert!(!file.exists());
    assert!(!dir.exists());
}

#[test]
fn drop_removes_file() {
    let staged = OutputSchemaFile::stage(&json!({"type": "object"})).expect("schema stages");
    let file = staged.path().to_path_buf();

    drop(staged);
    assert!(!file.exists());
}

#[test]
fn concurrent_stages_do_not_collide() {
    let a = OutputSchemaFile::stage(&json!({"a": 1})).expect("first");
    let b = OutputSchemaFile::stage(&json!({"b": 2})).expect("second");
    assert_ne!(a.path(), b.path());
}
