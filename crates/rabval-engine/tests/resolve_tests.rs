#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use rabval_core::errors::ExErrorKind;
use rabval_core::model::Category;
use rabval_engine::{
    load_ignore_list, load_usage, read_definitions, resolve_definitions, write_definitions,
};
use std::fs;
use tempfile::TempDir;

#[tokio::test]
async fn test_resolve_reads_files() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("defs.json");
    fs::write(&path, common::topology_json().to_string()).unwrap();

    let defs = resolve_definitions(path.to_str().unwrap()).await.unwrap();
    assert_eq!(defs, common::topology());
}

#[tokio::test]
async fn test_existing_path_with_at_sign_is_a_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("ops@prod.json");
    fs::write(&path, r#"{ "vhosts": [{ "name": "/" }] }"#).unwrap();

    let defs = resolve_definitions(path.to_str().unwrap()).await.unwrap();
    assert_eq!(defs.vhosts.len(), 1);
}

#[tokio::test]
async fn test_invalid_broker_url_is_a_config_error() {
    let err = resolve_definitions("http://").await.unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::InvalidConfig);
}

#[test]
fn test_write_then_read_keeps_unknown_fields() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("out.json");
    let mut defs = common::topology();
    defs.extra
        .insert("explicit_metadata".to_string(), serde_json::json!({ "owner": "ops" }));

    write_definitions(&path, &defs).unwrap();
    assert_eq!(read_definitions(&path).unwrap(), defs);
    assert!(fs::read_to_string(&path).unwrap().ends_with("}\n"));
}

#[test]
fn test_missing_file_is_io_error_naming_the_path() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("absent.json");
    let err = read_definitions(&path).unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::Io);
    assert!(err.message().contains("absent.json"));
}

#[test]
fn test_invalid_document_is_structural() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bad.json");
    fs::write(&path, r#"{ "queues": "nope" }"#).unwrap();
    let err = read_definitions(&path).unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::StructuralError);
}

#[test]
fn test_load_usage_records() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("usage.json");
    fs::write(
        &path,
        r#"[{ "vhost": "/", "queue": "orders" }, { "vhost": "/", "exchange": "events" }]"#,
    )
    .unwrap();

    let usage = load_usage(&path).unwrap();
    assert_eq!(usage.len(), 2);
    assert_eq!(usage[0].queue.as_deref(), Some("orders"));
    assert_eq!(usage[1].exchange.as_deref(), Some("events"));
}

#[test]
fn test_load_usage_rejects_non_array() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("usage.json");
    fs::write(&path, r#"{ "vhost": "/" }"#).unwrap();
    assert_eq!(
        load_usage(&path).unwrap_err().kind(),
        ExErrorKind::Serialization
    );
}

#[test]
fn test_load_ignore_list() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("ignore.json");
    fs::write(
        &path,
        r#"[{ "category": "queues", "contains": "amq.gen-" }, { "category": "users" }]"#,
    )
    .unwrap();

    let ignore = load_ignore_list(&path).unwrap();
    assert_eq!(ignore.len(), 2);
    assert!(ignore.is_ignored(Category::Queues, "Q[amq.gen-123 @ /]"));
    assert!(ignore.is_ignored(Category::Users, "U[guest]"));
    assert!(!ignore.is_ignored(Category::Queues, "Q[orders @ /]"));
}
