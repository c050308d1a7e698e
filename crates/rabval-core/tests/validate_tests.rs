#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::{full, full_json, full_usage};
use rabval_core::config::RabvalConfig;
use rabval_core::failure::{CheckMode, FailureKind};
use rabval_core::model::Definitions;
use rabval_core::relations::UsageRecord;
use rabval_core::validate::validate;
use serde_json::json;

#[test]
fn test_valid_document_passes_with_warnings() {
    let report = validate(&full(), None, &RabvalConfig::default(), CheckMode::CollectAll);
    assert!(report.is_ok(), "{}", report.failures);
    assert_eq!(report.warnings.len(), 1);
}

#[test]
fn test_failures_are_ordered_names_then_index() {
    let mut value = full_json();
    value["vhosts"].as_array_mut().unwrap().push(json!({ "name": "/" }));
    value["queues"][0]["name"] = json!("bad queue");
    let defs = Definitions::from_value(value).unwrap();

    let report = validate(&defs, None, &RabvalConfig::default(), CheckMode::CollectAll);
    let kinds: Vec<_> = report.failures.iter().map(|f| f.kind).collect();
    assert_eq!(kinds[0], FailureKind::Structural);
    assert!(kinds.contains(&FailureKind::DuplicateResource));

    let rendered = report.failures.to_string();
    assert!(rendered.starts_with("1. At queues.0.name: "));
    assert!(rendered.contains("\n2. "));
}

#[test]
fn test_allow_list_exempts_names() {
    let mut value = full_json();
    value["vhosts"][2]["name"] = json!("legacy vhost");
    let defs = Definitions::from_value(value).unwrap();

    let strict = validate(&defs, None, &RabvalConfig::default(), CheckMode::CollectAll);
    assert_eq!(strict.failures.len(), 1);

    let config = RabvalConfig {
        string_allow_list: vec!["legacy vhost".to_string()],
        ..RabvalConfig::default()
    };
    let relaxed = validate(&defs, None, &config, CheckMode::CollectAll);
    assert!(relaxed.is_ok());
}

#[test]
fn test_fail_fast_stops_after_names() {
    let mut value = full_json();
    value["queues"][0]["name"] = json!("bad queue");
    value["vhosts"].as_array_mut().unwrap().push(json!({ "name": "/" }));
    let defs = Definitions::from_value(value).unwrap();

    let report = validate(&defs, None, &RabvalConfig::default(), CheckMode::FailFast);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures.iter().next().unwrap().kind, FailureKind::Structural);
}

#[test]
fn test_usage_record_is_threaded_through() {
    let mut usage = full_usage();
    usage.retain(|r| r.vhost != "isolated");
    usage.push(UsageRecord {
        vhost: "isolated".to_string(),
        queue: None,
        exchange: None,
    });
    let report = validate(
        &full(),
        Some(&usage),
        &RabvalConfig::default(),
        CheckMode::CollectAll,
    );
    // One of two queues (above 0.3) and one of four exchanges (below) are unused.
    assert_eq!(report.failures.len(), 1);
    assert!(report.failures.to_string().contains("Unused queue: \"defect_queue\" in vhost \"isolated\""));
}
