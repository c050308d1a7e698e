//! Identifier charset check
//!
//! Identity keys are only unambiguous over a restricted charset, so every
//! name that feeds a key is held to it. Literal exceptions come from
//! [`RabvalConfig::string_allow_list`](crate::config::RabvalConfig).

use crate::failure::{CheckMode, Failure, FailureCollector, FailureKind, Halt};
use crate::model::Definitions;
use regex::Regex;
use std::sync::OnceLock;

const IDENTIFIER_PATTERN: &str = r"^[a-zA-Z0-9:_./\-*#]+$";

fn identifier_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(IDENTIFIER_PATTERN).ok()).as_ref()
}

/// True when `value` may appear in an identity key
pub fn is_identifier(value: &str, allow: &[String]) -> bool {
    value.is_empty()
        || identifier_regex().is_some_and(|re| re.is_match(value))
        || allow.iter().any(|a| a == value)
}

/// Render non-printable characters as `<0x..>` code points
pub fn printable(value: &str) -> String {
    value
        .chars()
        .map(|ch| {
            if ch.is_ascii_graphic() || ch == ' ' {
                ch.to_string()
            } else {
                format!("<0x{:x}>", ch as u32)
            }
        })
        .collect()
}

/// Check every key-forming name in `defs`
pub fn check_names(defs: &Definitions, allow: &[String], mode: CheckMode) -> Vec<Failure> {
    let mut collector = FailureCollector::new(mode);
    let _ = run_checks(defs, allow, &mut collector);
    collector.into_failures()
}

fn run_checks(
    defs: &Definitions,
    allow: &[String],
    assert: &mut FailureCollector,
) -> Result<(), Halt> {
    let mut check = |section: &str, idx: usize, field: &str, value: &str| {
        assert.ensure(is_identifier(value, allow), || {
            Failure::new(
                FailureKind::Structural,
                format!(
                    "A string with unexpected characters: \"{}\" printed as \"{}\"",
                    printable(value),
                    value
                ),
            )
            .at(vec![section.to_string(), idx.to_string(), field.to_string()])
        })
    };

    for (i, r) in defs.vhosts.iter().enumerate() {
        check("vhosts", i, "name", &r.name)?;
    }
    for (i, r) in defs.users.iter().enumerate() {
        check("users", i, "name", &r.name)?;
    }
    for (i, r) in defs.queues.iter().enumerate() {
        check("queues", i, "name", &r.name)?;
        check("queues", i, "vhost", &r.vhost)?;
    }
    for (i, r) in defs.exchanges.iter().enumerate() {
        check("exchanges", i, "name", &r.name)?;
        check("exchanges", i, "vhost", &r.vhost)?;
    }
    for (i, r) in defs.bindings.iter().enumerate() {
        check("bindings", i, "vhost", &r.vhost)?;
        check("bindings", i, "source", &r.source)?;
        check("bindings", i, "destination", &r.destination)?;
    }
    for (i, r) in defs.permissions.iter().enumerate() {
        check("permissions", i, "user", &r.user)?;
        check("permissions", i, "vhost", &r.vhost)?;
    }
    for (i, r) in defs.topic_permissions.iter().enumerate() {
        check("topic_permissions", i, "user", &r.user)?;
        check("topic_permissions", i, "vhost", &r.vhost)?;
        check("topic_permissions", i, "exchange", &r.exchange)?;
    }
    for (i, r) in defs.policies.iter().enumerate() {
        check("policies", i, "vhost", &r.vhost)?;
        check("policies", i, "name", &r.name)?;
    }
    for (i, r) in defs.parameters.iter().enumerate() {
        check("parameters", i, "vhost", &r.vhost)?;
        check("parameters", i, "name", &r.name)?;
    }
    for (i, r) in defs.global_parameters.iter().enumerate() {
        check("global_parameters", i, "name", &r.name)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_identifier_charset() {
        assert!(is_identifier("amq.topic", &[]));
        assert!(is_identifier("orders/#", &[]));
        assert!(is_identifier("", &[]));
        assert!(!is_identifier("with space", &[]));
        assert!(is_identifier("with space", &["with space".to_string()]));
    }

    #[test]
    fn test_printable_escapes_control_characters() {
        assert_eq!(printable("a\u{7}b"), "a<0x7>b");
        assert_eq!(printable("plain"), "plain");
    }

    #[test]
    fn test_violation_carries_path() {
        let defs = Definitions::from_value(json!({
            "vhosts": [{ "name": "/" }],
            "queues": [{ "name": "bad\tname", "vhost": "/", "durable": true, "auto_delete": false }]
        }))
        .unwrap();
        let failures = check_names(&defs, &[], CheckMode::CollectAll);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].to_string().split(':').next(), Some("At queues.0.name"));
        assert!(failures[0].message.contains("bad<0x9>name"));
    }

    #[test]
    fn test_topic_permission_exchange_is_checked() {
        let defs = Definitions::from_value(json!({
            "topic_permissions": [
                { "user": "app", "vhost": "/", "exchange": "bad ex", "write": ".*", "read": ".*" }
            ]
        }))
        .unwrap();
        let failures = check_names(&defs, &[], CheckMode::CollectAll);
        assert_eq!(failures.len(), 1);
        assert!(failures[0].to_string().starts_with("At topic_permissions.0.exchange"));

        let allowed = check_names(&defs, &["bad ex".to_string()], CheckMode::CollectAll);
        assert!(allowed.is_empty());
    }

    #[test]
    fn test_allow_list_entries_match_literally() {
        let defs = Definitions::from_value(json!({ "vhosts": [{ "name": " padded " }] })).unwrap();
        assert_eq!(check_names(&defs, &["padded".to_string()], CheckMode::CollectAll).len(), 1);
        assert!(check_names(&defs, &[" padded ".to_string()], CheckMode::CollectAll).is_empty());
    }
}
