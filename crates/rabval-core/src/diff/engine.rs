//! Diff computation
//!
//! Each category is compared independently on identity keys: a key only in
//! `before` is deleted, only in `after` is added, in both with unequal
//! content is changed. Ignored resources are dropped from both sides first.

use crate::diff::model::{Change, DefinitionsDiff};
use crate::errors::{RabvalError, Result};
use crate::ignore::IgnoreList;
use crate::key::Resource;
use crate::model::*;
use crate::{log_op_end, log_op_error, log_op_start};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Instant;

/// Compare two parsed documents
///
/// # Errors
///
/// `DuplicateResource` when either side holds two entries with one identity
/// in a category. No partial diff is returned.
pub fn compute_diff(
    before: &Definitions,
    after: &Definitions,
    ignore: &IgnoreList,
) -> Result<DefinitionsDiff> {
    let start = Instant::now();
    log_op_start!("diff", ignore_rules = ignore.len());

    match diff_all(before, after, ignore) {
        Ok(diff) => {
            log_op_end!(
                "diff",
                duration_ms = start.elapsed().as_millis() as u64,
                added = diff.added.len(),
                deleted = diff.deleted.len(),
                changed = diff.changed.len()
            );
            Ok(diff)
        }
        Err(err) => {
            log_op_error!(
                "diff",
                err.clone(),
                duration_ms = start.elapsed().as_millis() as u64
            );
            Err(err)
        }
    }
}

/// Parse both values as definitions documents, then compare them
///
/// # Errors
///
/// `StructuralError` when either value is not a definitions document, then
/// as [`compute_diff`].
pub fn compute_diff_values(
    before: &Value,
    after: &Value,
    ignore: &IgnoreList,
) -> Result<DefinitionsDiff> {
    let before = Definitions::from_value(before.clone())?;
    let after = Definitions::from_value(after.clone())?;
    compute_diff(&before, &after, ignore)
}

fn diff_all(
    before: &Definitions,
    after: &Definitions,
    ignore: &IgnoreList,
) -> Result<DefinitionsDiff> {
    let mut diff = DefinitionsDiff::default();
    diff_category::<Vhost>(before, after, ignore, &mut diff)?;
    diff_category::<User>(before, after, ignore, &mut diff)?;
    diff_category::<Queue>(before, after, ignore, &mut diff)?;
    diff_category::<Exchange>(before, after, ignore, &mut diff)?;
    diff_category::<Binding>(before, after, ignore, &mut diff)?;
    diff_category::<Permission>(before, after, ignore, &mut diff)?;
    diff_category::<TopicPermission>(before, after, ignore, &mut diff)?;
    diff_category::<Policy>(before, after, ignore, &mut diff)?;
    diff_category::<Parameter>(before, after, ignore, &mut diff)?;
    diff_category::<GlobalParameter>(before, after, ignore, &mut diff)?;
    Ok(diff)
}

/// Entries of one category that survive the ignore list, keyed by identity
///
/// The returned list keeps document order.
fn keyed<'d, T: Resource>(
    entries: &'d [T],
    ignore: &IgnoreList,
) -> Result<(Vec<(String, &'d T)>, HashMap<String, &'d T>)> {
    let mut ordered = Vec::with_capacity(entries.len());
    let mut by_key = HashMap::with_capacity(entries.len());
    for entry in entries {
        let id = entry.identity();
        if ignore.is_ignored(T::CATEGORY, &id) {
            continue;
        }
        if by_key.insert(id.clone(), entry).is_some() {
            return Err(RabvalError::DuplicateIdentity {
                category: T::CATEGORY,
                identity: id,
            }
            .into());
        }
        ordered.push((id, entry));
    }
    Ok((ordered, by_key))
}

fn diff_category<T: Resource>(
    before: &Definitions,
    after: &Definitions,
    ignore: &IgnoreList,
    diff: &mut DefinitionsDiff,
) -> Result<()> {
    let (before_entries, before_keys) = keyed(T::section(before), ignore)?;
    let (after_entries, after_keys) = keyed(T::section(after), ignore)?;

    for (id, old) in &before_entries {
        match after_keys.get(id) {
            None => T::in_set_mut(&mut diff.deleted).push((*old).clone()),
            Some(new) if *new != *old => T::in_changes_mut(&mut diff.changed).push(Change {
                before: (*old).clone(),
                after: (*new).clone(),
            }),
            Some(_) => {}
        }
    }
    for (id, new) in &after_entries {
        if !before_keys.contains_key(id) {
            T::in_set_mut(&mut diff.added).push((*new).clone());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ExErrorKind;
    use crate::ignore::IgnoreRule;
    use serde_json::json;

    fn doc(queues: Value) -> Definitions {
        Definitions::from_value(json!({ "vhosts": [{ "name": "/" }], "queues": queues })).unwrap()
    }

    #[test]
    fn test_added_deleted_changed() {
        let before = doc(json!([
            { "name": "a", "vhost": "/", "durable": true, "auto_delete": false },
            { "name": "b", "vhost": "/", "durable": true, "auto_delete": false }
        ]));
        let after = doc(json!([
            { "name": "b", "vhost": "/", "durable": false, "auto_delete": false },
            { "name": "c", "vhost": "/", "durable": true, "auto_delete": false }
        ]));
        let diff = compute_diff(&before, &after, &IgnoreList::default()).unwrap();
        assert_eq!(diff.deleted.queues[0].name, "a");
        assert_eq!(diff.added.queues[0].name, "c");
        assert_eq!(diff.changed.queues[0].identity(), "Q[b @ /]");
        assert!(diff.added.vhosts.is_empty());
    }

    #[test]
    fn test_argument_map_order_is_not_a_change() {
        let before = doc(json!([{ "name": "a", "vhost": "/", "durable": true, "auto_delete": false,
            "arguments": { "x-queue-type": "quorum", "x-max-length": 10 } }]));
        let after = doc(json!([{ "name": "a", "vhost": "/", "durable": true, "auto_delete": false,
            "arguments": { "x-max-length": 10, "x-queue-type": "quorum" } }]));
        assert!(compute_diff(&before, &after, &IgnoreList::default())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_list_order_is_a_change() {
        let users = |tags: Value| {
            Definitions::from_value(json!({
                "users": [{ "name": "u", "password_hash": "h", "tags": tags }]
            }))
            .unwrap()
        };
        let diff = compute_diff(
            &users(json!(["administrator", "monitoring"])),
            &users(json!(["monitoring", "administrator"])),
            &IgnoreList::default(),
        )
        .unwrap();
        assert_eq!(diff.changed.users.len(), 1);
    }

    #[test]
    fn test_duplicate_identity_refuses_diff() {
        let before = doc(json!([
            { "name": "a", "vhost": "/", "durable": true, "auto_delete": false },
            { "name": "a", "vhost": "/", "durable": false, "auto_delete": false }
        ]));
        let err = compute_diff(&before, &doc(json!([])), &IgnoreList::default()).unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::DuplicateResource);
        assert_eq!(err.category(), Some(Category::Queues));
    }

    #[test]
    fn test_ignored_resources_are_invisible() {
        let before = doc(json!([{ "name": "tmp.1", "vhost": "/", "durable": true, "auto_delete": false }]));
        let ignore = IgnoreList::new(vec![IgnoreRule::containing(Some(Category::Queues), "tmp.")]);
        let diff = compute_diff(&before, &doc(json!([])), &ignore).unwrap();
        assert!(diff.is_empty());
    }

    #[test]
    fn test_structurally_invalid_value_is_refused() {
        let err = compute_diff_values(&json!({ "queues": 3 }), &json!({}), &IgnoreList::default())
            .unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::StructuralError);
    }
}
