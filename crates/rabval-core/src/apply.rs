//! Replaying a diff onto a document
//!
//! `apply_diff` takes ownership of the base document and returns the derived
//! one. A diff that does not fit the base is refused as a whole: the caller
//! gets an error and no half-applied document.
//!
//! ```
//! use rabval_core::apply::{apply_diff, ApplyOptions};
//! use rabval_core::diff::compute_diff;
//! use rabval_core::ignore::IgnoreList;
//! use rabval_core::model::Definitions;
//! use serde_json::json;
//!
//! let live = Definitions::from_value(json!({ "vhosts": [{ "name": "/" }] })).unwrap();
//! let desired = Definitions::from_value(json!({ "vhosts": [{ "name": "/" }, { "name": "eu" }] })).unwrap();
//!
//! let diff = compute_diff(&live, &desired, &IgnoreList::default()).unwrap();
//! let rebuilt = apply_diff(&diff, live.clone(), ApplyOptions::default()).unwrap();
//! assert_eq!(rebuilt.vhosts.len(), 2);
//!
//! let reverted = apply_diff(&diff, rebuilt, ApplyOptions { revert: true }).unwrap();
//! assert_eq!(reverted, live);
//! ```

use crate::diff::model::DefinitionsDiff;
use crate::errors::{RabvalError, Result};
use crate::key::Resource;
use crate::model::*;
use crate::{log_op_end, log_op_error, log_op_start};
use std::collections::HashMap;
use std::time::Instant;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyOptions {
    /// Swap the roles of added/deleted and of before/after
    pub revert: bool,
}

/// Apply `diff` to `base`
///
/// Forward: deleted entries are removed, changed entries are replaced in
/// place by their `after` state, added entries are appended. With
/// `revert`, added entries are removed, changed entries go back to their
/// `before` state and deleted entries are appended. Metadata and untouched
/// entries come from `base`.
///
/// # Errors
///
/// `DiffConflict` when an entry to remove or replace is not in `base`, or an
/// entry to add already is.
pub fn apply_diff(
    diff: &DefinitionsDiff,
    base: Definitions,
    options: ApplyOptions,
) -> Result<Definitions> {
    let start = Instant::now();
    log_op_start!("apply", revert = options.revert);

    match apply_all(diff, base, options) {
        Ok(applied) => {
            log_op_end!(
                "apply",
                duration_ms = start.elapsed().as_millis() as u64,
                resources = applied.resource_count()
            );
            Ok(applied)
        }
        Err(err) => {
            log_op_error!(
                "apply",
                err.clone(),
                duration_ms = start.elapsed().as_millis() as u64
            );
            Err(err)
        }
    }
}

fn apply_all(
    diff: &DefinitionsDiff,
    mut base: Definitions,
    options: ApplyOptions,
) -> Result<Definitions> {
    apply_category::<Vhost>(diff, &mut base, options)?;
    apply_category::<User>(diff, &mut base, options)?;
    apply_category::<Queue>(diff, &mut base, options)?;
    apply_category::<Exchange>(diff, &mut base, options)?;
    apply_category::<Binding>(diff, &mut base, options)?;
    apply_category::<Permission>(diff, &mut base, options)?;
    apply_category::<TopicPermission>(diff, &mut base, options)?;
    apply_category::<Policy>(diff, &mut base, options)?;
    apply_category::<Parameter>(diff, &mut base, options)?;
    apply_category::<GlobalParameter>(diff, &mut base, options)?;
    Ok(base)
}

fn apply_category<T: Resource>(
    diff: &DefinitionsDiff,
    base: &mut Definitions,
    options: ApplyOptions,
) -> Result<()> {
    let (removed, added) = if options.revert {
        (T::in_set(&diff.added), T::in_set(&diff.deleted))
    } else {
        (T::in_set(&diff.deleted), T::in_set(&diff.added))
    };
    let changes = T::in_changes(&diff.changed);
    if removed.is_empty() && added.is_empty() && changes.is_empty() {
        return Ok(());
    }

    // Removed entries leave a hole until the section is compacted, so the
    // identity positions stay valid throughout.
    let mut slots: Vec<Option<T>> = std::mem::take(T::section_mut(base))
        .into_iter()
        .map(Some)
        .collect();
    let mut positions: HashMap<String, usize> = HashMap::with_capacity(slots.len());
    for (idx, entry) in slots.iter().enumerate() {
        if let Some(entry) = entry {
            positions.entry(entry.identity()).or_insert(idx);
        }
    }

    for entry in removed {
        let idx = position::<T>(&positions, &entry.identity())?;
        slots[idx] = None;
        positions.remove(&entry.identity());
    }

    for change in changes {
        let (from, to) = if options.revert {
            (&change.after, &change.before)
        } else {
            (&change.before, &change.after)
        };
        let idx = position::<T>(&positions, &from.identity())?;
        slots[idx] = Some(to.clone());
    }

    for entry in added {
        let id = entry.identity();
        if positions.contains_key(&id) {
            return Err(RabvalError::AlreadyPresent {
                category: T::CATEGORY,
                identity: id,
            }
            .into());
        }
        positions.insert(id, slots.len());
        slots.push(Some(entry.clone()));
    }

    *T::section_mut(base) = slots.into_iter().flatten().collect();
    Ok(())
}

fn position<T: Resource>(positions: &HashMap<String, usize>, identity: &str) -> Result<usize> {
    positions.get(identity).copied().ok_or_else(|| {
        RabvalError::NotPresent {
            category: T::CATEGORY,
            identity: identity.to_string(),
        }
        .into()
    })
}
