//! Diff output types
//!
//! Every category is always present in a serialised diff, empty or not;
//! pruning is left to [`DiffSummary`](super::summary::DiffSummary).

use crate::errors::{RabvalError, Result};
use crate::key::Resource;
use crate::model::*;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One list of resources per category
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceSet {
    #[serde(default)]
    pub vhosts: Vec<Vhost>,
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub queues: Vec<Queue>,
    #[serde(default)]
    pub exchanges: Vec<Exchange>,
    #[serde(default)]
    pub bindings: Vec<Binding>,
    #[serde(default)]
    pub permissions: Vec<Permission>,
    #[serde(default)]
    pub topic_permissions: Vec<TopicPermission>,
    #[serde(default)]
    pub policies: Vec<Policy>,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
    #[serde(default)]
    pub global_parameters: Vec<GlobalParameter>,
}

/// A resource present on both sides with different content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Change<T> {
    pub before: T,
    pub after: T,
}

impl<T: Resource> Change<T> {
    /// Identity shared by both sides
    pub fn identity(&self) -> String {
        self.before.identity()
    }
}

/// One list of changes per category
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChangeSet {
    #[serde(default)]
    pub vhosts: Vec<Change<Vhost>>,
    #[serde(default)]
    pub users: Vec<Change<User>>,
    #[serde(default)]
    pub queues: Vec<Change<Queue>>,
    #[serde(default)]
    pub exchanges: Vec<Change<Exchange>>,
    #[serde(default)]
    pub bindings: Vec<Change<Binding>>,
    #[serde(default)]
    pub permissions: Vec<Change<Permission>>,
    #[serde(default)]
    pub topic_permissions: Vec<Change<TopicPermission>>,
    #[serde(default)]
    pub policies: Vec<Change<Policy>>,
    #[serde(default)]
    pub parameters: Vec<Change<Parameter>>,
    #[serde(default)]
    pub global_parameters: Vec<Change<GlobalParameter>>,
}

impl ResourceSet {
    /// Entry count per category, in document order
    pub fn counts(&self) -> [(Category, usize); 10] {
        [
            (Category::Vhosts, self.vhosts.len()),
            (Category::Users, self.users.len()),
            (Category::Queues, self.queues.len()),
            (Category::Exchanges, self.exchanges.len()),
            (Category::Bindings, self.bindings.len()),
            (Category::Permissions, self.permissions.len()),
            (Category::TopicPermissions, self.topic_permissions.len()),
            (Category::Policies, self.policies.len()),
            (Category::Parameters, self.parameters.len()),
            (Category::GlobalParameters, self.global_parameters.len()),
        ]
    }

    pub fn len(&self) -> usize {
        self.counts().iter().map(|(_, n)| n).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ChangeSet {
    pub fn counts(&self) -> [(Category, usize); 10] {
        [
            (Category::Vhosts, self.vhosts.len()),
            (Category::Users, self.users.len()),
            (Category::Queues, self.queues.len()),
            (Category::Exchanges, self.exchanges.len()),
            (Category::Bindings, self.bindings.len()),
            (Category::Permissions, self.permissions.len()),
            (Category::TopicPermissions, self.topic_permissions.len()),
            (Category::Policies, self.policies.len()),
            (Category::Parameters, self.parameters.len()),
            (Category::GlobalParameters, self.global_parameters.len()),
        ]
    }

    pub fn len(&self) -> usize {
        self.counts().iter().map(|(_, n)| n).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Added, deleted and changed resources between two documents
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DefinitionsDiff {
    pub added: ResourceSet,
    pub deleted: ResourceSet,
    pub changed: ChangeSet,
}

impl DefinitionsDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.deleted.is_empty() && self.changed.is_empty()
    }

    /// Read a serialised diff
    ///
    /// Missing sections and categories read as empty.
    ///
    /// # Errors
    ///
    /// `StructuralError` when the value is not a diff object or names an
    /// unknown category; `InvalidResource`, carrying the offending object,
    /// when an entry cannot be read as a resource of its category.
    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Object(mut root) = value else {
            return Err(invalid_document("a diff must be a JSON object"));
        };
        let added = section(&mut root, "added")?;
        let deleted = section(&mut root, "deleted")?;
        let changed = section(&mut root, "changed")?;

        let mut diff = DefinitionsDiff::default();
        read_category::<Vhost>(&added, &deleted, &changed, &mut diff)?;
        read_category::<User>(&added, &deleted, &changed, &mut diff)?;
        read_category::<Queue>(&added, &deleted, &changed, &mut diff)?;
        read_category::<Exchange>(&added, &deleted, &changed, &mut diff)?;
        read_category::<Binding>(&added, &deleted, &changed, &mut diff)?;
        read_category::<Permission>(&added, &deleted, &changed, &mut diff)?;
        read_category::<TopicPermission>(&added, &deleted, &changed, &mut diff)?;
        read_category::<Policy>(&added, &deleted, &changed, &mut diff)?;
        read_category::<Parameter>(&added, &deleted, &changed, &mut diff)?;
        read_category::<GlobalParameter>(&added, &deleted, &changed, &mut diff)?;
        Ok(diff)
    }

    /// Read a serialised diff from raw JSON bytes
    ///
    /// # Errors
    ///
    /// As [`DefinitionsDiff::from_value`], plus `StructuralError` on invalid
    /// JSON.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let value: Value = serde_json::from_slice(bytes).map_err(|e| {
            crate::errors::ExError::from(RabvalError::InvalidDocument {
                reason: e.to_string(),
            })
        })?;
        Self::from_value(value)
    }
}

fn invalid_document(reason: &str) -> crate::errors::ExError {
    RabvalError::InvalidDocument {
        reason: reason.to_string(),
    }
    .into()
}

fn section(root: &mut Map<String, Value>, name: &str) -> Result<Map<String, Value>> {
    match root.remove(name) {
        None | Some(Value::Null) => Ok(Map::new()),
        Some(Value::Object(map)) => {
            if let Some(unknown) = map.keys().find(|k| Category::from_name(k).is_none()) {
                return Err(invalid_document(&format!(
                    "unknown category \"{}\" in \"{}\"",
                    unknown, name
                )));
            }
            Ok(map)
        }
        Some(_) => Err(invalid_document(&format!(
            "\"{}\" must map category names to lists",
            name
        ))),
    }
}

fn entries<'a>(section: &'a Map<String, Value>, category: Category) -> Result<&'a [Value]> {
    match section.get(category.as_str()) {
        None | Some(Value::Null) => Ok(&[]),
        Some(Value::Array(items)) => Ok(items.as_slice()),
        Some(_) => Err(invalid_document(&format!(
            "\"{}\" must be a list",
            category
        ))),
    }
}

fn read_entry<T: Resource>(entry: &Value) -> Result<T> {
    serde_json::from_value(entry.clone()).map_err(|_| {
        RabvalError::InvalidDiffEntry {
            category: T::CATEGORY,
            object: entry.to_string(),
        }
        .into()
    })
}

fn read_category<T: Resource>(
    added: &Map<String, Value>,
    deleted: &Map<String, Value>,
    changed: &Map<String, Value>,
    diff: &mut DefinitionsDiff,
) -> Result<()> {
    for entry in entries(added, T::CATEGORY)? {
        T::in_set_mut(&mut diff.added).push(read_entry(entry)?);
    }
    for entry in entries(deleted, T::CATEGORY)? {
        T::in_set_mut(&mut diff.deleted).push(read_entry(entry)?);
    }
    for entry in entries(changed, T::CATEGORY)? {
        let change: Change<T> = serde_json::from_value(entry.clone()).map_err(|_| {
            crate::errors::ExError::from(RabvalError::InvalidDiffEntry {
                category: T::CATEGORY,
                object: entry.to_string(),
            })
        })?;
        T::in_changes_mut(&mut diff.changed).push(change);
    }
    Ok(())
}
