//! Identity key scheme
//!
//! Every resource maps to a canonical string built from its natural-key
//! fields only. Two entries with the same key are the same resource, whatever
//! their other properties; that is what separates "added/deleted" from
//! "changed" in a diff and what duplicate detection runs on.
//!
//! Each format is injective over its natural-key tuple for names drawn from
//! the identifier charset enforced by [`crate::names`]. Binding routing keys
//! and arguments are free-form, so they are quoted as JSON text.

use crate::diff::model::{Change, ChangeSet, ResourceSet};
use crate::model::*;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// Behaviour shared by every resource type
pub trait Resource: Clone + PartialEq + Serialize + DeserializeOwned {
    const CATEGORY: Category;

    /// Canonical identity key
    fn identity(&self) -> String;

    /// False when a natural-key field is empty; such entries are left to
    /// structural validation and skipped by the index.
    fn has_natural_key(&self) -> bool;

    fn into_any(self) -> AnyResource;

    fn section(defs: &Definitions) -> &Vec<Self>;
    fn section_mut(defs: &mut Definitions) -> &mut Vec<Self>;
    fn in_set(set: &ResourceSet) -> &Vec<Self>;
    fn in_set_mut(set: &mut ResourceSet) -> &mut Vec<Self>;
    fn in_changes(set: &ChangeSet) -> &Vec<Change<Self>>;
    fn in_changes_mut(set: &mut ChangeSet) -> &mut Vec<Change<Self>>;
}

pub fn vhost(name: &str) -> String {
    name.to_string()
}

pub fn queue(vhost: &str, name: &str) -> String {
    format!("Q[{} @ {}]", name, vhost)
}

pub fn exchange(vhost: &str, name: &str) -> String {
    format!("E[{} @ {}]", name, vhost)
}

pub fn user(name: &str) -> String {
    format!("U[{}]", name)
}

/// Key of a binding destination, resolved by destination type
pub fn destination(vhost: &str, kind: DestinationType, name: &str) -> String {
    match kind {
        DestinationType::Queue => queue(vhost, name),
        DestinationType::Exchange => exchange(vhost, name),
    }
}

pub fn binding(b: &Binding) -> String {
    format!(
        "B[{}->{}.{} @ {}]({}/{})",
        b.source,
        b.destination_type.as_str(),
        b.destination,
        b.vhost,
        Value::from(b.routing_key()),
        arguments(b.arguments.as_ref())
    )
}

/// Argument map as sorted `"key"=value` pairs, so entry order never matters
///
/// Keys and values are rendered as JSON text. Both are self-delimiting, so
/// neither a `,` nor a `=` inside a value can shift a pair boundary.
pub fn arguments(args: Option<&Fields>) -> String {
    let Some(args) = args else {
        return String::new();
    };
    let mut pairs: Vec<(&String, &Value)> = args.iter().collect();
    pairs.sort_by(|a, b| a.0.cmp(b.0));
    pairs
        .into_iter()
        .map(|(k, v)| format!("{}={}", Value::from(k.as_str()), v))
        .collect::<Vec<_>>()
        .join(",")
}

macro_rules! impl_resource {
    ($ty:ty, $category:ident, $variant:ident, $field:ident, |$r:ident| $identity:expr, $has_key:expr) => {
        impl Resource for $ty {
            const CATEGORY: Category = Category::$category;

            fn identity(&self) -> String {
                let $r = self;
                $identity
            }

            fn has_natural_key(&self) -> bool {
                let $r = self;
                $has_key
            }

            fn into_any(self) -> AnyResource {
                AnyResource::$variant(self)
            }

            fn section(defs: &Definitions) -> &Vec<Self> {
                &defs.$field
            }

            fn section_mut(defs: &mut Definitions) -> &mut Vec<Self> {
                &mut defs.$field
            }

            fn in_set(set: &ResourceSet) -> &Vec<Self> {
                &set.$field
            }

            fn in_set_mut(set: &mut ResourceSet) -> &mut Vec<Self> {
                &mut set.$field
            }

            fn in_changes(set: &ChangeSet) -> &Vec<Change<Self>> {
                &set.$field
            }

            fn in_changes_mut(set: &mut ChangeSet) -> &mut Vec<Change<Self>> {
                &mut set.$field
            }
        }
    };
}

impl_resource!(
    Vhost,
    Vhosts,
    Vhost,
    vhosts,
    |r| vhost(&r.name),
    !r.name.is_empty()
);
impl_resource!(
    User,
    Users,
    User,
    users,
    |r| user(&r.name),
    !r.name.is_empty()
);
impl_resource!(
    Queue,
    Queues,
    Queue,
    queues,
    |r| queue(&r.vhost, &r.name),
    !r.name.is_empty() && !r.vhost.is_empty()
);
impl_resource!(
    Exchange,
    Exchanges,
    Exchange,
    exchanges,
    |r| exchange(&r.vhost, &r.name),
    !r.name.is_empty() && !r.vhost.is_empty()
);
impl_resource!(
    Binding,
    Bindings,
    Binding,
    bindings,
    |r| binding(r),
    !r.vhost.is_empty() && !r.source.is_empty() && !r.destination.is_empty()
);
impl_resource!(
    Permission,
    Permissions,
    Permission,
    permissions,
    |r| format!("P[{} @ {}]", r.user, r.vhost),
    !r.user.is_empty() && !r.vhost.is_empty()
);
impl_resource!(
    TopicPermission,
    TopicPermissions,
    TopicPermission,
    topic_permissions,
    |r| format!("T[{} @ {}]({})", r.user, r.vhost, r.exchange),
    !r.user.is_empty() && !r.vhost.is_empty()
);
impl_resource!(
    Policy,
    Policies,
    Policy,
    policies,
    |r| format!("Pol[{} @ {}]", r.name, r.vhost),
    !r.name.is_empty() && !r.vhost.is_empty()
);
impl_resource!(
    Parameter,
    Parameters,
    Parameter,
    parameters,
    |r| format!("Par[{}/{} @ {}]", r.component, r.name, r.vhost),
    !r.name.is_empty() && !r.vhost.is_empty() && !r.component.is_empty()
);
impl_resource!(
    GlobalParameter,
    GlobalParameters,
    GlobalParameter,
    global_parameters,
    |r| format!("G[{}]", r.name),
    !r.name.is_empty()
);
