//! Definitions document model
//!
//! Every entry is typed by the section it was read from, so a resource's kind
//! is known from parse time on and never inferred from its fields.

pub mod definitions;
pub mod resources;

pub use definitions::Definitions;
pub use resources::{
    Binding, DestinationType, Exchange, ExchangeType, Fields, GlobalParameter, Parameter,
    Permission, Policy, Queue, TopicPermission, User, Vhost,
};

use crate::key::Resource;
use serde::{Deserialize, Serialize};

/// A top-level section of a definitions document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Vhosts,
    Users,
    Queues,
    Exchanges,
    Bindings,
    Permissions,
    TopicPermissions,
    Policies,
    Parameters,
    GlobalParameters,
}

impl Category {
    /// All categories in document order
    pub const ALL: [Category; 10] = [
        Category::Vhosts,
        Category::Users,
        Category::Queues,
        Category::Exchanges,
        Category::Bindings,
        Category::Permissions,
        Category::TopicPermissions,
        Category::Policies,
        Category::Parameters,
        Category::GlobalParameters,
    ];

    /// Section name as it appears in the JSON document
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Vhosts => "vhosts",
            Category::Users => "users",
            Category::Queues => "queues",
            Category::Exchanges => "exchanges",
            Category::Bindings => "bindings",
            Category::Permissions => "permissions",
            Category::TopicPermissions => "topic_permissions",
            Category::Policies => "policies",
            Category::Parameters => "parameters",
            Category::GlobalParameters => "global_parameters",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == name)
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tagged union over every resource type
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AnyResource {
    Vhost(Vhost),
    User(User),
    Queue(Queue),
    Exchange(Exchange),
    Binding(Binding),
    Permission(Permission),
    TopicPermission(TopicPermission),
    Policy(Policy),
    Parameter(Parameter),
    GlobalParameter(GlobalParameter),
}

impl AnyResource {
    pub fn category(&self) -> Category {
        match self {
            AnyResource::Vhost(_) => Category::Vhosts,
            AnyResource::User(_) => Category::Users,
            AnyResource::Queue(_) => Category::Queues,
            AnyResource::Exchange(_) => Category::Exchanges,
            AnyResource::Binding(_) => Category::Bindings,
            AnyResource::Permission(_) => Category::Permissions,
            AnyResource::TopicPermission(_) => Category::TopicPermissions,
            AnyResource::Policy(_) => Category::Policies,
            AnyResource::Parameter(_) => Category::Parameters,
            AnyResource::GlobalParameter(_) => Category::GlobalParameters,
        }
    }

    pub fn identity(&self) -> String {
        match self {
            AnyResource::Vhost(r) => r.identity(),
            AnyResource::User(r) => r.identity(),
            AnyResource::Queue(r) => r.identity(),
            AnyResource::Exchange(r) => r.identity(),
            AnyResource::Binding(r) => r.identity(),
            AnyResource::Permission(r) => r.identity(),
            AnyResource::TopicPermission(r) => r.identity(),
            AnyResource::Policy(r) => r.identity(),
            AnyResource::Parameter(r) => r.identity(),
            AnyResource::GlobalParameter(r) => r.identity(),
        }
    }

    /// Vhost the resource lives in; `None` for cluster-wide resources
    pub fn vhost(&self) -> Option<&str> {
        match self {
            AnyResource::Vhost(r) => Some(&r.name),
            AnyResource::Queue(r) => Some(&r.vhost),
            AnyResource::Exchange(r) => Some(&r.vhost),
            AnyResource::Binding(r) => Some(&r.vhost),
            AnyResource::Permission(r) => Some(&r.vhost),
            AnyResource::TopicPermission(r) => Some(&r.vhost),
            AnyResource::Policy(r) => Some(&r.vhost),
            AnyResource::Parameter(r) => Some(&r.vhost),
            AnyResource::User(_) | AnyResource::GlobalParameter(_) => None,
        }
    }
}
