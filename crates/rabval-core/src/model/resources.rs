//! Resource types of a definitions document
//!
//! Natural-key fields are typed; everything else a broker exports for a
//! resource is kept verbatim in `extra` so that equality and round-trips see
//! the full content.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Untyped remainder of a resource
pub type Fields = Map<String, Value>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vhost {
    #[serde(default)]
    pub name: String,
    #[serde(flatten)]
    pub extra: Fields,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Queue {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub vhost: String,
    pub durable: bool,
    pub auto_delete: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Fields>,
    #[serde(flatten)]
    pub extra: Fields,
}

/// Exchange routing types accepted in a definitions document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExchangeType {
    Topic,
    Headers,
    Direct,
}

impl ExchangeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExchangeType::Topic => "topic",
            ExchangeType::Headers => "headers",
            ExchangeType::Direct => "direct",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exchange {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub vhost: String,
    #[serde(rename = "type")]
    pub kind: ExchangeType,
    pub durable: bool,
    pub auto_delete: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub internal: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Fields>,
    #[serde(flatten)]
    pub extra: Fields,
}

/// What a binding routes to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DestinationType {
    Queue,
    Exchange,
}

impl DestinationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DestinationType::Queue => "queue",
            DestinationType::Exchange => "exchange",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Binding {
    #[serde(default)]
    pub vhost: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub destination: String,
    pub destination_type: DestinationType,
    #[serde(default)]
    pub routing_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Fields>,
    #[serde(flatten)]
    pub extra: Fields,
}

impl Binding {
    /// Routing key with an absent key read as empty
    pub fn routing_key(&self) -> &str {
        self.routing_key.as_deref().unwrap_or_default()
    }

    pub fn argument(&self, name: &str) -> Option<&Value> {
        self.arguments.as_ref().and_then(|args| args.get(name))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub password_hash: String,
    #[serde(flatten)]
    pub extra: Fields,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Permission {
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub vhost: String,
    #[serde(flatten)]
    pub extra: Fields,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicPermission {
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub vhost: String,
    #[serde(default)]
    pub exchange: String,
    #[serde(flatten)]
    pub extra: Fields,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Policy {
    #[serde(default)]
    pub vhost: String,
    #[serde(default)]
    pub name: String,
    #[serde(flatten)]
    pub extra: Fields,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    #[serde(default)]
    pub vhost: String,
    #[serde(default)]
    pub component: String,
    #[serde(default)]
    pub name: String,
    #[serde(flatten)]
    pub extra: Fields,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalParameter {
    #[serde(default)]
    pub name: String,
    #[serde(flatten)]
    pub extra: Fields,
}
