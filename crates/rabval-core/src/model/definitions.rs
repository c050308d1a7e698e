use super::resources::*;
use super::Fields;
use crate::errors::{RabvalError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A full broker topology export
///
/// Sections absent from the JSON read as empty; top-level fields this type
/// does not know are kept in `extra` and written back unchanged.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Definitions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rabbit_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rabbitmq_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_version: Option<String>,
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub vhosts: Vec<Vhost>,
    #[serde(default)]
    pub permissions: Vec<Permission>,
    #[serde(default)]
    pub topic_permissions: Vec<TopicPermission>,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
    #[serde(default)]
    pub global_parameters: Vec<GlobalParameter>,
    #[serde(default)]
    pub policies: Vec<Policy>,
    #[serde(default)]
    pub queues: Vec<Queue>,
    #[serde(default)]
    pub exchanges: Vec<Exchange>,
    #[serde(default)]
    pub bindings: Vec<Binding>,
    #[serde(flatten)]
    pub extra: Fields,
}

impl Definitions {
    /// Read a document from an already parsed JSON value
    ///
    /// # Errors
    ///
    /// `StructuralError` when the value does not have the shape of a
    /// definitions export (wrong section types, unknown exchange type, ...).
    pub fn from_value(value: Value) -> Result<Self> {
        serde_json::from_value(value).map_err(|e| {
            RabvalError::InvalidDocument {
                reason: e.to_string(),
            }
            .into()
        })
    }

    /// Read a document from raw JSON bytes
    ///
    /// # Errors
    ///
    /// `StructuralError` on invalid JSON or an invalid document shape.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|e| {
            RabvalError::InvalidDocument {
                reason: e.to_string(),
            }
            .into()
        })
    }

    /// Total number of resource entries across all sections
    pub fn resource_count(&self) -> usize {
        self.vhosts.len()
            + self.users.len()
            + self.queues.len()
            + self.exchanges.len()
            + self.bindings.len()
            + self.permissions.len()
            + self.topic_permissions.len()
            + self.policies.len()
            + self.parameters.len()
            + self.global_parameters.len()
    }
}
