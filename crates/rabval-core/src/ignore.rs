//! Ignore rules applied to both sides of a diff
//!
//! An ignore file is a JSON array of rules:
//!
//! ```json
//! [
//!   { "category": "queues", "contains": "@ /tmp" },
//!   { "pattern": "^U\\[guest\\]$" },
//!   { "category": "global_parameters" }
//! ]
//! ```
//!
//! A rule matches a resource when its category (if given) equals the
//! resource's category and every given matcher matches the identity key. A
//! rule with only a category matches that whole category.

use crate::errors::{RabvalError, Result};
use crate::model::Category;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawRule {
    category: Option<Category>,
    contains: Option<String>,
    pattern: Option<String>,
}

#[derive(Debug, Clone)]
pub struct IgnoreRule {
    category: Option<Category>,
    contains: Option<String>,
    pattern: Option<Regex>,
}

impl IgnoreRule {
    pub fn category(category: Category) -> Self {
        Self {
            category: Some(category),
            contains: None,
            pattern: None,
        }
    }

    /// Match identities containing `needle`, in any category unless narrowed
    pub fn containing(category: Option<Category>, needle: impl Into<String>) -> Self {
        Self {
            category,
            contains: Some(needle.into()),
            pattern: None,
        }
    }

    pub fn matches(&self, category: Category, identity: &str) -> bool {
        if self.category.is_some_and(|c| c != category) {
            return false;
        }
        let contains = self
            .contains
            .as_deref()
            .map_or(true, |needle| identity.contains(needle));
        let pattern = self
            .pattern
            .as_ref()
            .map_or(true, |re| re.is_match(identity));
        contains && pattern
    }
}

/// Ordered list of ignore rules; empty ignores nothing
#[derive(Debug, Clone, Default)]
pub struct IgnoreList {
    rules: Vec<IgnoreRule>,
}

impl IgnoreList {
    pub fn new(rules: Vec<IgnoreRule>) -> Self {
        Self { rules }
    }

    /// Read rules from a parsed ignore file
    ///
    /// # Errors
    ///
    /// `InvalidConfig` when the value is not an array of rules, a rule names
    /// an unknown category or field, a pattern does not compile, or a rule
    /// has neither a category nor a matcher.
    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Array(items) = value else {
            return Err(RabvalError::InvalidIgnoreRule {
                position: 0,
                reason: "ignore file must be a JSON array".to_string(),
            }
            .into());
        };

        let mut rules = Vec::with_capacity(items.len());
        for (idx, item) in items.into_iter().enumerate() {
            let position = idx + 1;
            let raw: RawRule =
                serde_json::from_value(item).map_err(|e| RabvalError::InvalidIgnoreRule {
                    position,
                    reason: e.to_string(),
                })?;
            if raw.category.is_none() && raw.contains.is_none() && raw.pattern.is_none() {
                return Err(RabvalError::InvalidIgnoreRule {
                    position,
                    reason: "rule would ignore everything".to_string(),
                }
                .into());
            }
            let pattern = raw
                .pattern
                .map(|p| Regex::new(&p))
                .transpose()
                .map_err(|e| RabvalError::InvalidIgnoreRule {
                    position,
                    reason: e.to_string(),
                })?;
            rules.push(IgnoreRule {
                category: raw.category,
                contains: raw.contains,
                pattern,
            });
        }
        Ok(Self { rules })
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_ignored(&self, category: Category, identity: &str) -> bool {
        self.rules.iter().any(|r| r.matches(category, identity))
    }
}
