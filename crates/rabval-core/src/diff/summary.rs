//! Presentation of a diff for humans and pipes

use crate::diff::model::DefinitionsDiff;
use serde_json::{Map, Value};

/// How much of a diff to show
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiffSummary {
    /// Keep at most this many entries per category list
    pub limit: Option<usize>,
    /// Replace every list by its length
    pub counts_only: bool,
}

impl DiffSummary {
    /// Render `diff` with empty categories and empty sections pruned
    pub fn render(&self, diff: &DefinitionsDiff) -> Value {
        let full = serde_json::to_value(diff).unwrap_or(Value::Null);
        let Value::Object(sections) = full else {
            return Value::Object(Map::new());
        };

        let mut out = Map::new();
        for (name, section) in sections {
            let Value::Object(categories) = section else {
                continue;
            };
            let mut kept = Map::new();
            for (category, entries) in categories {
                let Value::Array(mut list) = entries else {
                    continue;
                };
                if list.is_empty() {
                    continue;
                }
                let rendered = if self.counts_only {
                    Value::from(list.len())
                } else {
                    if let Some(limit) = self.limit {
                        list.truncate(limit);
                    }
                    Value::Array(list)
                };
                kept.insert(category, rendered);
            }
            if !kept.is_empty() {
                out.insert(name, Value::Object(kept));
            }
        }
        Value::Object(out)
    }
}

/// Short plain-text line such as `+2 -1 ~3`
pub fn render_totals(diff: &DefinitionsDiff) -> String {
    format!(
        "+{} -{} ~{}",
        diff.added.len(),
        diff.deleted.len(),
        diff.changed.len()
    )
}
