//! Full validation pipeline: names, referential integrity, relations

use crate::config::RabvalConfig;
use crate::failure::{CheckMode, Failure, FailureList};
use crate::index::Index;
use crate::model::Definitions;
use crate::relations::{check_relations, UsageRecord};
use crate::{log_op_end, log_op_start, names};
use std::time::Instant;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationReport {
    /// Failures in check order: names, index, relations
    pub failures: FailureList,
    pub warnings: Vec<Failure>,
}

impl ValidationReport {
    pub fn is_ok(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Validate `defs`, optionally against a usage record
///
/// In [`CheckMode::FailFast`] the pipeline stops after the first stage that
/// reports a failure.
pub fn validate(
    defs: &Definitions,
    usage: Option<&[UsageRecord]>,
    config: &RabvalConfig,
    mode: CheckMode,
) -> ValidationReport {
    let start = Instant::now();
    log_op_start!("validate", resources = defs.resource_count());

    let mut failures = names::check_names(defs, &config.string_allow_list, mode);
    let mut warnings = Vec::new();

    if failures.is_empty() || mode == CheckMode::CollectAll {
        let (index, index_failures) = Index::build(defs, mode);
        failures.extend(index_failures);

        if failures.is_empty() || mode == CheckMode::CollectAll {
            let report = check_relations(defs, &index, usage, &config.unused_thresholds, mode);
            failures.extend(report.failures);
            warnings = report.warnings;
        }
    }

    log_op_end!(
        "validate",
        duration_ms = start.elapsed().as_millis() as u64,
        failure_count = failures.len(),
        warning_count = warnings.len()
    );

    ValidationReport {
        failures: failures.into(),
        warnings,
    }
}
