//! Orphan detection and usage-aware escalation
//!
//! Runs over an already built [`Index`]. Orphans are always warnings. Against
//! a usage record, resources never observed in traffic are "unused"; per
//! resource type, once the unused share exceeds its threshold every unused
//! instance of that type becomes a failure.

use crate::config::UnusedThresholds;
use crate::failure::{CheckMode, Failure, FailureCollector, FailureKind, Halt};
use crate::index::Index;
use crate::key::{self, Resource};
use crate::model::Definitions;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// One observed-in-use resource pair from live traffic
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageRecord {
    pub vhost: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub queue: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exchange: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RelationsReport {
    pub failures: Vec<Failure>,
    pub warnings: Vec<Failure>,
}

impl RelationsReport {
    pub fn is_ok(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Identities seen in a usage record
#[derive(Debug, Default)]
struct Observed {
    vhosts: BTreeSet<String>,
    queues: BTreeSet<String>,
    exchanges: BTreeSet<String>,
}

impl Observed {
    fn from_records(records: &[UsageRecord]) -> Self {
        let mut observed = Self::default();
        for record in records {
            observed.vhosts.insert(key::vhost(&record.vhost));
            if let Some(queue) = &record.queue {
                observed.queues.insert(key::queue(&record.vhost, queue));
            }
            if let Some(exchange) = &record.exchange {
                observed
                    .exchanges
                    .insert(key::exchange(&record.vhost, exchange));
            }
        }
        observed
    }
}

/// Check orphans, grouped-vhost integrity and, given a usage record, usage
pub fn check_relations(
    defs: &Definitions,
    index: &Index<'_>,
    usage: Option<&[UsageRecord]>,
    thresholds: &UnusedThresholds,
    mode: CheckMode,
) -> RelationsReport {
    let mut collector = FailureCollector::new(mode);
    let _ = run_checks(defs, index, usage, thresholds, &mut collector);
    let (failures, warnings) = collector.into_parts();
    RelationsReport { failures, warnings }
}

fn run_checks(
    defs: &Definitions,
    index: &Index<'_>,
    usage: Option<&[UsageRecord]>,
    thresholds: &UnusedThresholds,
    assert: &mut FailureCollector,
) -> Result<(), Halt> {
    check_grouped_vhosts(defs, index, assert)?;
    warn_orphans(defs, index, assert);
    if let Some(records) = usage {
        check_usage(defs, index, &Observed::from_records(records), thresholds, assert)?;
    }
    Ok(())
}

/// Every vhost something was grouped under must exist in the document
fn check_grouped_vhosts(
    defs: &Definitions,
    index: &Index<'_>,
    assert: &mut FailureCollector,
) -> Result<(), Halt> {
    let declared: BTreeSet<String> = defs
        .vhosts
        .iter()
        .filter(|v| v.has_natural_key())
        .map(Resource::identity)
        .collect();
    for vhost in index.grouped_vhosts() {
        assert.ensure(declared.contains(vhost), || {
            Failure::new(
                FailureKind::MissingReference,
                format!("Resources grouped under undeclared vhost: \"{}\"", vhost),
            )
        })?;
    }
    Ok(())
}

fn warn_orphans(defs: &Definitions, index: &Index<'_>, assert: &mut FailureCollector) {
    for (idx, vhost) in defs.vhosts.iter().enumerate() {
        if vhost.has_natural_key() && index.resources_in_vhost(&vhost.name).is_empty() {
            assert.warn(
                Failure::new(
                    FailureKind::OrphanedResource,
                    format!("Unused vhost: \"{}\"", vhost.name),
                )
                .at(path("vhosts", idx)),
            );
        }
    }

    for (idx, queue) in defs.queues.iter().enumerate() {
        if queue.has_natural_key() && index.bindings_to(&queue.identity()).is_empty() {
            assert.warn(
                Failure::new(
                    FailureKind::OrphanedResource,
                    format!(
                        "Unbound queue: \"{}\" in vhost \"{}\"",
                        queue.name, queue.vhost
                    ),
                )
                .at(path("queues", idx)),
            );
        }
    }

    for (idx, exchange) in defs.exchanges.iter().enumerate() {
        let id = exchange.identity();
        if exchange.has_natural_key()
            && index.bindings_from(&id).is_empty()
            && index.bindings_to(&id).is_empty()
        {
            assert.warn(
                Failure::new(
                    FailureKind::OrphanedResource,
                    format!(
                        "Unbound exchange: \"{}\" in vhost \"{}\"",
                        exchange.name, exchange.vhost
                    ),
                )
                .at(path("exchanges", idx)),
            );
        }
    }
}

fn check_usage(
    defs: &Definitions,
    index: &Index<'_>,
    observed: &Observed,
    thresholds: &UnusedThresholds,
    assert: &mut FailureCollector,
) -> Result<(), Halt> {
    // Only the entry the index kept counts; duplicates are already reported.
    let unused_vhosts: Vec<Failure> = defs
        .vhosts
        .iter()
        .enumerate()
        .filter(|(_, v)| v.has_natural_key())
        .filter(|(_, v)| index.vhost(&v.name).is_some_and(|kept| std::ptr::eq(kept, *v)))
        .filter(|(_, v)| !observed.vhosts.contains(&v.identity()))
        .map(|(idx, v)| {
            Failure::new(
                FailureKind::UnusedResource,
                format!("Unused vhost: \"{}\" not seen in usage record", v.name),
            )
            .at(path("vhosts", idx))
        })
        .collect();
    escalate("vhost", unused_vhosts, index.vhost_count(), thresholds.vhost, assert)?;

    let unused_queues: Vec<Failure> = defs
        .queues
        .iter()
        .enumerate()
        .filter(|(_, q)| q.has_natural_key())
        .filter(|(_, q)| {
            index
                .queue(&q.vhost, &q.name)
                .is_some_and(|kept| std::ptr::eq(kept, *q))
        })
        .filter(|(_, q)| !observed.queues.contains(&q.identity()))
        .map(|(idx, q)| {
            Failure::new(
                FailureKind::UnusedResource,
                format!(
                    "Unused queue: \"{}\" in vhost \"{}\" not seen in usage record",
                    q.name, q.vhost
                ),
            )
            .at(path("queues", idx))
        })
        .collect();
    escalate("queue", unused_queues, index.queue_count(), thresholds.queue, assert)?;

    let unused_exchanges: Vec<Failure> = defs
        .exchanges
        .iter()
        .enumerate()
        .filter(|(_, e)| e.has_natural_key())
        .filter(|(_, e)| {
            index
                .exchange(&e.vhost, &e.name)
                .is_some_and(|kept| std::ptr::eq(kept, *e))
        })
        .filter(|(_, e)| !observed.exchanges.contains(&e.identity()))
        .map(|(idx, e)| {
            Failure::new(
                FailureKind::UnusedResource,
                format!(
                    "Unused exchange: \"{}\" in vhost \"{}\" not seen in usage record",
                    e.name, e.vhost
                ),
            )
            .at(path("exchanges", idx))
        })
        .collect();
    escalate(
        "exchange",
        unused_exchanges,
        index.exchange_count(),
        thresholds.exchange,
        assert,
    )
}

/// Report `unused` as failures when their share of `total` exceeds
/// `threshold`, as warnings otherwise
fn escalate(
    kind: &str,
    unused: Vec<Failure>,
    total: usize,
    threshold: f64,
    assert: &mut FailureCollector,
) -> Result<(), Halt> {
    if unused.is_empty() || total == 0 {
        return Ok(());
    }
    let ratio = unused.len() as f64 / total as f64;
    tracing::debug!(kind, unused = unused.len(), total, ratio, threshold, "usage ratio");
    if ratio > threshold {
        for failure in unused {
            assert.fail(failure)?;
        }
    } else {
        for warning in unused {
            assert.warn(warning);
        }
    }
    Ok(())
}

fn path(section: &str, idx: usize) -> Vec<String> {
    vec![section.to_string(), idx.to_string()]
}
