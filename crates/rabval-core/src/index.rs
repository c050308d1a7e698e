//! Referential-integrity index over a definitions document
//!
//! Built in two passes: the first indexes vhosts, queues, exchanges and users
//! by identity; the second resolves every binding against those maps and
//! records adjacency for the endpoints that resolved. A dangling reference is
//! reported but never produces an adjacency entry.

use crate::failure::{CheckMode, Failure, FailureCollector, FailureKind, Halt};
use crate::key::{self, Resource};
use crate::model::*;
use std::collections::BTreeMap;

/// A queue or exchange, as grouped under its vhost
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VhostScoped<'d> {
    Queue(&'d Queue),
    Exchange(&'d Exchange),
}

impl VhostScoped<'_> {
    pub fn identity(&self) -> String {
        match self {
            VhostScoped::Queue(q) => q.identity(),
            VhostScoped::Exchange(e) => e.identity(),
        }
    }
}

#[derive(Debug, Default)]
pub struct Index<'d> {
    vhosts: BTreeMap<String, &'d Vhost>,
    queues: BTreeMap<String, &'d Queue>,
    exchanges: BTreeMap<String, &'d Exchange>,
    users: BTreeMap<String, &'d User>,
    bindings: BTreeMap<String, &'d Binding>,
    by_vhost: BTreeMap<String, Vec<VhostScoped<'d>>>,
    bindings_by_source: BTreeMap<String, Vec<&'d Binding>>,
    bindings_by_destination: BTreeMap<String, Vec<&'d Binding>>,
}

impl<'d> Index<'d> {
    /// Build an index and return it with the integrity failures found
    pub fn build(defs: &'d Definitions, mode: CheckMode) -> (Self, Vec<Failure>) {
        let mut index = Self::default();
        let failures = index.rebuild(defs, mode);
        (index, failures)
    }

    /// Reset all derived state and index `defs` again
    ///
    /// An empty result means the document's cross-references are sound.
    pub fn rebuild(&mut self, defs: &'d Definitions, mode: CheckMode) -> Vec<Failure> {
        *self = Self::default();
        let mut collector = FailureCollector::new(mode);
        // Halt only ends the pass early; the failure is already recorded.
        let _ = self
            .index_resources(defs, &mut collector)
            .and_then(|_| self.index_bindings(defs, &mut collector));
        collector.into_failures()
    }

    fn index_resources(
        &mut self,
        defs: &'d Definitions,
        assert: &mut FailureCollector,
    ) -> Result<(), Halt> {
        for (idx, vhost) in defs.vhosts.iter().enumerate() {
            if !vhost.has_natural_key() {
                continue;
            }
            let id = vhost.identity();
            assert.ensure(!self.vhosts.contains_key(&id), || {
                Failure::new(
                    FailureKind::DuplicateResource,
                    format!("Duplicate vhost: \"{}\"", vhost.name),
                )
                .at(path("vhosts", idx))
            })?;
            self.vhosts.entry(id).or_insert(vhost);
        }

        for (idx, queue) in defs.queues.iter().enumerate() {
            if !queue.has_natural_key() {
                continue;
            }
            let vhost_known = self.vhosts.contains_key(&key::vhost(&queue.vhost));
            assert.ensure(vhost_known, || missing_vhost(&queue.vhost, "queues", idx))?;
            let id = queue.identity();
            let duplicate = self.queues.contains_key(&id);
            assert.ensure(!duplicate, || {
                Failure::new(
                    FailureKind::DuplicateResource,
                    format!(
                        "Duplicate queue: \"{}\" in vhost \"{}\"",
                        queue.name, queue.vhost
                    ),
                )
                .at(path("queues", idx))
            })?;
            if !duplicate {
                self.queues.insert(id, queue);
                if vhost_known {
                    self.group(&queue.vhost, VhostScoped::Queue(queue));
                }
            }
        }

        for (idx, exchange) in defs.exchanges.iter().enumerate() {
            if !exchange.has_natural_key() {
                continue;
            }
            let vhost_known = self.vhosts.contains_key(&key::vhost(&exchange.vhost));
            assert.ensure(vhost_known, || {
                missing_vhost(&exchange.vhost, "exchanges", idx)
            })?;
            let id = exchange.identity();
            let duplicate = self.exchanges.contains_key(&id);
            assert.ensure(!duplicate, || {
                Failure::new(
                    FailureKind::DuplicateResource,
                    format!(
                        "Duplicate exchange: \"{}\" in vhost \"{}\"",
                        exchange.name, exchange.vhost
                    ),
                )
                .at(path("exchanges", idx))
            })?;
            if !duplicate {
                self.exchanges.insert(id, exchange);
                if vhost_known {
                    self.group(&exchange.vhost, VhostScoped::Exchange(exchange));
                }
            }
        }

        for (idx, user) in defs.users.iter().enumerate() {
            if !user.has_natural_key() {
                continue;
            }
            let id = user.identity();
            assert.ensure(!self.users.contains_key(&id), || {
                Failure::new(
                    FailureKind::DuplicateResource,
                    format!("Duplicate user: \"{}\"", user.name),
                )
                .at(path("users", idx))
            })?;
            self.users.entry(id).or_insert(user);
        }

        Ok(())
    }

    fn index_bindings(
        &mut self,
        defs: &'d Definitions,
        assert: &mut FailureCollector,
    ) -> Result<(), Halt> {
        for (idx, binding) in defs.bindings.iter().enumerate() {
            if !binding.has_natural_key() {
                continue;
            }
            let vhost = binding.vhost.as_str();
            assert.ensure(self.vhosts.contains_key(&key::vhost(vhost)), || {
                missing_vhost(vhost, "bindings", idx)
            })?;

            let source = self.exchange(vhost, &binding.source);
            assert.ensure(source.is_some(), || {
                Failure::new(
                    FailureKind::MissingSourceExchange,
                    format!(
                        "Missing source exchange for binding: \"{}\" in vhost \"{}\"",
                        binding.source, vhost
                    ),
                )
                .at(path("bindings", idx))
            })?;

            let destination_key =
                key::destination(vhost, binding.destination_type, &binding.destination);
            let destination_found = match binding.destination_type {
                DestinationType::Queue => self.queues.contains_key(&destination_key),
                DestinationType::Exchange => self.exchanges.contains_key(&destination_key),
            };
            assert.ensure(destination_found, || {
                Failure::new(
                    FailureKind::MissingDestination,
                    format!(
                        "Missing destination {} for binding: \"{}\" in vhost \"{}\"",
                        binding.destination_type.as_str(),
                        binding.destination,
                        vhost
                    ),
                )
                .at(path("bindings", idx))
            })?;

            if let Some(source) = source {
                check_binding_arguments(source, binding, idx, assert)?;
            }

            let id = binding.identity();
            let duplicate = self.bindings.contains_key(&id);
            assert.ensure(!duplicate, || {
                Failure::new(
                    FailureKind::DuplicateResource,
                    format!(
                        "Duplicate binding from \"{}\" to {} \"{}\" in vhost \"{}\"",
                        binding.source,
                        binding.destination_type.as_str(),
                        binding.destination,
                        vhost
                    ),
                )
                .at(path("bindings", idx))
            })?;
            if duplicate {
                continue;
            }
            self.bindings.insert(id, binding);

            if let Some(source) = source {
                self.bindings_by_source
                    .entry(source.identity())
                    .or_default()
                    .push(binding);
            }
            if destination_found {
                self.bindings_by_destination
                    .entry(destination_key)
                    .or_default()
                    .push(binding);
            }
        }
        Ok(())
    }

    fn group(&mut self, vhost: &str, resource: VhostScoped<'d>) {
        self.by_vhost
            .entry(key::vhost(vhost))
            .or_default()
            .push(resource);
    }

    pub fn vhost(&self, name: &str) -> Option<&'d Vhost> {
        self.vhosts.get(&key::vhost(name)).copied()
    }

    pub fn queue(&self, vhost: &str, name: &str) -> Option<&'d Queue> {
        self.queues.get(&key::queue(vhost, name)).copied()
    }

    pub fn exchange(&self, vhost: &str, name: &str) -> Option<&'d Exchange> {
        self.exchanges.get(&key::exchange(vhost, name)).copied()
    }

    pub fn user(&self, name: &str) -> Option<&'d User> {
        self.users.get(&key::user(name)).copied()
    }

    pub fn binding(&self, identity: &str) -> Option<&'d Binding> {
        self.bindings.get(identity).copied()
    }

    /// Queues and exchanges indexed under a vhost
    pub fn resources_in_vhost(&self, name: &str) -> &[VhostScoped<'d>] {
        self.by_vhost
            .get(&key::vhost(name))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Vhost identities that have at least one queue or exchange
    pub fn grouped_vhosts(&self) -> impl Iterator<Item = &str> {
        self.by_vhost.keys().map(String::as_str)
    }

    /// Bindings whose source is the exchange with identity `key`
    pub fn bindings_from(&self, key: &str) -> &[&'d Binding] {
        self.bindings_by_source
            .get(key)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Bindings whose destination is the resource with identity `key`
    pub fn bindings_to(&self, key: &str) -> &[&'d Binding] {
        self.bindings_by_destination
            .get(key)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn vhost_count(&self) -> usize {
        self.vhosts.len()
    }

    pub fn queue_count(&self) -> usize {
        self.queues.len()
    }

    pub fn exchange_count(&self) -> usize {
        self.exchanges.len()
    }

    pub fn binding_count(&self) -> usize {
        self.bindings.len()
    }
}

/// Exchange-type rules for binding arguments
///
/// Headers exchanges ignore the routing key; topic and direct exchanges
/// ignore `x-match`.
fn check_binding_arguments(
    source: &Exchange,
    binding: &Binding,
    idx: usize,
    assert: &mut FailureCollector,
) -> Result<(), Halt> {
    let target = format!(
        "binding from {} to {} \"{}\" in vhost \"{}\"",
        binding.source,
        binding.destination_type.as_str(),
        binding.destination,
        binding.vhost
    );
    match source.kind {
        ExchangeType::Headers => assert.ensure(binding.routing_key().is_empty(), || {
            Failure::new(
                FailureKind::InvalidBindingArguments,
                format!(
                    "Routing key is ignored for headers exchanges, but set (\"{}\") for {}",
                    binding.routing_key(),
                    target
                ),
            )
            .at(path("bindings", idx))
        }),
        ExchangeType::Topic | ExchangeType::Direct => {
            assert.ensure(binding.argument("x-match").is_none(), || {
                Failure::new(
                    FailureKind::InvalidBindingArguments,
                    format!(
                        "Match arguments are ignored for {} exchanges, but set for {}",
                        source.kind.as_str(),
                        target
                    ),
                )
                .at(path("bindings", idx))
            })
        }
    }
}

fn missing_vhost(vhost: &str, section: &str, idx: usize) -> Failure {
    Failure::new(
        FailureKind::MissingReference,
        format!("Missing vhost: \"{}\"", vhost),
    )
    .at(vec![section.to_string(), idx.to_string(), "vhost".to_string()])
}

fn path(section: &str, idx: usize) -> Vec<String> {
    vec![section.to_string(), idx.to_string()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn defs(value: serde_json::Value) -> Definitions {
        Definitions::from_value(value).unwrap()
    }

    #[test]
    fn test_two_pass_resolves_bindings_declared_before_exchanges() {
        // Binding order in the document does not matter: pass 2 runs after
        // every exchange and queue is indexed.
        let d = defs(json!({
            "vhosts": [{ "name": "/" }],
            "bindings": [{ "vhost": "/", "source": "ex", "destination": "q",
                           "destination_type": "queue", "routing_key": "a" }],
            "exchanges": [{ "name": "ex", "vhost": "/", "type": "topic",
                            "durable": true, "auto_delete": false }],
            "queues": [{ "name": "q", "vhost": "/", "durable": true, "auto_delete": false }]
        }));
        let (index, failures) = Index::build(&d, CheckMode::CollectAll);
        assert!(failures.is_empty(), "{:?}", failures);
        assert_eq!(index.bindings_from(&key::exchange("/", "ex")).len(), 1);
        assert_eq!(index.bindings_to(&key::queue("/", "q")).len(), 1);
        assert_eq!(index.resources_in_vhost("/").len(), 2);
    }

    #[test]
    fn test_rebuild_is_idempotent() {
        let d = defs(json!({
            "vhosts": [{ "name": "/" }, { "name": "/" }],
            "queues": [{ "name": "q", "vhost": "/", "durable": true, "auto_delete": false }]
        }));
        let (mut index, first) = Index::build(&d, CheckMode::CollectAll);
        let second = index.rebuild(&d, CheckMode::CollectAll);
        assert_eq!(first, second);
        assert_eq!(index.vhost_count(), 1);
        assert_eq!(index.resources_in_vhost("/").len(), 1);
    }

    #[test]
    fn test_resources_without_natural_key_are_skipped() {
        let d = defs(json!({
            "vhosts": [{ "name": "" }, { "name": "/" }],
            "queues": [{ "name": "", "vhost": "/", "durable": true, "auto_delete": false }]
        }));
        let (index, failures) = Index::build(&d, CheckMode::CollectAll);
        assert!(failures.is_empty());
        assert_eq!(index.vhost_count(), 1);
        assert_eq!(index.queue_count(), 0);
    }

    #[test]
    fn test_queue_in_missing_vhost_is_not_grouped() {
        let d = defs(json!({
            "vhosts": [{ "name": "/" }],
            "queues": [{ "name": "q", "vhost": "ghost", "durable": true, "auto_delete": false }]
        }));
        let (index, failures) = Index::build(&d, CheckMode::CollectAll);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].kind, FailureKind::MissingReference);
        assert!(index.queue("ghost", "q").is_some());
        assert_eq!(index.grouped_vhosts().count(), 0);
    }
}
