//! Reconciling a live broker with a desired definitions document
//!
//! Deploy is split in two: [`plan_deploy`] is a pure function from (live,
//! desired) to an ordered list of create/delete operations, and [`deploy`]
//! executes a plan against a [`ManagementApi`] one call at a time.
//!
//! Ordering works on dependency tiers:
//!
//! | tier | categories |
//! |------|------------|
//! | 0 | vhosts |
//! | 1 | users |
//! | 2 | queues, exchanges |
//! | 3 | bindings |
//! | 4 | permissions, topic permissions, policies, parameters, global parameters |
//!
//! All deletions run first, highest tier first; creations follow, lowest tier
//! first. Within a tier the plan keeps category order, then document order.
//!
//! A run is not transactional. A failed operation is recorded and the run
//! moves on; dropping the future stops further calls but leaves applied ones
//! in place.

use crate::management::ManagementApi;
use rabval_core::config::RabvalConfig;
use rabval_core::diff::{compute_diff, DefinitionsDiff};
use rabval_core::errors::{ExError, ExErrorKind, Result};
use rabval_core::ignore::IgnoreList;
use rabval_core::key::{self, Resource};
use rabval_core::model::*;
use rabval_core::{log_op_end, log_op_error, log_op_start};
use rabval_core_types::RunId;
use serde::Serialize;
use std::cmp::Reverse;
use std::collections::HashSet;
use std::time::Instant;

#[derive(Debug, Clone, Default)]
pub struct DeployOptions {
    /// Plan and report without issuing any mutating call
    pub dry_run: bool,
    /// Keep resources that exist on the broker but not in the document
    pub no_deletions: bool,
    /// Delete and re-create resources whose properties changed
    pub recreate_changed: bool,
    pub ignore: IgnoreList,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Create,
    Delete,
}

/// One mutating management API call
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    pub kind: OperationKind,
    pub resource: AnyResource,
}

impl Operation {
    pub fn create(resource: AnyResource) -> Self {
        Self {
            kind: OperationKind::Create,
            resource,
        }
    }

    pub fn delete(resource: AnyResource) -> Self {
        Self {
            kind: OperationKind::Delete,
            resource,
        }
    }

    pub fn category(&self) -> Category {
        self.resource.category()
    }

    pub fn identity(&self) -> String {
        self.resource.identity()
    }

    fn tier(&self) -> u8 {
        tier(self.category())
    }
}

impl Serialize for Operation {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("Operation", 4)?;
        state.serialize_field("kind", &self.kind)?;
        state.serialize_field("category", &self.category())?;
        state.serialize_field("identity", &self.identity())?;
        state.serialize_field("resource", &self.resource)?;
        state.end()
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let verb = match self.kind {
            OperationKind::Create => "create",
            OperationKind::Delete => "delete",
        };
        write!(f, "{} {} {}", verb, self.category(), self.identity())
    }
}

/// A changed resource left alone because recreation was not requested
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedChange {
    pub category: Category,
    pub identity: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DeployPlan {
    pub operations: Vec<Operation>,
    pub skipped_changes: Vec<SkippedChange>,
}

impl DeployPlan {
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn count(&self, kind: OperationKind) -> usize {
        self.operations.iter().filter(|op| op.kind == kind).count()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "message", rename_all = "snake_case")]
pub enum OperationStatus {
    Applied,
    DryRun,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperationOutcome {
    pub operation: Operation,
    #[serde(flatten)]
    pub status: OperationStatus,
}

/// What a deploy run did, operation by operation
#[derive(Debug, Clone, Serialize)]
pub struct DeployReport {
    pub run_id: String,
    pub outcomes: Vec<OperationOutcome>,
    pub skipped_changes: Vec<SkippedChange>,
}

impl DeployReport {
    /// True when no operation failed
    pub fn is_success(&self) -> bool {
        !self
            .outcomes
            .iter()
            .any(|o| matches!(o.status, OperationStatus::Failed(_)))
    }

    /// Failed operations as `DeployOperation` errors carrying category and
    /// identity
    pub fn failures(&self) -> Vec<ExError> {
        self.outcomes
            .iter()
            .filter_map(|o| match &o.status {
                OperationStatus::Failed(message) => Some(
                    ExError::new(ExErrorKind::DeployOperation)
                        .with_op("deploy")
                        .with_category(o.operation.category())
                        .with_identity(o.operation.identity())
                        .with_message(message.clone()),
                ),
                _ => None,
            })
            .collect()
    }

    /// The planned operation sequence, whatever the outcome
    pub fn operations(&self) -> impl Iterator<Item = &Operation> {
        self.outcomes.iter().map(|o| &o.operation)
    }
}

fn tier(category: Category) -> u8 {
    match category {
        Category::Vhosts => 0,
        Category::Users => 1,
        Category::Queues | Category::Exchanges => 2,
        Category::Bindings => 3,
        Category::Permissions
        | Category::TopicPermissions
        | Category::Policies
        | Category::Parameters
        | Category::GlobalParameters => 4,
    }
}

/// Compute the operations that turn `live` into `desired`
///
/// # Errors
///
/// As [`compute_diff`]: a document with duplicate identities is refused and
/// nothing is planned.
pub fn plan_deploy(
    live: &Definitions,
    desired: &Definitions,
    options: &DeployOptions,
) -> Result<DeployPlan> {
    let diff = compute_diff(live, desired, &options.ignore)?;

    let mut planner = Planner::default();
    planner.collect::<Vhost>(&diff, options);
    planner.collect::<User>(&diff, options);
    planner.collect::<Queue>(&diff, options);
    planner.collect::<Exchange>(&diff, options);
    planner.collect::<Binding>(&diff, options);
    planner.collect::<Permission>(&diff, options);
    planner.collect::<TopicPermission>(&diff, options);
    planner.collect::<Policy>(&diff, options);
    planner.collect::<Parameter>(&diff, options);
    planner.collect::<GlobalParameter>(&diff, options);

    if options.recreate_changed {
        planner.recreate_dependents(desired, &options.ignore);
    }
    planner.restore_topic_permissions(desired, &options.ignore);
    Ok(planner.finish())
}

#[derive(Default)]
struct Planner {
    deletions: Vec<Operation>,
    creations: Vec<Operation>,
    created: HashSet<(Category, String)>,
    recreated: Recreated,
    skipped: Vec<SkippedChange>,
}

/// Resources deleted and re-created by the plan; the broker drops whatever
/// hangs off them
#[derive(Default)]
struct Recreated {
    vhosts: HashSet<String>,
    users: HashSet<String>,
    queues: HashSet<String>,
    exchanges: HashSet<String>,
}

impl Recreated {
    fn is_empty(&self) -> bool {
        self.vhosts.is_empty()
            && self.users.is_empty()
            && self.queues.is_empty()
            && self.exchanges.is_empty()
    }

    fn note(&mut self, resource: &AnyResource) {
        match resource {
            AnyResource::Vhost(v) => {
                self.vhosts.insert(v.name.clone());
            }
            AnyResource::User(u) => {
                self.users.insert(u.name.clone());
            }
            AnyResource::Queue(q) => {
                self.queues.insert(q.identity());
            }
            AnyResource::Exchange(e) => {
                self.exchanges.insert(e.identity());
            }
            _ => {}
        }
    }

    /// Whether `resource` disappears from the broker along with a recreated
    /// resource
    fn drops(&self, resource: &AnyResource) -> bool {
        if let Some(vhost) = resource.vhost() {
            if !matches!(resource, AnyResource::Vhost(_)) && self.vhosts.contains(vhost) {
                return true;
            }
        }
        match resource {
            AnyResource::Permission(p) => self.users.contains(&p.user),
            AnyResource::TopicPermission(p) => self.users.contains(&p.user),
            AnyResource::Binding(b) => {
                self.exchanges.contains(&key::exchange(&b.vhost, &b.source))
                    || match b.destination_type {
                        DestinationType::Queue => {
                            self.queues.contains(&key::queue(&b.vhost, &b.destination))
                        }
                        DestinationType::Exchange => self
                            .exchanges
                            .contains(&key::exchange(&b.vhost, &b.destination)),
                    }
            }
            _ => false,
        }
    }
}

impl Planner {
    fn create(&mut self, resource: AnyResource) {
        self.created
            .insert((resource.category(), resource.identity()));
        self.creations.push(Operation::create(resource));
    }

    fn collect<T: Resource>(&mut self, diff: &DefinitionsDiff, options: &DeployOptions) {
        if !options.no_deletions {
            for entry in T::in_set(&diff.deleted) {
                self.deletions.push(Operation::delete(entry.clone().into_any()));
            }
        }

        for change in T::in_changes(&diff.changed) {
            if options.recreate_changed {
                let before = change.before.clone().into_any();
                self.recreated.note(&before);
                self.deletions.push(Operation::delete(before));
                self.create(change.after.clone().into_any());
            } else {
                self.skipped.push(SkippedChange {
                    category: T::CATEGORY,
                    identity: change.identity(),
                });
            }
        }

        for entry in T::in_set(&diff.added) {
            self.create(entry.clone().into_any());
        }
    }

    /// Re-create, from the desired document, everything the broker drops
    /// together with a recreated resource
    ///
    /// Dropped dependents are not deleted explicitly; the broker already
    /// removed them by the time their delete would run.
    fn recreate_dependents(&mut self, desired: &Definitions, ignore: &IgnoreList) {
        if self.recreated.is_empty() {
            return;
        }
        let mut dependents = Vec::new();
        push_kept::<Queue>(desired, ignore, &mut dependents);
        push_kept::<Exchange>(desired, ignore, &mut dependents);
        push_kept::<Binding>(desired, ignore, &mut dependents);
        push_kept::<Permission>(desired, ignore, &mut dependents);
        push_kept::<TopicPermission>(desired, ignore, &mut dependents);
        push_kept::<Policy>(desired, ignore, &mut dependents);
        push_kept::<Parameter>(desired, ignore, &mut dependents);

        for resource in dependents {
            if !self.recreated.drops(&resource) {
                continue;
            }
            if self
                .created
                .contains(&(resource.category(), resource.identity()))
            {
                continue;
            }
            tracing::debug!(
                category = %resource.category(),
                identity = %resource.identity(),
                "re-creating dependent of a recreated resource"
            );
            self.create(resource);
        }
    }

    /// Re-create the desired topic permissions that share a user and vhost
    /// with a deleted one
    ///
    /// The management API deletes topic permissions per user and vhost, so
    /// removing one exchange's entry removes its siblings as well.
    fn restore_topic_permissions(&mut self, desired: &Definitions, ignore: &IgnoreList) {
        let cleared: HashSet<(String, String)> = self
            .deletions
            .iter()
            .filter_map(|op| match &op.resource {
                AnyResource::TopicPermission(t) => Some((t.user.clone(), t.vhost.clone())),
                _ => None,
            })
            .collect();
        if cleared.is_empty() {
            return;
        }
        let mut kept = Vec::new();
        push_kept::<TopicPermission>(desired, ignore, &mut kept);
        for resource in kept {
            let AnyResource::TopicPermission(t) = &resource else {
                continue;
            };
            if !cleared.contains(&(t.user.clone(), t.vhost.clone())) {
                continue;
            }
            if self
                .created
                .contains(&(resource.category(), resource.identity()))
            {
                continue;
            }
            tracing::debug!(
                identity = %resource.identity(),
                "re-creating topic permission cleared with a sibling"
            );
            self.create(resource);
        }
    }

    fn finish(mut self) -> DeployPlan {
        self.deletions.sort_by_key(|op| Reverse(op.tier()));
        self.creations.sort_by_key(|op| op.tier());
        let mut operations = self.deletions;
        operations.extend(self.creations);
        DeployPlan {
            operations,
            skipped_changes: self.skipped,
        }
    }
}

fn push_kept<T: Resource>(defs: &Definitions, ignore: &IgnoreList, out: &mut Vec<AnyResource>) {
    for entry in T::section(defs) {
        if !ignore.is_ignored(T::CATEGORY, &entry.identity()) {
            out.push(entry.clone().into_any());
        }
    }
}

/// Bring the broker behind `api` in line with `desired`
///
/// Fetches the live definitions, plans, then runs every operation in order.
/// Consecutive mutating calls are separated by `config.request_delay`. With
/// `dry_run` no mutating call is made and every operation is reported as
/// [`OperationStatus::DryRun`].
///
/// # Errors
///
/// Only when the live definitions cannot be fetched or the plan cannot be
/// computed. Failures of individual operations are recorded in the report.
pub async fn deploy(
    api: &dyn ManagementApi,
    desired: &Definitions,
    options: &DeployOptions,
    config: &RabvalConfig,
) -> Result<DeployReport> {
    let run_id = RunId::new();
    let start = Instant::now();
    log_op_start!(
        "deploy",
        run_id = %run_id,
        dry_run = options.dry_run,
        no_deletions = options.no_deletions,
        recreate_changed = options.recreate_changed
    );

    let plan = match fetch_and_plan(api, desired, options).await {
        Ok(plan) => plan,
        Err(err) => {
            log_op_error!(
                "deploy",
                err.clone(),
                duration_ms = start.elapsed().as_millis() as u64
            );
            return Err(err);
        }
    };
    tracing::info!(
        run_id = %run_id,
        deletions = plan.count(OperationKind::Delete),
        creations = plan.count(OperationKind::Create),
        skipped_changes = plan.skipped_changes.len(),
        "deploy plan ready"
    );

    let report = execute(api, plan, options, config, &run_id).await;
    let failed = report.failures().len();
    log_op_end!(
        "deploy",
        duration_ms = start.elapsed().as_millis() as u64,
        run_id = %run_id,
        operations = report.outcomes.len(),
        failed = failed
    );
    Ok(report)
}

async fn fetch_and_plan(
    api: &dyn ManagementApi,
    desired: &Definitions,
    options: &DeployOptions,
) -> Result<DeployPlan> {
    let live = api.fetch_definitions().await?;
    plan_deploy(&live, desired, options)
}

async fn execute(
    api: &dyn ManagementApi,
    plan: DeployPlan,
    options: &DeployOptions,
    config: &RabvalConfig,
    run_id: &RunId,
) -> DeployReport {
    let mut outcomes = Vec::with_capacity(plan.operations.len());
    let mut issued = 0usize;

    for operation in plan.operations {
        let status = if options.dry_run {
            OperationStatus::DryRun
        } else {
            if issued > 0 && !config.request_delay.is_zero() {
                tokio::time::sleep(config.request_delay).await;
            }
            issued += 1;
            let result = match operation.kind {
                OperationKind::Create => api.create(&operation.resource).await,
                OperationKind::Delete => api.delete(&operation.resource).await,
            };
            match result {
                Ok(()) => OperationStatus::Applied,
                Err(err) => {
                    tracing::warn!(
                        run_id = %run_id,
                        category = %operation.category(),
                        identity = %operation.identity(),
                        err_code = err.code(),
                        "deploy operation failed: {}",
                        err
                    );
                    OperationStatus::Failed(err.to_string())
                }
            }
        };
        tracing::debug!(run_id = %run_id, status = ?status, "{}", operation);
        outcomes.push(OperationOutcome { operation, status });
    }

    DeployReport {
        run_id: run_id.to_string(),
        outcomes,
        skipped_changes: plan.skipped_changes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn defs(value: serde_json::Value) -> Definitions {
        Definitions::from_value(value).unwrap()
    }

    fn summary(plan: &DeployPlan) -> Vec<String> {
        plan.operations.iter().map(|op| op.to_string()).collect()
    }

    #[test]
    fn test_tiers_follow_dependencies() {
        assert!(tier(Category::Vhosts) < tier(Category::Users));
        assert!(tier(Category::Users) < tier(Category::Queues));
        assert_eq!(tier(Category::Queues), tier(Category::Exchanges));
        assert!(tier(Category::Exchanges) < tier(Category::Bindings));
        assert!(tier(Category::Bindings) < tier(Category::Policies));
    }

    #[test]
    fn test_empty_documents_plan_nothing() {
        let plan = plan_deploy(
            &Definitions::default(),
            &Definitions::default(),
            &DeployOptions::default(),
        )
        .unwrap();
        assert!(plan.is_empty());
        assert!(plan.skipped_changes.is_empty());
    }

    #[test]
    fn test_deletions_precede_creations() {
        let live = defs(json!({ "vhosts": [{ "name": "old" }] }));
        let desired = defs(json!({ "vhosts": [{ "name": "new" }] }));
        let plan = plan_deploy(&live, &desired, &DeployOptions::default()).unwrap();
        assert_eq!(summary(&plan), vec!["delete vhosts old", "create vhosts new"]);
    }

    #[test]
    fn test_changed_user_is_skipped_by_default() {
        let live = defs(json!({ "users": [{ "name": "u", "password_hash": "a" }] }));
        let desired = defs(json!({ "users": [{ "name": "u", "password_hash": "b" }] }));
        let plan = plan_deploy(&live, &desired, &DeployOptions::default()).unwrap();
        assert!(plan.is_empty());
        assert_eq!(
            plan.skipped_changes,
            vec![SkippedChange {
                category: Category::Users,
                identity: "U[u]".to_string()
            }]
        );
    }

    #[test]
    fn test_recreated_user_brings_back_permissions() {
        let live = defs(json!({
            "vhosts": [{ "name": "/" }],
            "users": [{ "name": "u", "password_hash": "a" }],
            "permissions": [{ "user": "u", "vhost": "/", "configure": ".*" }]
        }));
        let mut desired = live.clone();
        desired.users[0].password_hash = "b".to_string();

        let options = DeployOptions {
            recreate_changed: true,
            ..Default::default()
        };
        let plan = plan_deploy(&live, &desired, &options).unwrap();
        assert_eq!(
            summary(&plan),
            vec![
                "delete users U[u]",
                "create users U[u]",
                "create permissions P[u @ /]",
            ]
        );
    }

    #[test]
    fn test_deleting_one_topic_permission_restores_its_siblings() {
        let live = defs(json!({
            "topic_permissions": [
                { "user": "u", "vhost": "/", "exchange": "a", "write": ".*", "read": ".*" },
                { "user": "u", "vhost": "/", "exchange": "b", "write": ".*", "read": ".*" },
                { "user": "w", "vhost": "/", "exchange": "c", "write": ".*", "read": ".*" }
            ]
        }));
        let desired = defs(json!({
            "topic_permissions": [
                { "user": "u", "vhost": "/", "exchange": "b", "write": ".*", "read": ".*" },
                { "user": "w", "vhost": "/", "exchange": "c", "write": ".*", "read": ".*" }
            ]
        }));
        let plan = plan_deploy(&live, &desired, &DeployOptions::default()).unwrap();
        assert_eq!(
            summary(&plan),
            vec![
                "delete topic_permissions T[u @ /](a)",
                "create topic_permissions T[u @ /](b)",
            ]
        );
    }

    #[test]
    fn test_report_failures_carry_identity() {
        let report = DeployReport {
            run_id: "r".to_string(),
            outcomes: vec![OperationOutcome {
                operation: Operation::create(AnyResource::Vhost(Vhost {
                    name: "eu".to_string(),
                    extra: Default::default(),
                })),
                status: OperationStatus::Failed("boom".to_string()),
            }],
            skipped_changes: Vec::new(),
        };
        assert!(!report.is_success());
        let failures = report.failures();
        assert_eq!(failures[0].kind(), ExErrorKind::DeployOperation);
        assert_eq!(failures[0].category(), Some(Category::Vhosts));
        assert_eq!(failures[0].identity(), Some("eu"));
    }
}
