//! End-to-end reconcile scenarios: resolve, diff, and apply wired together
//! across multiple passes, against the fakes in [`support`].

mod support;

use std::sync::Arc;
use std::time::SystemTime;

use reconcile_core::apply::{Applier, PluginRegistry};
use reconcile_core::diff::{diff, DiffAction};
use reconcile_core::event::{EventLog, SubstringCountingConsumer};
use reconcile_core::expression::Expression;
use reconcile_core::policy::service::{ComponentCode, ServiceComponent};
use reconcile_core::policy::{Cluster, Context, Contract, Dependency, Policy, Rule, RuleAction, Service, User};
use reconcile_core::resolve::{NoExternalData, PolicyResolution, Resolver};
use reconcile_core::template::ParameterTree;
use reconcile_core::time::ManualClock;
use reconcile_core::{ErrorCategory, ReconcileError};

use support::{FakePlugin, InMemoryExternalData, InMemoryStateUpdater, RecordedCall};

fn web_policy(image_label: &str, dependents: &[(&str, &str)]) -> Policy {
    let mut policy = Policy::new();

    let mut alice = User::new("alice", "Alice");
    alice.labels.set("role", "admin");
    policy.objects.add_user(alice).unwrap();
    let mut bob = User::new("bob", "Bob");
    bob.labels.set("role", "admin");
    policy.objects.add_user(bob).unwrap();

    policy.objects.add_cluster(Cluster::new("cluster-a", "kubernetes")).unwrap();

    let mut service = Service::new("web", "team-a");
    service.components.push(ServiceComponent::new(
        "app",
        ComponentCode::Code {
            code_type: "docker".into(),
            params: ParameterTree::String(format!("image:{image_label}")),
        },
    ));
    policy.objects.add_service(service).unwrap();

    let mut contract = Contract::new("web-contract");
    contract.contexts.push(Context::new("default", "web", "cluster-a"));
    policy.objects.add_contract(contract).unwrap();

    for (dep_name, user_id) in dependents {
        policy
            .objects
            .add_dependency(Dependency::new(*dep_name, *user_id, "web-contract"))
            .unwrap();
    }

    policy
}

fn resolve(policy: &Policy) -> PolicyResolution {
    let external = NoExternalData;
    let events = EventLog::new();
    Resolver::new(policy, &external, &events).resolve().unwrap()
}

/// A full create -> update -> delete reconcile loop. Each pass's `desired`
/// resolution becomes the next pass's diff baseline, while `actual` is
/// carried forward untouched between passes — this is the shape a real
/// control-plane reconcile loop uses.
#[test]
fn multi_pass_reconcile_creates_updates_then_deletes() {
    let code_plugin = Arc::new(FakePlugin::new());
    let mut plugins = PluginRegistry::new();
    plugins.register_cluster_plugin("kubernetes", Arc::new(NoopCluster));
    plugins.register_code_plugin("kubernetes", "docker", code_plugin.clone());

    let state = InMemoryStateUpdater::new();
    let clock = ManualClock::new(SystemTime::UNIX_EPOCH);
    let events = EventLog::new();

    // Pass 1: create.
    let policy_v1 = web_policy("admin", &[("dep1", "alice")]);
    let desired_v1 = resolve(&policy_v1);
    let mut actual = PolicyResolution::new();
    let baseline = PolicyResolution::new();
    let actions = diff(&baseline, &desired_v1);

    let applier = Applier::new(&policy_v1, &plugins, &state, &clock, &events);
    let outcome = applier.apply(&actions, &mut actual, &desired_v1).unwrap();
    assert_eq!(outcome.failed, 0);
    assert_eq!(actual.component_instances.len(), 2);
    let app_key = desired_v1.dependency_instances["dep1"].for_component("app");
    let created_at = actual.instance(&app_key).unwrap().created_at.unwrap();

    // Pass 2: a label change re-renders the component's params, which
    // should produce an Update that preserves created_at.
    clock.advance(std::time::Duration::from_secs(120));
    let policy_v2 = web_policy("staging-admin", &[("dep1", "alice")]);
    let desired_v2 = resolve(&policy_v2);
    let actions = diff(&desired_v1, &desired_v2);
    assert!(actions.iter().any(|a| matches!(a, DiffAction::Update(k) if k == &app_key)));

    let applier = Applier::new(&policy_v2, &plugins, &state, &clock, &events);
    let outcome = applier.apply(&actions, &mut actual, &desired_v2).unwrap();
    assert_eq!(outcome.failed, 0);
    let instance = actual.instance(&app_key).unwrap();
    assert_eq!(instance.created_at, Some(created_at), "update must not reset created_at");
    assert_ne!(instance.updated_at, Some(created_at), "update must bump updated_at");
    assert_eq!(instance.params.as_str(), Some("image:staging-admin"));

    // Pass 3: removing the dependency tears everything down.
    clock.advance(std::time::Duration::from_secs(60));
    let policy_v3 = web_policy("staging-admin", &[]);
    let desired_v3 = resolve(&policy_v3);
    assert!(desired_v3.component_instances.is_empty());
    let actions = diff(&desired_v2, &desired_v3);
    assert!(actions.iter().any(|a| matches!(a, DiffAction::Delete(_))));

    let applier = Applier::new(&policy_v3, &plugins, &state, &clock, &events);
    let outcome = applier.apply(&actions, &mut actual, &desired_v3).unwrap();
    assert_eq!(outcome.failed, 0);
    assert!(actual.component_instances.is_empty());
    assert!(actual.component_processing_order.is_empty());

    let calls = code_plugin.calls();
    assert!(calls.iter().any(|c| matches!(c, RecordedCall::Create(_))));
    assert!(calls.iter().any(|c| matches!(c, RecordedCall::Update(_))));
    assert!(calls.iter().any(|c| matches!(c, RecordedCall::Delete(_))));
}

/// Two dependencies that resolve through the same context/allocation share
/// a single root instance; adding and removing the second dependency emits
/// Attach/Detach rather than duplicate Create/Delete pairs.
#[test]
fn shared_instance_attaches_and_detaches_without_recreating() {
    let code_plugin = Arc::new(FakePlugin::new());
    let mut plugins = PluginRegistry::new();
    plugins.register_cluster_plugin("kubernetes", Arc::new(NoopCluster));
    plugins.register_code_plugin("kubernetes", "docker", code_plugin);
    let state = InMemoryStateUpdater::new();
    let clock = ManualClock::new(SystemTime::UNIX_EPOCH);
    let events = EventLog::new();

    let policy_v1 = web_policy("admin", &[("dep-alice", "alice")]);
    let desired_v1 = resolve(&policy_v1);
    let mut actual = PolicyResolution::new();
    let actions = diff(&PolicyResolution::new(), &desired_v1);
    let applier = Applier::new(&policy_v1, &plugins, &state, &clock, &events);
    applier.apply(&actions, &mut actual, &desired_v1).unwrap();

    let root_key = desired_v1.dependency_instances["dep-alice"].clone();
    let app_key = root_key.for_component("app");
    assert_eq!(actual.instance(&root_key).unwrap().dependency_names.len(), 1);
    assert_eq!(actual.instance(&app_key).unwrap().dependency_names.len(), 1);

    let policy_v2 = web_policy("admin", &[("dep-alice", "alice"), ("dep-bob", "bob")]);
    let desired_v2 = resolve(&policy_v2);
    assert_eq!(desired_v2.component_instances.len(), desired_v1.component_instances.len());

    let actions = diff(&desired_v1, &desired_v2);
    assert!(actions
        .iter()
        .any(|a| matches!(a, DiffAction::Attach { dependency_name, .. } if dependency_name == "dep-bob")));
    let applier = Applier::new(&policy_v2, &plugins, &state, &clock, &events);
    applier.apply(&actions, &mut actual, &desired_v2).unwrap();
    assert_eq!(actual.instance(&root_key).unwrap().dependency_names.len(), 2);
    assert_eq!(actual.instance(&app_key).unwrap().dependency_names.len(), 2);

    let policy_v3 = web_policy("admin", &[("dep-alice", "alice")]);
    let desired_v3 = resolve(&policy_v3);
    let actions = diff(&desired_v2, &desired_v3);
    assert!(actions
        .iter()
        .any(|a| matches!(a, DiffAction::Detach { dependency_name, .. } if dependency_name == "dep-bob")));
    let applier = Applier::new(&policy_v3, &plugins, &state, &clock, &events);
    applier.apply(&actions, &mut actual, &desired_v3).unwrap();
    assert_eq!(actual.instance(&root_key).unwrap().dependency_names.len(), 1);
    assert_eq!(actual.instance(&app_key).unwrap().dependency_names.len(), 1);
}

/// A rule rejecting a dependency leaves it out of the resolution entirely,
/// so no diff action (let alone a plugin call) is ever produced for it.
#[test]
fn rule_rejected_dependency_never_reaches_the_applier() {
    let mut policy = web_policy("admin", &[("dep1", "alice")]);
    let mut rule = Rule::new("no-admins");
    rule.label_criteria.require_any = vec![Expression::parse("role == \"admin\"").unwrap()];
    rule.actions.push(RuleAction::Reject {
        reason: "admins use a different pipeline".into(),
    });
    policy.objects.add_rule(rule).unwrap();

    let desired = resolve(&policy);
    assert!(desired.component_instances.is_empty());
    let actions = diff(&PolicyResolution::new(), &desired);
    assert_eq!(actions, vec![DiffAction::ClustersPostProcess]);
}

/// A resolved instance with no registered code plugin fails just that
/// action; the aggregate apply error carries `ApplyActionFailed`.
#[test]
fn missing_plugin_fails_the_action_not_the_whole_pass() {
    let policy = web_policy("admin", &[("dep1", "alice")]);
    let desired = resolve(&policy);
    let mut actual = PolicyResolution::new();
    let actions = diff(&PolicyResolution::new(), &desired);

    let plugins = PluginRegistry::new();
    let state = InMemoryStateUpdater::new();
    let clock = ManualClock::new(SystemTime::UNIX_EPOCH);
    let events = EventLog::new();
    let applier = Applier::new(&policy, &plugins, &state, &clock, &events);

    let (err, outcome) = applier.apply(&actions, &mut actual, &desired).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::ApplyActionFailed);
    assert!(outcome.failed > 0);
}

/// A panicking plugin is caught at the per-action boundary: the rest of
/// the pass still runs and the failure shows up as a normal error, not a
/// process abort.
#[test]
fn panicking_plugin_does_not_abort_the_rest_of_the_pass() {
    let mut policy = web_policy("admin", &[("dep1", "alice")]);
    policy
        .objects
        .add_service({
            let mut s = Service::new("batch", "team-a");
            s.components.push(ServiceComponent::new(
                "job",
                ComponentCode::Code {
                    code_type: "flaky".into(),
                    params: ParameterTree::Null,
                },
            ));
            s
        })
        .unwrap();
    let mut batch_contract = Contract::new("batch-contract");
    batch_contract.contexts.push(Context::new("default", "batch", "cluster-a"));
    policy.objects.add_contract(batch_contract).unwrap();
    policy
        .objects
        .add_dependency(Dependency::new("dep-batch", "alice", "batch-contract"))
        .unwrap();

    let desired = resolve(&policy);
    let mut actual = PolicyResolution::new();
    let actions = diff(&PolicyResolution::new(), &desired);

    let mut plugins = PluginRegistry::new();
    plugins.register_cluster_plugin("kubernetes", Arc::new(NoopCluster));
    plugins.register_code_plugin("kubernetes", "docker", Arc::new(FakePlugin::new()));
    plugins.register_code_plugin("kubernetes", "flaky", Arc::new(PanickingCode));
    let state = InMemoryStateUpdater::new();
    let clock = ManualClock::new(SystemTime::UNIX_EPOCH);
    let events = EventLog::new();
    let applier = Applier::new(&policy, &plugins, &state, &clock, &events);

    let (err, outcome) = applier.apply(&actions, &mut actual, &desired).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::ApplyActionFailed);
    assert!(outcome.succeeded > 0, "the non-panicking actions must still have run");
    assert!(outcome.failed > 0);
}

/// A service whose components reference each other cyclically fails policy
/// validation up front: the resolver returns a component-cycle error and
/// produces no resolution at all, rather than resolving partially.
#[test]
fn component_cycle_is_rejected_with_no_resolution_produced() {
    let mut policy = Policy::new();
    policy.objects.add_user(User::new("alice", "Alice")).unwrap();
    policy.objects.add_cluster(Cluster::new("cluster-a", "kubernetes")).unwrap();

    let mut service = Service::new("web", "team-a");
    let mut c1 = ServiceComponent::new(
        "c1",
        ComponentCode::Code {
            code_type: "docker".into(),
            params: ParameterTree::Null,
        },
    );
    c1.dependencies.push("c2".into());
    let mut c2 = ServiceComponent::new(
        "c2",
        ComponentCode::Code {
            code_type: "docker".into(),
            params: ParameterTree::Null,
        },
    );
    c2.dependencies.push("c1".into());
    service.components.push(c1);
    service.components.push(c2);
    policy.objects.add_service(service).unwrap();

    let mut contract = Contract::new("web-contract");
    contract.contexts.push(Context::new("default", "web", "cluster-a"));
    policy.objects.add_contract(contract).unwrap();
    policy.objects.add_dependency(Dependency::new("dep1", "alice", "web-contract")).unwrap();

    let external = InMemoryExternalData::new();
    let events = EventLog::new();

    let err = Resolver::new(&policy, &external, &events).resolve().unwrap_err();
    assert_eq!(err.code(), reconcile_core::error::codes::POLICY_COMPONENT_CYCLE);
    assert_eq!(err.category(), ErrorCategory::PolicyMalformed);
}

/// A code plugin that fails every call still lets the Event log surface
/// exactly why each action failed, via a substring-matching consumer.
#[test]
fn failed_action_messages_are_observable_through_the_event_log() {
    let policy = web_policy("admin", &[("dep1", "alice")]);
    let desired = resolve(&policy);
    let mut actual = PolicyResolution::new();
    let actions = diff(&PolicyResolution::new(), &desired);

    let mut plugins = PluginRegistry::new();
    plugins.register_cluster_plugin("kubernetes", Arc::new(NoopCluster));
    plugins.register_code_plugin("kubernetes", "docker", Arc::new(AlwaysFailingCode));
    let state = InMemoryStateUpdater::new();
    let clock = ManualClock::new(SystemTime::UNIX_EPOCH);

    let recorder = Arc::new(SubstringCountingConsumer::new("failed"));
    let mut events = EventLog::new();
    events.add_consumer(RecorderBridge(recorder.clone()));

    let applier = Applier::new(&policy, &plugins, &state, &clock, &events);
    let (_, outcome) = applier.apply(&actions, &mut actual, &desired).unwrap_err();
    assert_eq!(recorder.count(), outcome.failed);
}

struct RecorderBridge(Arc<SubstringCountingConsumer>);
impl reconcile_core::event::EventConsumer for RecorderBridge {
    fn consume(&self, record: &reconcile_core::event::EventRecord) {
        self.0.consume(record);
    }
}

struct AlwaysFailingCode;
impl reconcile_core::apply::CodePlugin for AlwaysFailingCode {
    fn create(&self, _ctx: &reconcile_core::apply::ApplyContext<'_>) -> Result<(), ReconcileError> {
        Err(ReconcileError::new(
            reconcile_core::error::codes::APPLY_ACTION_FAILED,
            ErrorCategory::ApplyActionFailed,
            "simulated plugin-side failure",
        ))
    }
    fn update(&self, _ctx: &reconcile_core::apply::ApplyContext<'_>) -> Result<(), ReconcileError> {
        Ok(())
    }
    fn delete(&self, _ctx: &reconcile_core::apply::ApplyContext<'_>) -> Result<(), ReconcileError> {
        Ok(())
    }
}

struct NoopCluster;
impl reconcile_core::apply::ClusterPlugin for NoopCluster {
    fn create(&self, _ctx: &reconcile_core::apply::ApplyContext<'_>) -> Result<(), reconcile_core::ReconcileError> {
        Ok(())
    }
    fn update(&self, _ctx: &reconcile_core::apply::ApplyContext<'_>) -> Result<(), reconcile_core::ReconcileError> {
        Ok(())
    }
    fn delete(&self, _ctx: &reconcile_core::apply::ApplyContext<'_>) -> Result<(), reconcile_core::ReconcileError> {
        Ok(())
    }
}

struct PanickingCode;
impl reconcile_core::apply::CodePlugin for PanickingCode {
    fn create(&self, _ctx: &reconcile_core::apply::ApplyContext<'_>) -> Result<(), reconcile_core::ReconcileError> {
        panic!("flaky job plugin exploded");
    }
    fn update(&self, _ctx: &reconcile_core::apply::ApplyContext<'_>) -> Result<(), reconcile_core::ReconcileError> {
        Ok(())
    }
    fn delete(&self, _ctx: &reconcile_core::apply::ApplyContext<'_>) -> Result<(), reconcile_core::ReconcileError> {
        Ok(())
    }
}
