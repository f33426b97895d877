//! The applier: executes a [`DiffAction`] list sequentially against the
//! registered plugins, one action at a time, with a panic-recovery
//! boundary per action so a single misbehaving plugin cannot take down the
//! rest of the pass.
//!
//! `apply` takes two resolutions: `actual`, the accumulating record of
//! what has really been applied (carried forward, pass to pass, by the
//! caller), and `desired`, the fresh output of the current resolve pass
//! that the diff was computed from. Every action reads its "what should
//! this look like" data from `desired` and mutates `actual` in place —
//! `actual` is the only resolution whose `created_at` survives across
//! passes, since `desired` is rebuilt from scratch every time.

use std::panic::{self, AssertUnwindSafe};
use std::time::Duration;

use crate::apply::context::ApplyContext;
use crate::apply::plugin::PluginRegistry;
use crate::apply::state::StateUpdater;
use crate::diff::DiffAction;
use crate::error::{codes, ErrorCategory, ReconcileError};
use crate::event::{EventLog, Subsystem};
use crate::policy::Policy;
use crate::progress::{NullProgressReporter, ProgressReporter};
use crate::resolve::{ComponentInstance, ComponentInstanceKey, ComponentKeySegment, PolicyResolution};
use crate::time::{Clock, Deadline};

/// Tally of how an apply pass went. Returned alongside the aggregate
/// [`Result`] so a caller can report partial progress even when the pass
/// as a whole is an error.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ApplyOutcome {
    pub succeeded: usize,
    pub failed: usize,
}

pub struct Applier<'a> {
    policy: &'a Policy,
    plugins: &'a PluginRegistry,
    state: &'a dyn StateUpdater,
    clock: &'a dyn Clock,
    events: &'a EventLog,
    action_timeout: Duration,
    progress: &'a dyn ProgressReporter,
}

impl<'a> Applier<'a> {
    pub fn new(
        policy: &'a Policy,
        plugins: &'a PluginRegistry,
        state: &'a dyn StateUpdater,
        clock: &'a dyn Clock,
        events: &'a EventLog,
    ) -> Self {
        Self {
            policy,
            plugins,
            state,
            clock,
            events,
            action_timeout: Duration::from_secs(30),
            progress: &NullProgressReporter,
        }
    }

    pub fn with_action_timeout(mut self, timeout: Duration) -> Self {
        self.action_timeout = timeout;
        self
    }

    pub fn with_config(mut self, config: &crate::config::ReconcileConfig) -> Self {
        self.action_timeout = config.action_timeout;
        self
    }

    pub fn with_progress_reporter(mut self, progress: &'a dyn ProgressReporter) -> Self {
        self.progress = progress;
        self
    }

    /// Executes every action, mutating `actual` in place: successful
    /// creates/updates copy instance data over from `desired` and stamp
    /// timestamps, successful deletes remove the instance from `actual`
    /// entirely. `desired` is read-only — it is the resolution the diff
    /// was computed against, and its own timestamps are never populated
    ///.
    ///
    /// Returns `Ok` only if every action succeeded; a partial failure is
    /// still reflected in `actual` and in the returned [`ApplyOutcome`]
    /// even though the top-level result is `Err`.
    #[tracing::instrument(name = "apply", skip_all, fields(actions = actions.len()))]
    pub fn apply(
        &self,
        actions: &[DiffAction],
        actual: &mut PolicyResolution,
        desired: &PolicyResolution,
    ) -> Result<ApplyOutcome, (ReconcileError, ApplyOutcome)> {
        let mut outcome = ApplyOutcome::default();
        let total = actions.len();

        for (index, action) in actions.iter().enumerate() {
            self.progress.on_action_started(index, total, action);
            match self.apply_one(action, actual, desired) {
                Ok(()) => {
                    outcome.succeeded += 1;
                    self.events.info(Subsystem::Apply, format!("{action} succeeded"));
                    self.progress.on_action_finished(index, total, action, true);
                }
                Err(err) => {
                    outcome.failed += 1;
                    self.events
                        .error(Subsystem::Apply, format!("{action} failed: {err}"));
                    self.progress.on_action_finished(index, total, action, false);
                }
            }
        }

        actual.dependency_instances = desired.dependency_instances.clone();

        if outcome.failed > 0 {
            Err((
                ReconcileError::new(
                    codes::APPLY_ACTION_FAILED,
                    ErrorCategory::ApplyActionFailed,
                    format!("{} of {} actions failed", outcome.failed, outcome.succeeded + outcome.failed),
                ),
                outcome,
            ))
        } else {
            Ok(outcome)
        }
    }

    fn apply_one(
        &self,
        action: &DiffAction,
        actual: &mut PolicyResolution,
        desired: &PolicyResolution,
    ) -> Result<(), ReconcileError> {
        match panic::catch_unwind(AssertUnwindSafe(|| self.execute(action, actual, desired))) {
            Ok(result) => result,
            Err(payload) => {
                let message = panic_message(&payload);
                Err(ReconcileError::new(
                    codes::APPLY_ACTION_PANICKED,
                    ErrorCategory::ApplyActionFailed,
                    format!("action '{action}' panicked: {message}"),
                ))
            }
        }
    }

    fn execute(
        &self,
        action: &DiffAction,
        actual: &mut PolicyResolution,
        desired: &PolicyResolution,
    ) -> Result<(), ReconcileError> {
        match action {
            DiffAction::Create(key) => self.create(key, actual, desired),
            DiffAction::Update(key) => self.update(key, actual, desired),
            DiffAction::Delete(key) => self.delete(key, actual),
            DiffAction::Attach { key, dependency_name } => self.attach(key, dependency_name, actual, desired),
            DiffAction::Detach { key, dependency_name } => self.detach(key, dependency_name, actual, desired),
            DiffAction::ClustersPostProcess => self.clusters_post_process(actual),
        }
    }

    fn cluster_for(&self, key: &ComponentInstanceKey) -> Result<&'a crate::policy::Cluster, ReconcileError> {
        let cluster_name = key.cluster.as_deref().ok_or_else(|| {
            ReconcileError::new(
                codes::POLICY_DANGLING_REFERENCE,
                ErrorCategory::PolicyMalformed,
                format!("instance {key} has no cluster assigned"),
            )
        })?;
        self.policy.objects.cluster(cluster_name).ok_or_else(|| {
            ReconcileError::new(
                codes::POLICY_DANGLING_REFERENCE,
                ErrorCategory::PolicyMalformed,
                format!("instance {key} references unknown cluster '{cluster_name}'"),
            )
        })
    }

    fn create(
        &self,
        key: &ComponentInstanceKey,
        actual: &mut PolicyResolution,
        desired: &PolicyResolution,
    ) -> Result<(), ReconcileError> {
        let cluster = self.cluster_for(key)?;
        let instance = desired.instance(key).ok_or_else(|| missing_instance(key))?.clone();
        let ctx = ApplyContext {
            key,
            instance: &instance,
            cluster,
            deadline: Deadline::after(self.action_timeout),
        };

        let plugin_result = match &key.component {
            ComponentKeySegment::Root => self.cluster_plugin(cluster).and_then(|plugin| plugin.create(&ctx)),
            ComponentKeySegment::Component(_) => {
                self.code_plugin(cluster, &instance).and_then(|plugin| plugin.create(&ctx))
            }
        };

        // A failed root create still leaves a parent entry in `actual` so
        // that any of the service's components that do get created have
        // somewhere to attach; a failed component create has nothing
        // depending on it and is simply not recorded.
        if plugin_result.is_err() && !key.is_root() {
            return plugin_result;
        }

        let now = self.clock.now();
        let mut stamped: ComponentInstance = instance;
        stamped.created_at = Some(now);
        stamped.updated_at = Some(now);
        actual.component_instances.insert(key.clone(), stamped);
        if !actual.component_processing_order.contains(key) {
            actual.component_processing_order.push(key.clone());
        }

        plugin_result?;
        self.state.instance_created(key, now)?;
        Ok(())
    }

    fn update(
        &self,
        key: &ComponentInstanceKey,
        actual: &mut PolicyResolution,
        desired: &PolicyResolution,
    ) -> Result<(), ReconcileError> {
        let cluster = self.cluster_for(key)?;
        let desired_instance = desired.instance(key).ok_or_else(|| missing_instance(key))?.clone();
        let ctx = ApplyContext {
            key,
            instance: &desired_instance,
            cluster,
            deadline: Deadline::after(self.action_timeout),
        };

        match &key.component {
            ComponentKeySegment::Root => self.cluster_plugin(cluster)?.update(&ctx)?,
            ComponentKeySegment::Component(_) => self.code_plugin(cluster, &desired_instance)?.update(&ctx)?,
        }

        let now = self.clock.now();
        self.state.instance_updated(key, now)?;
        let created_at = actual.instance(key).and_then(|existing| existing.created_at);
        let mut stamped = desired_instance;
        stamped.created_at = created_at;
        stamped.updated_at = Some(now);
        actual.component_instances.insert(key.clone(), stamped);
        Ok(())
    }

    fn delete(&self, key: &ComponentInstanceKey, actual: &mut PolicyResolution) -> Result<(), ReconcileError> {
        let cluster = self.cluster_for(key)?;
        let instance = actual.instance(key).ok_or_else(|| missing_instance(key))?.clone();
        let ctx = ApplyContext {
            key,
            instance: &instance,
            cluster,
            deadline: Deadline::after(self.action_timeout),
        };

        match &key.component {
            ComponentKeySegment::Root => self.cluster_plugin(cluster)?.delete(&ctx)?,
            ComponentKeySegment::Component(_) => self.code_plugin(cluster, &instance)?.delete(&ctx)?,
        }

        self.state.instance_deleted(key)?;
        actual.component_instances.remove(key);
        actual.component_processing_order.retain(|k| k != key);
        Ok(())
    }

    fn attach(
        &self,
        key: &ComponentInstanceKey,
        dependency_name: &str,
        actual: &mut PolicyResolution,
        desired: &PolicyResolution,
    ) -> Result<(), ReconcileError> {
        let cluster = self.cluster_for(key)?;
        let instance = desired.instance(key).ok_or_else(|| missing_instance(key))?.clone();
        if key.is_root() {
            let ctx = ApplyContext {
                key,
                instance: &instance,
                cluster,
                deadline: Deadline::after(self.action_timeout),
            };
            self.cluster_plugin(cluster)?.attach(&ctx, dependency_name)?;
        }
        if let Some(existing) = actual.instance_mut(key) {
            existing.dependency_names.insert(dependency_name.to_string());
        }
        Ok(())
    }

    fn detach(
        &self,
        key: &ComponentInstanceKey,
        dependency_name: &str,
        actual: &mut PolicyResolution,
        desired: &PolicyResolution,
    ) -> Result<(), ReconcileError> {
        let cluster = self.cluster_for(key)?;
        // The key is still present in `actual` (detach never implies
        // delete), but may already be gone from `desired` if this detach
        // is riding along with a Delete for the same key; fall back to
        // `actual`'s own copy in that case.
        let instance = desired
            .instance(key)
            .or_else(|| actual.instance(key))
            .ok_or_else(|| missing_instance(key))?
            .clone();
        if key.is_root() {
            let ctx = ApplyContext {
                key,
                instance: &instance,
                cluster,
                deadline: Deadline::after(self.action_timeout),
            };
            self.cluster_plugin(cluster)?.detach(&ctx, dependency_name)?;
        }
        if let Some(existing) = actual.instance_mut(key) {
            existing.dependency_names.remove(dependency_name);
        }
        Ok(())
    }

    fn clusters_post_process(&self, actual: &mut PolicyResolution) -> Result<(), ReconcileError> {
        for cluster in self.policy.objects.clusters() {
            let Some(plugin) = self.plugins.cluster_plugin(&cluster.cluster_type) else {
                continue;
            };
            plugin.validate(cluster)?;
            plugin.post_process(cluster)?;

            let keys: Vec<ComponentInstanceKey> = actual
                .component_processing_order
                .iter()
                .filter(|key| key.cluster.as_deref() == Some(cluster.name.as_str()))
                .cloned()
                .collect();
            for key in keys {
                let Some(instance) = actual.instance(&key).cloned() else {
                    continue;
                };
                let ctx = ApplyContext {
                    key: &key,
                    instance: &instance,
                    cluster,
                    deadline: Deadline::after(self.action_timeout),
                };
                let endpoints = match &key.component {
                    ComponentKeySegment::Root => plugin.endpoints(&ctx)?,
                    ComponentKeySegment::Component(_) => match self.code_plugin(cluster, &instance) {
                        Ok(code_plugin) => code_plugin.endpoints(&ctx)?,
                        Err(_) => continue,
                    },
                };
                if let Some(existing) = actual.instance_mut(&key) {
                    existing.endpoint_urls.extend(endpoints);
                }
            }
        }
        Ok(())
    }

    fn cluster_plugin(
        &self,
        cluster: &crate::policy::Cluster,
    ) -> Result<&'a std::sync::Arc<dyn crate::apply::plugin::ClusterPlugin>, ReconcileError> {
        self.plugins.cluster_plugin(&cluster.cluster_type).ok_or_else(|| {
            ReconcileError::new(
                codes::PLUGIN_NOT_FOUND,
                ErrorCategory::PluginNotFound,
                format!("no cluster plugin registered for cluster type '{}'", cluster.cluster_type),
            )
        })
    }

    fn code_plugin(
        &self,
        cluster: &crate::policy::Cluster,
        instance: &crate::resolve::ComponentInstance,
    ) -> Result<&'a std::sync::Arc<dyn crate::apply::plugin::CodePlugin>, ReconcileError> {
        let code_type = instance.code_type.as_deref().ok_or_else(|| {
            ReconcileError::new(
                codes::PLUGIN_NOT_FOUND,
                ErrorCategory::PluginNotFound,
                format!("instance {} has no code type", instance.key),
            )
        })?;
        self.plugins
            .code_plugin(&cluster.cluster_type, code_type)
            .ok_or_else(|| {
                ReconcileError::new(
                    codes::PLUGIN_NOT_FOUND,
                    ErrorCategory::PluginNotFound,
                    format!(
                        "no code plugin registered for cluster type '{}' code type '{code_type}'",
                        cluster.cluster_type
                    ),
                )
            })
    }
}

fn missing_instance(key: &ComponentInstanceKey) -> ReconcileError {
    ReconcileError::new(
        codes::APPLY_ACTION_FAILED,
        ErrorCategory::ApplyActionFailed,
        format!("action referenced instance {key} that is not in the resolution"),
    )
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
