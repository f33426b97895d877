//! Plugin traits and the two-level `(cluster_type, code_type)` registry
//! that routes a [`DiffAction`](crate::diff::DiffAction) to the code that
//! should execute it.
//!
//! Calls are synchronous: the applier blocks on each plugin call up to its
//! [`Deadline`](crate::time::Deadline) and never pre-empts or cancels a
//! call in progress.

use std::collections::HashMap;
use std::sync::Arc;

use crate::apply::context::ApplyContext;
use crate::error::ReconcileError;

/// Handles lifecycle actions against a whole cluster: creating/deleting
/// the service-level root instance, and any post-apply reconciliation
/// that only makes sense once every other action in the pass has run.
pub trait ClusterPlugin: Send + Sync {
    fn create(&self, ctx: &ApplyContext<'_>) -> Result<(), ReconcileError>;
    fn update(&self, ctx: &ApplyContext<'_>) -> Result<(), ReconcileError>;
    fn delete(&self, ctx: &ApplyContext<'_>) -> Result<(), ReconcileError>;

    fn attach(&self, _ctx: &ApplyContext<'_>, _dependency_name: &str) -> Result<(), ReconcileError> {
        Ok(())
    }

    fn detach(&self, _ctx: &ApplyContext<'_>, _dependency_name: &str) -> Result<(), ReconcileError> {
        Ok(())
    }

    /// Checked once per cluster at post-process time, ahead of the
    /// post-process hook itself. The default accepts every cluster.
    fn validate(&self, _cluster: &crate::policy::Cluster) -> Result<(), ReconcileError> {
        Ok(())
    }

    fn post_process(&self, _cluster: &crate::policy::Cluster) -> Result<(), ReconcileError> {
        Ok(())
    }

    /// Endpoint-type → URL for the service root named by `ctx.key`. Called
    /// during `ClustersPostProcess` to populate `ComponentInstance::endpoint_urls`;
    /// the default publishes nothing.
    fn endpoints(&self, _ctx: &ApplyContext<'_>) -> Result<HashMap<String, String>, ReconcileError> {
        Ok(HashMap::new())
    }
}

/// Handles lifecycle actions against a single deployable component.
pub trait CodePlugin: Send + Sync {
    fn create(&self, ctx: &ApplyContext<'_>) -> Result<(), ReconcileError>;
    fn update(&self, ctx: &ApplyContext<'_>) -> Result<(), ReconcileError>;
    fn delete(&self, ctx: &ApplyContext<'_>) -> Result<(), ReconcileError>;

    /// Endpoint-type → URL for this component. Called during
    /// `ClustersPostProcess` to populate `ComponentInstance::endpoint_urls`;
    /// the default publishes nothing.
    fn endpoints(&self, _ctx: &ApplyContext<'_>) -> Result<HashMap<String, String>, ReconcileError> {
        Ok(HashMap::new())
    }
}

/// Maps `cluster_type -> ClusterPlugin` and `(cluster_type, code_type) ->
/// CodePlugin`. Registration happens once at startup; lookups happen once
/// per action.
#[derive(Default)]
pub struct PluginRegistry {
    cluster_plugins: HashMap<String, Arc<dyn ClusterPlugin>>,
    code_plugins: HashMap<(String, String), Arc<dyn CodePlugin>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_cluster_plugin(&mut self, cluster_type: impl Into<String>, plugin: Arc<dyn ClusterPlugin>) {
        self.cluster_plugins.insert(cluster_type.into(), plugin);
    }

    pub fn register_code_plugin(
        &mut self,
        cluster_type: impl Into<String>,
        code_type: impl Into<String>,
        plugin: Arc<dyn CodePlugin>,
    ) {
        self.code_plugins.insert((cluster_type.into(), code_type.into()), plugin);
    }

    pub fn cluster_plugin(&self, cluster_type: &str) -> Option<&Arc<dyn ClusterPlugin>> {
        self.cluster_plugins.get(cluster_type)
    }

    pub fn code_plugin(&self, cluster_type: &str, code_type: &str) -> Option<&Arc<dyn CodePlugin>> {
        self.code_plugins.get(&(cluster_type.to_string(), code_type.to_string()))
    }
}
