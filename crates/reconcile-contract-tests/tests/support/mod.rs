//! Fakes shared by the end-to-end reconcile scenarios: an in-memory
//! cluster/code plugin pair that just records what it was asked to do, an
//! in-memory state updater, and a manual clock so timestamp assertions are
//! deterministic.

use std::collections::HashMap;
use std::sync::Mutex;

use reconcile_core::apply::{ApplyContext, ClusterPlugin, CodePlugin, StateUpdater};
use reconcile_core::resolve::{ComponentInstanceKey, ExternalData};
use reconcile_core::time::Timestamp;
use reconcile_core::ReconcileError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RecordedCall {
    Create(String),
    Update(String),
    Delete(String),
    Attach(String, String),
    Detach(String, String),
    PostProcess(String),
}

#[derive(Default)]
pub struct FakePlugin {
    pub calls: Mutex<Vec<RecordedCall>>,
}

impl FakePlugin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: RecordedCall) {
        self.calls.lock().unwrap().push(call);
    }
}

impl ClusterPlugin for FakePlugin {
    fn create(&self, ctx: &ApplyContext<'_>) -> Result<(), ReconcileError> {
        self.record(RecordedCall::Create(ctx.key.canonical()));
        Ok(())
    }

    fn update(&self, ctx: &ApplyContext<'_>) -> Result<(), ReconcileError> {
        self.record(RecordedCall::Update(ctx.key.canonical()));
        Ok(())
    }

    fn delete(&self, ctx: &ApplyContext<'_>) -> Result<(), ReconcileError> {
        self.record(RecordedCall::Delete(ctx.key.canonical()));
        Ok(())
    }

    fn attach(&self, ctx: &ApplyContext<'_>, dependency_name: &str) -> Result<(), ReconcileError> {
        self.record(RecordedCall::Attach(ctx.key.canonical(), dependency_name.to_string()));
        Ok(())
    }

    fn detach(&self, ctx: &ApplyContext<'_>, dependency_name: &str) -> Result<(), ReconcileError> {
        self.record(RecordedCall::Detach(ctx.key.canonical(), dependency_name.to_string()));
        Ok(())
    }

    fn post_process(&self, cluster: &reconcile_core::policy::Cluster) -> Result<(), ReconcileError> {
        self.record(RecordedCall::PostProcess(cluster.name.clone()));
        Ok(())
    }
}

impl CodePlugin for FakePlugin {
    fn create(&self, ctx: &ApplyContext<'_>) -> Result<(), ReconcileError> {
        self.record(RecordedCall::Create(ctx.key.canonical()));
        Ok(())
    }

    fn update(&self, ctx: &ApplyContext<'_>) -> Result<(), ReconcileError> {
        self.record(RecordedCall::Update(ctx.key.canonical()));
        Ok(())
    }

    fn delete(&self, ctx: &ApplyContext<'_>) -> Result<(), ReconcileError> {
        self.record(RecordedCall::Delete(ctx.key.canonical()));
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryStateUpdater {
    pub created: Mutex<Vec<(String, Timestamp)>>,
    pub updated: Mutex<Vec<(String, Timestamp)>>,
    pub deleted: Mutex<Vec<String>>,
}

impl InMemoryStateUpdater {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateUpdater for InMemoryStateUpdater {
    fn instance_created(&self, key: &ComponentInstanceKey, at: Timestamp) -> Result<(), ReconcileError> {
        self.created.lock().unwrap().push((key.canonical(), at));
        Ok(())
    }

    fn instance_updated(&self, key: &ComponentInstanceKey, at: Timestamp) -> Result<(), ReconcileError> {
        self.updated.lock().unwrap().push((key.canonical(), at));
        Ok(())
    }

    fn instance_deleted(&self, key: &ComponentInstanceKey) -> Result<(), ReconcileError> {
        self.deleted.lock().unwrap().push(key.canonical());
        Ok(())
    }
}

/// A fixed table of per-user secrets, for scenarios that exercise
/// `${secret.*}`-shaped rendering paths without a real secrets backend.
#[derive(Default)]
pub struct InMemoryExternalData {
    secrets: HashMap<(String, String), String>,
}

impl InMemoryExternalData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_secret(mut self, user_id: impl Into<String>, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.secrets.insert((user_id.into(), key.into()), value.into());
        self
    }
}

impl ExternalData for InMemoryExternalData {
    fn secret(&self, user_id: &str, key: &str) -> Option<String> {
        self.secrets.get(&(user_id.to_string(), key.to_string())).cloned()
    }
}
