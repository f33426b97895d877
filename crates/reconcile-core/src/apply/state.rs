//! [`StateUpdater`]: the bridge between a successful apply action and
//! whatever store persists actual-state snapshots between reconcile runs.

use crate::error::ReconcileError;
use crate::resolve::ComponentInstanceKey;
use crate::time::Timestamp;

pub trait StateUpdater: Send + Sync {
    fn instance_created(&self, key: &ComponentInstanceKey, at: Timestamp) -> Result<(), ReconcileError>;
    fn instance_updated(&self, key: &ComponentInstanceKey, at: Timestamp) -> Result<(), ReconcileError>;
    fn instance_deleted(&self, key: &ComponentInstanceKey) -> Result<(), ReconcileError>;
}

/// A [`StateUpdater`] that persists nothing, for callers that only care
/// about in-process resolution results (e.g. a dry-run planner).
#[derive(Clone, Copy, Debug, Default)]
pub struct NoOpStateUpdater;

impl StateUpdater for NoOpStateUpdater {
    fn instance_created(&self, _key: &ComponentInstanceKey, _at: Timestamp) -> Result<(), ReconcileError> {
        Ok(())
    }

    fn instance_updated(&self, _key: &ComponentInstanceKey, _at: Timestamp) -> Result<(), ReconcileError> {
        Ok(())
    }

    fn instance_deleted(&self, _key: &ComponentInstanceKey) -> Result<(), ReconcileError> {
        Ok(())
    }
}
