//! Reconciliation configuration. In-memory only: this crate is the core
//! engine, not a daemon, so there is no config file format to parse here —
//! an embedding binary builds a [`ReconcileConfig`] however it reads its
//! own settings and hands it in.

use std::time::Duration;

/// Tunables for one reconcile pass (resolve + diff + apply).
#[derive(Clone, Debug, PartialEq)]
pub struct ReconcileConfig {
    /// Upper bound on how long the applier waits for a single plugin call
    /// to honor its deadline before treating the action as failed.
    pub action_timeout: Duration,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            action_timeout: Duration::from_secs(30),
        }
    }
}

impl ReconcileConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_action_timeout(mut self, timeout: Duration) -> Self {
        self.action_timeout = timeout;
        self
    }
}
