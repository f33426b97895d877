//! Apply-pass progress reporting, a thin observability layer sitting
//! alongside the [`EventLog`](crate::event::EventLog) for callers that want
//! a running count rather than individual diagnostic messages (e.g. a CLI
//! progress bar).

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::diff::DiffAction;

/// Notified once per action as an apply pass runs.
pub trait ProgressReporter: Send + Sync {
    fn on_action_started(&self, index: usize, total: usize, action: &DiffAction);
    fn on_action_finished(&self, index: usize, total: usize, action: &DiffAction, succeeded: bool);
}

/// Reports nothing, the default for callers that don't need it.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullProgressReporter;

impl ProgressReporter for NullProgressReporter {
    fn on_action_started(&self, _index: usize, _total: usize, _action: &DiffAction) {}
    fn on_action_finished(&self, _index: usize, _total: usize, _action: &DiffAction, _succeeded: bool) {}
}

/// Tallies completed/failed actions, for tests and simple CLI summaries.
#[derive(Debug, Default)]
pub struct CountingProgressReporter {
    completed: AtomicUsize,
    failed: AtomicUsize,
}

impl CountingProgressReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> usize {
        self.failed.load(Ordering::Relaxed)
    }
}

impl ProgressReporter for CountingProgressReporter {
    fn on_action_started(&self, _index: usize, _total: usize, _action: &DiffAction) {}

    fn on_action_finished(&self, _index: usize, _total: usize, _action: &DiffAction, succeeded: bool) {
        if succeeded {
            self.completed.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::ComponentInstanceKey;

    #[test]
    fn counting_reporter_tracks_success_and_failure() {
        let reporter = CountingProgressReporter::new();
        let action = DiffAction::Create(ComponentInstanceKey::root(None, "c", "ctx", vec![], vec!["svc".into()]));
        reporter.on_action_finished(0, 2, &action, true);
        reporter.on_action_finished(1, 2, &action, false);
        assert_eq!(reporter.completed(), 1);
        assert_eq!(reporter.failed(), 1);
    }
}
