//! Time abstractions shared by the applier's per-action deadlines and the
//! created/updated-at timestamps stamped onto component instances.
//!
//! A deadline is a point in monotonic time a plugin call must honor, while
//! timestamps recorded onto state need wall-clock semantics that survive a
//! process restart, so the two use different underlying clocks.

use std::time::{Duration, Instant, SystemTime};

/// A point in monotonic time by which a plugin call must either complete
/// or report that it cannot. The applier never cancels a call itself —
/// honoring the deadline is the plugin's contract to uphold.
#[derive(Clone, Copy, Debug)]
pub struct Deadline {
    at: Instant,
}

impl Deadline {
    pub fn after(duration: Duration) -> Self {
        Self {
            at: Instant::now() + duration,
        }
    }

    pub fn remaining(&self) -> Duration {
        self.at.saturating_duration_since(Instant::now())
    }

    pub fn has_expired(&self) -> bool {
        Instant::now() >= self.at
    }
}

/// A wall-clock timestamp, used for `created_at`/`updated_at` on resolved
/// component instances. Wraps [`SystemTime`] rather than [`Instant`] since
/// these values are persisted through a [`StateUpdater`](crate::apply::state::StateUpdater)
/// and must remain meaningful across process restarts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct Timestamp(SystemTime);

impl Timestamp {
    pub fn from_system_time(t: SystemTime) -> Self {
        Self(t)
    }

    pub fn into_system_time(self) -> SystemTime {
        self.0
    }
}

/// Supplies the current time to the applier. Production code uses
/// [`SystemClock`]; tests use [`ManualClock`] to assert the exact
/// created/updated-at semantics of each action kind without racing a real
/// clock.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp(SystemTime::now())
    }
}

/// A clock that only advances when told to, for deterministic applier
/// tests.
#[derive(Debug)]
pub struct ManualClock {
    current: std::sync::Mutex<SystemTime>,
}

impl ManualClock {
    pub fn new(start: SystemTime) -> Self {
        Self {
            current: std::sync::Mutex::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut guard = self.current.lock().expect("manual clock mutex poisoned");
        *guard += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        Timestamp(*self.current.lock().expect("manual clock mutex poisoned"))
    }
}
