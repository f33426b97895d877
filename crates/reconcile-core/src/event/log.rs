//! The event log: the single channel resolve, diff, and apply all write
//! diagnostics through. It is the authoritative surface for "what
//! happened" — callers that want console output, metrics, or test
//! assertions all attach as [`EventConsumer`]s rather than poking at
//! internal state.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventLevel {
    Info,
    Warn,
    Error,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Subsystem {
    Resolve,
    Diff,
    Apply,
}

impl Subsystem {
    fn as_str(self) -> &'static str {
        match self {
            Subsystem::Resolve => "resolve",
            Subsystem::Diff => "diff",
            Subsystem::Apply => "apply",
        }
    }
}

#[derive(Clone, Debug)]
pub struct EventRecord {
    pub level: EventLevel,
    pub subsystem: Subsystem,
    pub message: String,
}

/// Something that wants to observe every record written to an [`EventLog`].
pub trait EventConsumer: Send + Sync {
    fn consume(&self, record: &EventRecord);
}

/// A fan-out log: every [`EventRecord`] is handed to every registered
/// consumer in registration order.
#[derive(Default)]
pub struct EventLog {
    consumers: Vec<Box<dyn EventConsumer>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_consumer(mut self, consumer: impl EventConsumer + 'static) -> Self {
        self.consumers.push(Box::new(consumer));
        self
    }

    pub fn add_consumer(&mut self, consumer: impl EventConsumer + 'static) {
        self.consumers.push(Box::new(consumer));
    }

    pub fn record(&self, level: EventLevel, subsystem: Subsystem, message: impl Into<String>) {
        let record = EventRecord {
            level,
            subsystem,
            message: message.into(),
        };
        for consumer in &self.consumers {
            consumer.consume(&record);
        }
    }

    pub fn info(&self, subsystem: Subsystem, message: impl Into<String>) {
        self.record(EventLevel::Info, subsystem, message);
    }

    pub fn warn(&self, subsystem: Subsystem, message: impl Into<String>) {
        self.record(EventLevel::Warn, subsystem, message);
    }

    pub fn error(&self, subsystem: Subsystem, message: impl Into<String>) {
        self.record(EventLevel::Error, subsystem, message);
    }
}

/// Forwards every record to `tracing`, at the span level matching its
/// [`EventLevel`].
#[derive(Clone, Copy, Debug, Default)]
pub struct ConsoleEventConsumer;

impl EventConsumer for ConsoleEventConsumer {
    fn consume(&self, record: &EventRecord) {
        let subsystem = record.subsystem.as_str();
        match record.level {
            EventLevel::Info => tracing::info!(subsystem, "{}", record.message),
            EventLevel::Warn => tracing::warn!(subsystem, "{}", record.message),
            EventLevel::Error => tracing::error!(subsystem, "{}", record.message),
        }
    }
}

/// Counts how many recorded messages contain a given substring, used by
/// integration tests to assert "a Create action for X happened" without
/// coupling to exact message text.
#[derive(Debug)]
pub struct SubstringCountingConsumer {
    substring: String,
    count: AtomicUsize,
}

impl SubstringCountingConsumer {
    pub fn new(substring: impl Into<String>) -> Self {
        Self {
            substring: substring.into(),
            count: AtomicUsize::new(0),
        }
    }

    pub fn count(&self) -> usize {
        self.count.load(Ordering::Relaxed)
    }
}

impl EventConsumer for SubstringCountingConsumer {
    fn consume(&self, record: &EventRecord) {
        if record.message.contains(&self.substring) {
            self.count.fetch_add(1, Ordering::Relaxed);
        }
    }
}

/// Retains every record in order, for tests that need to inspect the full
/// diagnostic history rather than just a count.
#[derive(Default)]
pub struct RecordingConsumer {
    records: Mutex<Vec<EventRecord>>,
}

impl RecordingConsumer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<EventRecord> {
        self.records.lock().expect("recording consumer mutex poisoned").clone()
    }
}

impl EventConsumer for RecordingConsumer {
    fn consume(&self, record: &EventRecord) {
        self.records
            .lock()
            .expect("recording consumer mutex poisoned")
            .push(record.clone());
    }
}
