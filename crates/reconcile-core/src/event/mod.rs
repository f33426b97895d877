//! Structured diagnostics emitted by resolve, diff, and apply.

pub mod log;

pub use log::{
    ConsoleEventConsumer, EventConsumer, EventLevel, EventLog, EventRecord, RecordingConsumer,
    SubstringCountingConsumer, Subsystem,
};
