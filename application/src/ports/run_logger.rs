//! Port for the structured run journal.
//!
//! Separate from `tracing`-based diagnostics: the journal records one
//! machine-readable event per node transition (JSONL).

use serde_json::Value;

pub struct RunEvent {
    /// Event type identifier (e.g. "node_started", "run_finished")
    pub event_type: &'static str,
    pub payload: Value,
}

impl RunEvent {
    pub fn new(event_type: &'static str, payload: Value) -> Self {
        Self {
            event_type,
            payload,
        }
    }
}

/// Journal writer
///
/// `log` is synchronous and infallible; write failures are dropped.
pub trait RunLogger: Send + Sync {
    fn log(&self, event: RunEvent);
}

/// No-op implementation for tests and when the journal is disabled.
pub struct NoRunLogger;

impl RunLogger for NoRunLogger {
    fn log(&self, _event: RunEvent) {}
}
