//! Telemetry event capability.
//!
//! Components that emit business events receive an [`EventSink`] explicitly
//! instead of reaching for a process-global bus. Emission is best-effort: a
//! sink must never fail the operation that recorded the event.

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::sync::Mutex;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct TelemetryEvent {
    pub name: String,
    pub payload: Value,
    pub timestamp: DateTime<Utc>,
}

pub trait EventSink: Send + Sync {
    fn record(&self, name: &str, payload: Value);
}

/// Default sink: events become structured debug logs, picked up by whatever
/// subscriber (fmt or OTLP) the process installed.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn record(&self, name: &str, payload: Value) {
        debug!(event = name, payload = %payload, "telemetry event");
    }
}

/// Collects events in memory so tests can assert on what was emitted.
#[derive(Debug, Default)]
pub struct CollectingEventSink {
    events: Mutex<Vec<TelemetryEvent>>,
}

impl CollectingEventSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn names(&self) -> Vec<String> {
        match self.events.lock() {
            Ok(events) => events.iter().map(|e| e.name.clone()).collect(),
            Err(poisoned) => poisoned.into_inner().iter().map(|e| e.name.clone()).collect(),
        }
    }
}

impl EventSink for CollectingEventSink {
    fn record(&self, name: &str, payload: Value) {
        let event = TelemetryEvent {
            name: name.to_string(),
            payload,
            timestamp: Utc::now(),
        };
        match self.events.lock() {
            Ok(mut events) => events.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn collecting_sink_records_in_order() {
        let sink = CollectingEventSink::new();
        sink.record("auth.login", json!({"userId": "u1"}));
        sink.record("auth.refresh", json!({"userId": "u1"}));
        assert_eq!(sink.names(), vec!["auth.login", "auth.refresh"]);
    }
}
