//! Event sink trait and implementations.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, Level};

use crate::utils::{now_utc, Timestamp};

/// An orchestration event as recorded by [`CollectingEventSink`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Event {
    /// Dotted event name, e.g. `pipeline.started`.
    pub event_type: String,
    /// Event payload.
    pub data: Value,
    /// When the sink received the event.
    pub emitted_at: Timestamp,
}

/// Receives orchestration events.
///
/// Emission must never fail the caller: implementations log and swallow
/// their own errors.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Emits an event.
    async fn emit(&self, event_type: &str, data: Value);
}

/// Discards all events. The executor default.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpEventSink;

#[async_trait]
impl EventSink for NoOpEventSink {
    async fn emit(&self, _event_type: &str, _data: Value) {}
}

/// Writes events to the tracing subscriber.
#[derive(Debug, Clone)]
pub struct LoggingEventSink {
    level: Level,
}

impl Default for LoggingEventSink {
    fn default() -> Self {
        Self { level: Level::INFO }
    }
}

impl LoggingEventSink {
    /// Creates a sink logging at `level`; anything other than DEBUG logs at INFO.
    #[must_use]
    pub fn new(level: Level) -> Self {
        Self { level }
    }

    #[must_use]
    pub fn debug() -> Self {
        Self::new(Level::DEBUG)
    }
}

#[async_trait]
impl EventSink for LoggingEventSink {
    async fn emit(&self, event_type: &str, data: Value) {
        if self.level == Level::DEBUG {
            debug!(event_type, event_data = %data, "Event: {}", event_type);
        } else {
            info!(event_type, event_data = %data, "Event: {}", event_type);
        }
    }
}

/// Keeps every event in memory; used by tests.
#[derive(Debug, Default)]
pub struct CollectingEventSink {
    events: parking_lot::RwLock<Vec<Event>>,
}

impl CollectingEventSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all collected events.
    #[must_use]
    pub fn events(&self) -> Vec<Event> {
        self.events.read().clone()
    }

    /// Returns the collected event names, in order.
    #[must_use]
    pub fn event_types(&self) -> Vec<String> {
        self.events.read().iter().map(|e| e.event_type.clone()).collect()
    }

    /// Returns events whose name starts with `prefix`.
    #[must_use]
    pub fn events_of_type(&self, prefix: &str) -> Vec<Event> {
        self.events
            .read()
            .iter()
            .filter(|e| e.event_type.starts_with(prefix))
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }

    pub fn clear(&self) {
        self.events.write().clear();
    }
}

#[async_trait]
impl EventSink for CollectingEventSink {
    async fn emit(&self, event_type: &str, data: Value) {
        self.events.write().push(Event {
            event_type: event_type.to_string(),
            data,
            emitted_at: now_utc(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_noop_and_logging_sinks_accept_events() {
        NoOpEventSink.emit("pipeline.started", json!({})).await;
        LoggingEventSink::default()
            .emit("pipeline.started", json!({"pipeline": "bronze.geo"}))
            .await;
        LoggingEventSink::debug().emit("job.started", Value::Null).await;
    }

    #[tokio::test]
    async fn test_collecting_sink_filters_by_prefix() {
        let sink = CollectingEventSink::new();
        sink.emit("job.started", json!({"job_id": "j"})).await;
        sink.emit("pipeline.started", json!({})).await;
        sink.emit("pipeline.completed", json!({})).await;

        assert_eq!(sink.len(), 3);
        assert_eq!(sink.events_of_type("pipeline.").len(), 2);
        assert_eq!(sink.events()[0].data["job_id"], "j");

        sink.clear();
        assert!(sink.is_empty());
    }
}
