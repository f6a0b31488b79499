//! Publishing events and the sinks that receive them
//!
//! Every row outcome is reported as a `PublishEvent`. The production sink
//! turns events into `tracing` records; `MemorySink` keeps them so callers
//! can assert on exactly what was reported.

use crate::error::PublishError;
use std::sync::Mutex;

/// One reportable outcome of the publishing loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishEvent {
    /// The family was pushed after setting `labels`
    Pushed { labels: Vec<String> },
    /// The series was set but the push failed
    PushFailed {
        labels: Vec<String>,
        error: PublishError,
    },
    /// A row was rejected before any mutation or network call
    Rejected {
        labels: Vec<String>,
        error: PublishError,
    },
    /// A CSV row did not match the header width and was skipped
    RowSkipped {
        line: u64,
        row: Vec<String>,
        expected: usize,
    },
}

/// Receiver for publishing events
pub trait EventSink: Send + Sync {
    fn emit(&self, event: PublishEvent);
}

/// Sink that writes every event as a structured log record
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: PublishEvent) {
        match event {
            PublishEvent::Pushed { labels } => {
                tracing::info!(labels = ?labels, "Successfully pushed metrics");
            }
            PublishEvent::PushFailed { labels, error } => {
                tracing::error!(labels = ?labels, error = %error, "Failed to push metrics");
            }
            PublishEvent::Rejected { labels, error } => {
                tracing::error!(labels = ?labels, error = %error, "Rejected metric update");
            }
            PublishEvent::RowSkipped {
                line,
                row,
                expected,
            } => {
                tracing::warn!(
                    line,
                    row = ?row,
                    expected_columns = expected,
                    actual_columns = row.len(),
                    "Ignoring row with incorrect number of columns"
                );
            }
        }
    }
}

/// Sink that records events in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<PublishEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of all events received so far, in emission order
    pub fn events(&self) -> Vec<PublishEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    pub fn pushed_count(&self) -> usize {
        self.count(|e| matches!(e, PublishEvent::Pushed { .. }))
    }

    pub fn failed_count(&self) -> usize {
        self.count(|e| matches!(e, PublishEvent::PushFailed { .. }))
    }

    pub fn skipped_count(&self) -> usize {
        self.count(|e| matches!(e, PublishEvent::RowSkipped { .. }))
    }

    fn count(&self, predicate: impl Fn(&PublishEvent) -> bool) -> usize {
        self.events().iter().filter(|e| predicate(e)).count()
    }
}

impl EventSink for MemorySink {
    fn emit(&self, event: PublishEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_sink_preserves_order() {
        let sink = MemorySink::new();
        sink.emit(PublishEvent::Pushed {
            labels: vec!["a".to_string()],
        });
        sink.emit(PublishEvent::RowSkipped {
            line: 3,
            row: vec!["x".to_string(), "y".to_string()],
            expected: 1,
        });
        sink.emit(PublishEvent::PushFailed {
            labels: vec!["b".to_string()],
            error: PublishError::EndpointPush {
                endpoint: "http://localhost:9091".to_string(),
                reason: "refused".to_string(),
            },
        });

        let events = sink.events();
        assert_eq!(events.len(), 3);
        assert!(matches!(events[0], PublishEvent::Pushed { .. }));
        assert!(matches!(events[1], PublishEvent::RowSkipped { line: 3, .. }));
        assert!(matches!(events[2], PublishEvent::PushFailed { .. }));
        assert_eq!(sink.pushed_count(), 1);
        assert_eq!(sink.skipped_count(), 1);
        assert_eq!(sink.failed_count(), 1);
    }

    #[test]
    fn test_tracing_sink_accepts_every_event() {
        let sink = TracingSink;
        sink.emit(PublishEvent::Pushed { labels: vec![] });
        sink.emit(PublishEvent::Rejected {
            labels: vec![],
            error: PublishError::SchemaNotDefined,
        });
    }
}
