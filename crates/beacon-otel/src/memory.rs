//! Emitter that keeps every span and log record in memory.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::{Attributes, LogRecord, LogSeverity, SpanHandle, SpanType, TelemetryEmitter};

/// A span together with the time it was closed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndedSpan {
    pub span: SpanHandle,
    pub end_time: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct Recorded {
    started: Vec<SpanHandle>,
    ended: Vec<EndedSpan>,
    logs: Vec<LogRecord>,
}

/// Records spans and logs for later inspection.
///
/// Clones share the same buffers.
#[derive(Debug, Clone, Default)]
pub struct InMemoryEmitter {
    recorded: Arc<Mutex<Recorded>>,
}

impl InMemoryEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spans in the order they were opened (closed ones included).
    pub fn started_spans(&self) -> Vec<SpanHandle> {
        self.recorded.lock().started.clone()
    }

    /// Spans in the order they were closed.
    pub fn ended_spans(&self) -> Vec<EndedSpan> {
        self.recorded.lock().ended.clone()
    }

    /// Spans opened but not yet closed.
    pub fn open_spans(&self) -> Vec<SpanHandle> {
        let recorded = self.recorded.lock();
        recorded
            .started
            .iter()
            .filter(|s| !recorded.ended.iter().any(|e| e.span.span_id == s.span_id))
            .cloned()
            .collect()
    }

    pub fn log_records(&self) -> Vec<LogRecord> {
        self.recorded.lock().logs.clone()
    }

    pub fn clear(&self) {
        *self.recorded.lock() = Recorded::default();
    }
}

impl TelemetryEmitter for InMemoryEmitter {
    fn open_span(
        &self,
        name: &str,
        span_type: SpanType,
        start_time: DateTime<Utc>,
        attributes: Attributes,
    ) -> SpanHandle {
        let span = SpanHandle::new(name, span_type, start_time, attributes);
        self.recorded.lock().started.push(span.clone());
        span
    }

    fn close_span(&self, span: &SpanHandle, end_time: DateTime<Utc>) {
        self.recorded.lock().ended.push(EndedSpan {
            span: span.clone(),
            end_time,
        });
    }

    fn emit_log(&self, message: &str, attributes: Attributes, severity: LogSeverity) {
        self.recorded.lock().logs.push(LogRecord {
            body: message.to_string(),
            attributes,
            severity,
            timestamp: Utc::now(),
        });
    }
}
