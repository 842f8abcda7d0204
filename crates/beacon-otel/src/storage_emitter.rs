//! Emitter that persists spans as rows in the record store.

use beacon_storage::{SpanRecord, Storage};
use chrono::{DateTime, Utc};
use tracing::{debug, error, info, trace, warn};

use crate::{Attributes, LogSeverity, SpanHandle, SpanType, TelemetryEmitter};

/// Writes one `spans` row per span and forwards logs to `tracing`.
///
/// Storage failures are logged at WARN and otherwise ignored.
#[derive(Debug, Clone)]
pub struct StorageEmitter {
    storage: Storage,
}

impl StorageEmitter {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }
}

/// Builds the row for a span; attributes are stored as a JSON object.
fn span_record(span: &SpanHandle, end_time: Option<DateTime<Utc>>) -> SpanRecord {
    let data = serde_json::to_string(&span.attributes).unwrap_or_else(|e| {
        warn!(span_id = %span.span_id, error = %e, "Failed to encode span attributes");
        "{}".to_string()
    });
    SpanRecord {
        id: span.span_id.clone(),
        trace_id: span.trace_id.clone(),
        name: span.name.clone(),
        span_type: span.span_type.as_str().to_string(),
        start_time: span.start_time,
        end_time,
        data,
    }
}

impl TelemetryEmitter for StorageEmitter {
    fn open_span(
        &self,
        name: &str,
        span_type: SpanType,
        start_time: DateTime<Utc>,
        attributes: Attributes,
    ) -> SpanHandle {
        let span = SpanHandle::new(name, span_type, start_time, attributes);
        match self.storage.insert(&span_record(&span, None)) {
            Ok(()) => debug!(span_id = %span.span_id, name, "Span opened"),
            Err(e) => warn!(span_id = %span.span_id, error = %e, "Failed to persist opened span"),
        }
        span
    }

    fn close_span(&self, span: &SpanHandle, end_time: DateTime<Utc>) {
        match self.storage.update(&span_record(span, Some(end_time))) {
            Ok(()) => debug!(span_id = %span.span_id, "Span closed"),
            Err(e) => warn!(span_id = %span.span_id, error = %e, "Failed to persist closed span"),
        }
    }

    fn emit_log(&self, message: &str, attributes: Attributes, severity: LogSeverity) {
        match severity {
            LogSeverity::Trace => trace!(target: "beacon::log", ?attributes, "{message}"),
            LogSeverity::Debug => debug!(target: "beacon::log", ?attributes, "{message}"),
            LogSeverity::Info => info!(target: "beacon::log", ?attributes, "{message}"),
            LogSeverity::Warn => warn!(target: "beacon::log", ?attributes, "{message}"),
            LogSeverity::Error | LogSeverity::Fatal => {
                error!(target: "beacon::log", ?attributes, %severity, "{message}")
            }
        }
    }
}
