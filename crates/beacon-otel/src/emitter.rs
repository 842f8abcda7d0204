//! The emitter trait consumed by the session controller.

use chrono::{DateTime, Utc};

use crate::{Attributes, LogSeverity, SpanHandle, SpanType};

/// Produces spans and log records.
///
/// Implementations must be infallible from the caller's point of view:
/// failures are logged and swallowed.
pub trait TelemetryEmitter: Send + Sync {
    /// Starts a span at `start_time`. The span stays open until
    /// [`TelemetryEmitter::close_span`] is called with the returned handle.
    fn open_span(
        &self,
        name: &str,
        span_type: SpanType,
        start_time: DateTime<Utc>,
        attributes: Attributes,
    ) -> SpanHandle;

    /// Finalizes a span at `end_time`.
    fn close_span(&self, span: &SpanHandle, end_time: DateTime<Utc>);

    /// Emits a log record stamped with the current time.
    fn emit_log(&self, message: &str, attributes: Attributes, severity: LogSeverity);
}
