//! Beacon OTel - telemetry emitter contract
//!
//! The session controller opens one span per session and closes it when the
//! session ends. This crate defines that contract ([`TelemetryEmitter`]) and
//! the value types crossing it, plus two emitters:
//!
//! - [`StorageEmitter`]: writes span rows to the record store and forwards
//!   log records to `tracing`
//! - [`InMemoryEmitter`]: keeps everything in memory for inspection
//!
//! Emitters never return errors. A failed span write is logged and dropped
//! so that telemetry loss can never block or fail a storage operation.

pub mod emitter;
pub mod log;
pub mod memory;
pub mod span;
pub mod storage_emitter;

pub use emitter::TelemetryEmitter;
pub use log::{LogRecord, LogSeverity};
pub use memory::{EndedSpan, InMemoryEmitter};
pub use span::{Attributes, SpanHandle, SpanType, SPAN_TYPE_KEY};
pub use storage_emitter::StorageEmitter;
