//! Span identity and classification.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Span and log attributes. Ordered so encodings are deterministic.
pub type Attributes = BTreeMap<String, String>;

/// Attribute key carrying the span type.
pub const SPAN_TYPE_KEY: &str = "emb.type";

/// What a span measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpanType {
    /// The lifetime of a user session.
    #[serde(rename = "ux.session")]
    Session,
    /// A timed operation.
    #[serde(rename = "performance")]
    Performance,
    /// SDK-internal bookkeeping.
    #[serde(rename = "system")]
    System,
}

impl SpanType {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Session => "ux.session",
            Self::Performance => "performance",
            Self::System => "system",
        }
    }
}

impl fmt::Display for SpanType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An open span, as handed back by an emitter.
///
/// Ids follow the W3C trace-context widths: 32 hex chars for the trace,
/// 16 for the span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpanHandle {
    pub trace_id: String,
    pub span_id: String,
    pub name: String,
    pub span_type: SpanType,
    pub start_time: DateTime<Utc>,
    pub attributes: Attributes,
}

impl SpanHandle {
    /// Creates a handle with fresh random ids.
    pub fn new(
        name: impl Into<String>,
        span_type: SpanType,
        start_time: DateTime<Utc>,
        attributes: Attributes,
    ) -> Self {
        let trace_id = Uuid::new_v4().simple().to_string();
        let span_id = Uuid::new_v4().simple().to_string();
        Self {
            trace_id,
            span_id: span_id.get(..16).unwrap_or(&span_id).to_string(),
            name: name.into(),
            span_type,
            start_time,
            attributes,
        }
    }

    /// Looks up an attribute value.
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }
}
