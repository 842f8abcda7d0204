//! Session domain entities and value objects.

use crate::{DomainError, ProcessIdentifier};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// ============================================================================
// Type-Safe Identifiers
// ============================================================================

/// Unique identifier for a session.
///
/// Wraps a UUID string (e.g., "8e11bfb5-7dc2-432b-9206-928fa5c35731").
/// Generated once at session start and never reassigned.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Creates a SessionId from an existing string (e.g. a stored row).
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a fresh random session id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Returns the underlying string reference.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns a shortened display form (first 8 characters).
    #[must_use]
    pub fn short(&self) -> &str {
        self.0.get(..8).unwrap_or(&self.0)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for SessionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for SessionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ============================================================================
// Session State
// ============================================================================

/// Application state a session is tracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// The app is visible and interactive.
    Foreground,
    /// The app is running without UI.
    Background,
}

impl SessionState {
    /// Returns the persisted/wire representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Foreground => "foreground",
            Self::Background => "background",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionState {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "foreground" => Ok(Self::Foreground),
            "background" => Ok(Self::Background),
            other => Err(DomainError::invalid(
                "state",
                other,
                "foreground|background",
            )),
        }
    }
}

// ============================================================================
// Session Entity
// ============================================================================

/// One session's lifetime and mutable fields.
///
/// Invariants held by construction and by the mutators below:
/// - `id`, `start_time`, `cold_start` and `process_id` never change
/// - `end_time` is `None` while open, set exactly once, never cleared
/// - `last_heartbeat_time >= start_time` and `end_time >= start_time`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    id: SessionId,
    state: SessionState,
    process_id: ProcessIdentifier,
    start_time: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    end_time: Option<DateTime<Utc>>,
    last_heartbeat_time: DateTime<Utc>,
    cold_start: bool,
    app_terminated: bool,
}

impl SessionRecord {
    /// Creates a new open session.
    ///
    /// `last_heartbeat_time` starts equal to `start_time`.
    pub fn new(
        id: SessionId,
        state: SessionState,
        process_id: ProcessIdentifier,
        start_time: DateTime<Utc>,
        cold_start: bool,
    ) -> Self {
        Self {
            id,
            state,
            process_id,
            start_time,
            end_time: None,
            last_heartbeat_time: start_time,
            cold_start,
            app_terminated: false,
        }
    }

    /// Rehydrates a session from stored columns.
    ///
    /// Timestamps that would break the ordering invariants are clamped
    /// up to `start_time`.
    #[allow(clippy::too_many_arguments)]
    pub fn restore(
        id: SessionId,
        state: SessionState,
        process_id: ProcessIdentifier,
        start_time: DateTime<Utc>,
        end_time: Option<DateTime<Utc>>,
        last_heartbeat_time: DateTime<Utc>,
        cold_start: bool,
        app_terminated: bool,
    ) -> Self {
        Self {
            id,
            state,
            process_id,
            start_time,
            end_time: end_time.map(|t| t.max(start_time)),
            last_heartbeat_time: last_heartbeat_time.max(start_time),
            cold_start,
            app_terminated,
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn process_id(&self) -> ProcessIdentifier {
        self.process_id
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    pub fn end_time(&self) -> Option<DateTime<Utc>> {
        self.end_time
    }

    pub fn last_heartbeat_time(&self) -> DateTime<Utc> {
        self.last_heartbeat_time
    }

    pub fn cold_start(&self) -> bool {
        self.cold_start
    }

    pub fn app_terminated(&self) -> bool {
        self.app_terminated
    }

    /// Returns true while `end_time` is unset.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.end_time.is_none()
    }

    /// Sets the app state. Ignored once the session has ended.
    pub fn set_state(&mut self, state: SessionState) {
        if self.is_open() {
            self.state = state;
        }
    }

    /// Sets the app-terminated flag. Ignored once the session has ended.
    pub fn set_app_terminated(&mut self, terminated: bool) {
        if self.is_open() {
            self.app_terminated = terminated;
        }
    }

    /// Records a liveness tick and returns the time actually stored.
    ///
    /// Ignored once the session has ended.
    pub fn heartbeat(&mut self, at: DateTime<Utc>) -> DateTime<Utc> {
        if self.is_open() {
            self.last_heartbeat_time = at.max(self.start_time);
        }
        self.last_heartbeat_time
    }

    /// Ends the session and returns the end time actually stored.
    ///
    /// The first call wins; later calls return the recorded end time.
    pub fn end(&mut self, at: DateTime<Utc>) -> DateTime<Utc> {
        match self.end_time {
            Some(end) => end,
            None => {
                let end = at.max(self.start_time);
                self.end_time = Some(end);
                end
            }
        }
    }
}
