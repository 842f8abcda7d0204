//! Session lifecycle notifications.
//!
//! Events are published on a `tokio::sync::broadcast` channel while the
//! controller holds its state lock, so every subscriber observes them in
//! transition order. A subscriber that falls more than [`EVENT_BUFFER`]
//! events behind receives `RecvError::Lagged` and skips ahead.

use std::fmt;

use beacon_core::SessionId;

/// Capacity of the notification channel.
pub const EVENT_BUFFER: usize = 100;

/// A session transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A session was persisted and its span opened.
    DidStart { session_id: SessionId },

    /// A session is about to be closed. Sent before any state changes.
    WillEnd { session_id: SessionId },
}

impl SessionEvent {
    pub fn session_id(&self) -> &SessionId {
        match self {
            Self::DidStart { session_id } | Self::WillEnd { session_id } => session_id,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::DidStart { .. } => "session_did_start",
            Self::WillEnd { .. } => "session_will_end",
        }
    }
}

impl fmt::Display for SessionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.session_id())
    }
}
