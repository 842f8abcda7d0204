//! Maps app lifecycle notifications onto session transitions.

use std::fmt;

use beacon_core::SessionState;
use beacon_storage::StorageResult;
use chrono::Utc;
use tracing::debug;

use crate::controller::{SessionController, SessionUpdate};

/// App lifecycle notification delivered by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleEvent {
    Foregrounded,
    Backgrounded,
    WillTerminate,
}

impl fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Foregrounded => "foregrounded",
            Self::Backgrounded => "backgrounded",
            Self::WillTerminate => "will_terminate",
        };
        f.write_str(name)
    }
}

impl SessionController {
    /// Applies the transition for `event` as one atomic step.
    ///
    /// - `Foregrounded` starts a foreground session unless one is open.
    /// - `Backgrounded` replaces an open foreground session with a
    ///   background one, or just ends it when background sessions are
    ///   disabled.
    /// - `WillTerminate` marks the open session terminated and ends it.
    ///
    /// Returns the combined persistence outcome of the writes performed.
    pub fn handle_lifecycle(&self, event: LifecycleEvent) -> StorageResult<()> {
        let mut guard = self.lock();
        let open_state = guard.session.as_ref().map(|s| s.state());
        debug!(%event, ?open_state, "Lifecycle event");

        match (event, open_state) {
            (LifecycleEvent::Foregrounded, Some(SessionState::Foreground)) => Ok(()),
            (LifecycleEvent::Foregrounded, _) => self
                .start_locked(&mut guard, SessionState::Foreground, Utc::now())
                .persistence,

            (LifecycleEvent::Backgrounded, Some(SessionState::Foreground)) => {
                if self.config().background_sessions {
                    self.start_locked(&mut guard, SessionState::Background, Utc::now())
                        .persistence
                } else {
                    self.end_locked(&mut guard, Utc::now()).persistence
                }
            }
            (LifecycleEvent::Backgrounded, _) => Ok(()),

            (LifecycleEvent::WillTerminate, Some(_)) => {
                let updated = self
                    .update_locked(
                        &mut guard,
                        SessionUpdate::new().with_app_terminated(true),
                    )
                    .map_or(Ok(()), |outcome| outcome.persistence);
                let ended = self.end_locked(&mut guard, Utc::now()).persistence;
                updated.and(ended)
            }
            (LifecycleEvent::WillTerminate, None) => Ok(()),
        }
    }
}
