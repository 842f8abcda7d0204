//! The session controller.
//!
//! Owns the current session, its store row and its span, and keeps the
//! three consistent. Every mutation (start, end, update, heartbeat tick)
//! runs under one `parking_lot::Mutex`, writes through to the store while
//! holding it, and publishes notifications before releasing it. Observers
//! therefore never see a half-applied transition, and notifications arrive
//! in the order the transitions happened.
//!
//! # Panic-Free Guarantees
//!
//! Storage failures are reported through [`Persisted`] and never roll back
//! the in-memory transition. Heartbeat failures are logged and swallowed.

use std::sync::Arc;

use beacon_core::{
    is_cold_start, ProcessMetadata, SessionId, SessionRecord, SessionState,
};
use beacon_otel::{Attributes, SpanHandle, SpanType, TelemetryEmitter, SPAN_TYPE_KEY};
use beacon_storage::{Storage, StorageResult};
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, MutexGuard};
use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::{ConfigError, SessionConfig};
use crate::events::{SessionEvent, EVENT_BUFFER};
use crate::heartbeat::{Heartbeat, TickFn};
use crate::persisted::Persisted;

/// Name of the span that tracks a session's lifetime.
pub const SESSION_SPAN_NAME: &str = "beacon-session";

pub const ATTR_SESSION_ID: &str = "session.id";
pub const ATTR_SESSION_STATE: &str = "session.state";
pub const ATTR_SESSION_COLD_START: &str = "session.cold_start";

// ============================================================================
// Update
// ============================================================================

/// Partial update applied to the open session. `None` fields are left as is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionUpdate {
    pub state: Option<SessionState>,
    pub app_terminated: Option<bool>,
}

impl SessionUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(mut self, state: SessionState) -> Self {
        self.state = Some(state);
        self
    }

    pub fn with_app_terminated(mut self, terminated: bool) -> Self {
        self.app_terminated = Some(terminated);
        self
    }
}

// ============================================================================
// Controller State
// ============================================================================

#[derive(Debug, Default)]
pub(crate) struct ControllerState {
    pub(crate) session: Option<SessionRecord>,
    span: Option<SpanHandle>,
    heartbeat: Option<Heartbeat>,
}

struct ControllerInner {
    state: Mutex<ControllerState>,
    storage: Storage,
    telemetry: Arc<dyn TelemetryEmitter>,
    config: SessionConfig,
    process: ProcessMetadata,
    events: broadcast::Sender<SessionEvent>,
    runtime: Option<Handle>,
}

impl ControllerInner {
    fn publish(&self, event: SessionEvent) {
        // Err only means nobody is subscribed.
        if self.events.send(event.clone()).is_err() {
            debug!(%event, "No subscribers for session event");
        }
    }

    /// Refreshes the open session's heartbeat. Runs on the blocking pool.
    fn heartbeat_tick(&self, token: &CancellationToken) {
        let mut state = self.state.lock();

        // The session this timer belongs to ended while the tick was queued.
        if token.is_cancelled() {
            return;
        }
        let Some(session) = state.session.as_mut() else {
            return;
        };

        let at = session.heartbeat(Utc::now());
        match self.storage.update(&*session) {
            Ok(()) => debug!(session_id = %session.id(), %at, "Heartbeat"),
            Err(e) => warn!(
                session_id = %session.id(),
                error = %e,
                "Failed to persist heartbeat"
            ),
        }
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Configures and builds a [`SessionController`].
pub struct SessionControllerBuilder {
    storage: Storage,
    telemetry: Arc<dyn TelemetryEmitter>,
    config: SessionConfig,
    process: Option<ProcessMetadata>,
    runtime: Option<Handle>,
}

impl SessionControllerBuilder {
    pub fn config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// Overrides the process identity and launch time (tests, replays).
    pub fn process(mut self, process: ProcessMetadata) -> Self {
        self.process = Some(process);
        self
    }

    /// Runtime the heartbeat task is spawned on. Defaults to the runtime
    /// the controller is built in, if any.
    pub fn runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Fails if the config cannot drive a heartbeat.
    pub fn build(self) -> Result<SessionController, ConfigError> {
        self.config.validate()?;

        let runtime = self.runtime.or_else(|| Handle::try_current().ok());
        if runtime.is_none() {
            warn!("No tokio runtime available, session heartbeat disabled");
        }

        let (events, _) = broadcast::channel(EVENT_BUFFER);

        Ok(SessionController {
            inner: Arc::new(ControllerInner {
                state: Mutex::new(ControllerState::default()),
                storage: self.storage,
                telemetry: self.telemetry,
                config: self.config,
                process: self.process.unwrap_or_else(ProcessMetadata::current),
                events,
                runtime,
            }),
        })
    }
}

// ============================================================================
// Controller
// ============================================================================

/// Session state machine: `NoSession <-> Open`.
///
/// Clones share state. The heartbeat task only holds a weak reference, so
/// dropping the last clone stops it.
#[derive(Clone)]
pub struct SessionController {
    inner: Arc<ControllerInner>,
}

impl std::fmt::Debug for SessionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionController")
            .field("process", &self.inner.process)
            .field("config", &self.inner.config)
            .field(
                "current_session",
                &self.inner.state.try_lock().map(|s| s.session.clone()),
            )
            .finish_non_exhaustive()
    }
}

impl SessionController {
    /// Controller with default config, the current process and the ambient
    /// tokio runtime.
    pub fn new(
        storage: Storage,
        telemetry: impl TelemetryEmitter + 'static,
    ) -> Result<Self, ConfigError> {
        Self::builder(storage, telemetry).build()
    }

    pub fn builder(
        storage: Storage,
        telemetry: impl TelemetryEmitter + 'static,
    ) -> SessionControllerBuilder {
        SessionControllerBuilder {
            storage,
            telemetry: Arc::new(telemetry),
            config: SessionConfig::default(),
            process: None,
            runtime: None,
        }
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    pub fn current_session(&self) -> Option<SessionRecord> {
        self.inner.state.lock().session.clone()
    }

    pub fn current_session_span(&self) -> Option<SpanHandle> {
        self.inner.state.lock().span.clone()
    }

    /// Receiver for every event published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    pub fn process(&self) -> &ProcessMetadata {
        &self.inner.process
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, ControllerState> {
        self.inner.state.lock()
    }

    // ------------------------------------------------------------------------
    // Transitions
    // ------------------------------------------------------------------------

    /// Starts a session now. See [`Self::start_session_at`].
    pub fn start_session(&self, state: SessionState) -> Persisted<SessionRecord> {
        self.start_session_at(state, Utc::now())
    }

    /// Starts a session at `start_time`, ending the open one first.
    ///
    /// `persistence` carries the first failure among the implicit end's
    /// write and the new row's insert.
    pub fn start_session_at(
        &self,
        state: SessionState,
        start_time: DateTime<Utc>,
    ) -> Persisted<SessionRecord> {
        let mut guard = self.lock();
        self.start_locked(&mut guard, state, start_time)
    }

    /// Ends the open session now. See [`Self::end_session_at`].
    pub fn end_session(&self) -> Persisted<DateTime<Utc>> {
        self.end_session_at(Utc::now())
    }

    /// Ends the open session, returning the end time actually recorded
    /// (never earlier than the session's start).
    ///
    /// Without an open session this does nothing and returns `end_time`.
    pub fn end_session_at(&self, end_time: DateTime<Utc>) -> Persisted<DateTime<Utc>> {
        let mut guard = self.lock();
        self.end_locked(&mut guard, end_time)
    }

    /// Applies `update` to the open session and refreshes its heartbeat.
    ///
    /// Returns `None` without an open session.
    pub fn update(&self, update: SessionUpdate) -> Option<Persisted<SessionRecord>> {
        let mut guard = self.lock();
        self.update_locked(&mut guard, update)
    }

    pub(crate) fn start_locked(
        &self,
        state: &mut ControllerState,
        session_state: SessionState,
        start_time: DateTime<Utc>,
    ) -> Persisted<SessionRecord> {
        let ended = if state.session.is_some() {
            self.end_locked(state, Utc::now()).persistence
        } else {
            Ok(())
        };

        let inner = &self.inner;
        let cold_start = is_cold_start(
            inner.process.start_time,
            start_time,
            inner.config.allowed_cold_start_interval,
        );
        let session = SessionRecord::new(
            SessionId::generate(),
            session_state,
            inner.process.identifier,
            start_time,
            cold_start,
        );

        let inserted = inner.storage.insert(&session);
        if let Err(e) = &inserted {
            warn!(session_id = %session.id(), error = %e, "Failed to persist new session");
        }

        let span = inner.telemetry.open_span(
            SESSION_SPAN_NAME,
            SpanType::Session,
            start_time,
            session_span_attributes(&session),
        );

        state.session = Some(session.clone());
        state.span = Some(span);
        state.heartbeat = self.arm_heartbeat(session.id());

        info!(
            session_id = %session.id(),
            state = %session_state,
            cold_start,
            "Session started"
        );
        inner.publish(SessionEvent::DidStart {
            session_id: session.id().clone(),
        });

        Persisted::new(session, ended.and(inserted))
    }

    pub(crate) fn end_locked(
        &self,
        state: &mut ControllerState,
        end_time: DateTime<Utc>,
    ) -> Persisted<DateTime<Utc>> {
        let Some(session_id) = state.session.as_ref().map(|s| s.id().clone()) else {
            debug!("end_session called with no open session");
            return Persisted::new(end_time, Ok(()));
        };

        // Cancelled under the lock: a tick already queued sees the token
        // and backs off.
        state.heartbeat = None;

        self.inner.publish(SessionEvent::WillEnd {
            session_id: session_id.clone(),
        });

        let Some(mut session) = state.session.take() else {
            return Persisted::new(end_time, Ok(()));
        };
        let end_time = session.end(end_time);

        let persisted = self.inner.storage.update(&session);
        if let Err(e) = &persisted {
            warn!(session_id = %session_id, error = %e, "Failed to persist session end");
        }

        if let Some(span) = state.span.take() {
            self.inner.telemetry.close_span(&span, end_time);
        }

        info!(session_id = %session_id, %end_time, "Session ended");
        Persisted::new(end_time, persisted)
    }

    pub(crate) fn update_locked(
        &self,
        state: &mut ControllerState,
        update: SessionUpdate,
    ) -> Option<Persisted<SessionRecord>> {
        let Some(session) = state.session.as_mut() else {
            debug!("update called with no open session");
            return None;
        };

        if let Some(new_state) = update.state {
            session.set_state(new_state);
        }
        if let Some(terminated) = update.app_terminated {
            session.set_app_terminated(terminated);
        }
        session.heartbeat(Utc::now());

        let persisted = self.inner.storage.update(&*session);
        if let Err(e) = &persisted {
            warn!(session_id = %session.id(), error = %e, "Failed to persist session update");
        }

        debug!(
            session_id = %session.id(),
            state = %session.state(),
            app_terminated = session.app_terminated(),
            "Session updated"
        );
        Some(Persisted::new(session.clone(), persisted))
    }

    fn arm_heartbeat(&self, session_id: &SessionId) -> Option<Heartbeat> {
        let runtime = self.inner.runtime.as_ref()?;

        let weak = Arc::downgrade(&self.inner);
        let tick: TickFn = Arc::new(move |token: &CancellationToken| match weak.upgrade() {
            Some(inner) => {
                inner.heartbeat_tick(token);
                true
            }
            None => false,
        });

        Some(Heartbeat::spawn(
            runtime,
            self.inner.config.heartbeat_interval,
            session_id.clone(),
            tick,
        ))
    }

    // ------------------------------------------------------------------------
    // Recovery
    // ------------------------------------------------------------------------

    /// Closes sessions left open by earlier processes and returns how many
    /// were closed.
    ///
    /// Each orphan is ended at its last heartbeat, the last moment it was
    /// known alive. Rows of this process are never touched. Only reading
    /// the table can fail the call; an orphan whose update fails is logged
    /// and left for the next recovery.
    pub fn recover_orphaned_sessions(&self) -> StorageResult<usize> {
        let _guard = self.lock();
        let current = self.inner.process.identifier;

        let orphans: Vec<SessionRecord> = self
            .inner
            .storage
            .fetch_all::<SessionRecord>()?
            .into_iter()
            .filter(|s| s.is_open() && s.process_id() != current)
            .collect();

        let mut closed = 0;
        for mut session in orphans {
            let end_time = session.end(session.last_heartbeat_time());
            if let Err(e) = self.inner.storage.update(&session) {
                warn!(
                    session_id = %session.id(),
                    error = %e,
                    "Failed to close orphaned session"
                );
                continue;
            }
            info!(
                session_id = %session.id(),
                process_id = %session.process_id(),
                %end_time,
                "Closed orphaned session"
            );
            closed += 1;
        }
        Ok(closed)
    }
}

fn session_span_attributes(session: &SessionRecord) -> Attributes {
    Attributes::from([
        (
            SPAN_TYPE_KEY.to_string(),
            SpanType::Session.as_str().to_string(),
        ),
        (ATTR_SESSION_ID.to_string(), session.id().to_string()),
        (ATTR_SESSION_STATE.to_string(), session.state().to_string()),
        (
            ATTR_SESSION_COLD_START.to_string(),
            session.cold_start().to_string(),
        ),
    ])
}
