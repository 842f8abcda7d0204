//! Integration tests for the SessionController.
//!
//! These tests drive the controller through its public API against a real
//! SQLite store and the in-memory telemetry emitter, then check that the
//! current session, the stored rows, the spans and the notifications agree.
//!
//! Tests CAN use `.unwrap()` and `.expect()` - this is allowed.
//! We test the panic-free behavior of production code through assertions.

use std::collections::HashSet;
use std::time::Duration;

use beacon_core::{ProcessIdentifier, ProcessMetadata, SessionId, SessionRecord, SessionState};
use beacon_otel::{InMemoryEmitter, SpanType};
use beacon_session::{
    ConfigError, LifecycleEvent, SessionConfig, SessionController, SessionEvent, SessionUpdate,
    SESSION_SPAN_NAME,
};
use beacon_storage::{Storage, StorageOptions};
use chrono::{DateTime, TimeDelta, Utc};
use tokio::sync::broadcast::error::TryRecvError;
use tokio::sync::broadcast::Receiver;
use tokio::time::sleep;

// ============================================================================
// Test Helpers
// ============================================================================

const PROCESS: u32 = 0x00c0_ffee;

struct Harness {
    controller: SessionController,
    storage: Storage,
    emitter: InMemoryEmitter,
}

fn harness_with(config: SessionConfig, process: ProcessMetadata) -> Harness {
    let storage = Storage::in_memory().expect("in-memory store");
    let emitter = InMemoryEmitter::new();
    let controller = SessionController::builder(storage.clone(), emitter.clone())
        .config(config)
        .process(process)
        .build()
        .expect("valid config");
    Harness {
        controller,
        storage,
        emitter,
    }
}

fn harness() -> Harness {
    harness_with(
        SessionConfig::default(),
        ProcessMetadata::new(ProcessIdentifier::new(PROCESS), Some(Utc::now())),
    )
}

fn stored_sessions(storage: &Storage) -> Vec<SessionRecord> {
    storage.fetch_all::<SessionRecord>().expect("fetch sessions")
}

fn stored_session(storage: &Storage, id: &SessionId) -> SessionRecord {
    stored_sessions(storage)
        .into_iter()
        .find(|s| s.id() == id)
        .expect("session row exists")
}

fn drain(rx: &mut Receiver<SessionEvent>) -> Vec<SessionEvent> {
    let mut events = Vec::new();
    loop {
        match rx.try_recv() {
            Ok(event) => events.push(event),
            Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return events,
            Err(TryRecvError::Lagged(_)) => continue,
        }
    }
}

fn at(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000 + secs, 0).unwrap()
}

// ============================================================================
// Start
// ============================================================================

#[test]
fn test_start_session_ids_are_unique() {
    let h = harness();
    let mut ids = HashSet::new();

    for _ in 0..20 {
        let session = h.controller.start_session(SessionState::Foreground).value;
        assert!(ids.insert(session.id().clone()), "duplicate session id");
    }
}

#[test]
fn test_start_session_sets_requested_state() {
    let h = harness();

    for state in [SessionState::Foreground, SessionState::Background] {
        let session = h.controller.start_session(state).value;
        assert_eq!(session.state(), state);
        assert_eq!(
            h.controller.current_session().map(|s| s.state()),
            Some(state)
        );
    }
}

#[test]
fn test_start_session_initial_fields() {
    let h = harness();
    let start = Utc::now();

    let session = h
        .controller
        .start_session_at(SessionState::Foreground, start)
        .into_result()
        .unwrap();

    assert_eq!(session.start_time(), start);
    assert_eq!(session.last_heartbeat_time(), start);
    assert_eq!(session.end_time(), None);
    assert!(!session.app_terminated());
    assert_eq!(session.process_id(), ProcessIdentifier::new(PROCESS));
}

#[test]
fn test_start_session_sets_current_session_and_span() {
    let h = harness();
    let mut rx = h.controller.subscribe();

    let session = h.controller.start_session(SessionState::Foreground).value;

    assert_eq!(h.controller.current_session(), Some(session.clone()));

    let span = h.controller.current_session_span().expect("span is open");
    assert_eq!(span.name, SESSION_SPAN_NAME);
    assert_eq!(span.span_type, SpanType::Session);
    assert_eq!(span.start_time, session.start_time());
    assert_eq!(span.attribute("session.id"), Some(session.id().as_str()));
    assert_eq!(span.attribute("session.state"), Some("foreground"));
    assert_eq!(span.attribute("emb.type"), Some("ux.session"));

    assert_eq!(h.emitter.open_spans(), vec![span]);
    assert_eq!(
        drain(&mut rx),
        vec![SessionEvent::DidStart {
            session_id: session.id().clone()
        }]
    );
}

#[test]
fn test_start_session_saves_row() {
    let h = harness();

    let session = h.controller.start_session(SessionState::Foreground).value;

    assert_eq!(stored_sessions(&h.storage), vec![session]);
}

#[test]
fn test_start_while_open_ends_previous_first() {
    let h = harness();
    let first = h.controller.start_session(SessionState::Foreground).value;
    let mut rx = h.controller.subscribe();

    let second = h.controller.start_session(SessionState::Background).value;

    assert_eq!(
        drain(&mut rx),
        vec![
            SessionEvent::WillEnd {
                session_id: first.id().clone()
            },
            SessionEvent::DidStart {
                session_id: second.id().clone()
            },
        ]
    );

    let first_row = stored_session(&h.storage, first.id());
    assert!(first_row.end_time().is_some());
    assert!(stored_session(&h.storage, second.id()).is_open());

    let ended = h.emitter.ended_spans();
    assert_eq!(ended.len(), 1);
    assert_eq!(
        ended[0].span.attribute("session.id"),
        Some(first.id().as_str())
    );
    assert_eq!(Some(ended[0].end_time), first_row.end_time());
    assert_eq!(h.emitter.open_spans().len(), 1);
}

// ============================================================================
// Cold Start
// ============================================================================

fn cold_start_harness(process_start: DateTime<Utc>) -> Harness {
    harness_with(
        SessionConfig::default().with_allowed_cold_start_interval(Duration::from_secs(10)),
        ProcessMetadata::new(ProcessIdentifier::new(PROCESS), Some(process_start)),
    )
}

#[test]
fn test_cold_start_at_process_start() {
    let h = cold_start_harness(at(0));
    let session = h.controller.start_session_at(SessionState::Foreground, at(0)).value;
    assert!(session.cold_start());
}

#[test]
fn test_cold_start_at_window_end() {
    let h = cold_start_harness(at(0));
    let session = h.controller.start_session_at(SessionState::Foreground, at(10)).value;
    assert!(session.cold_start());
}

#[test]
fn test_not_cold_start_after_window() {
    let h = cold_start_harness(at(0));
    let session = h.controller.start_session_at(SessionState::Foreground, at(11)).value;
    assert!(!session.cold_start());
}

#[test]
fn test_not_cold_start_before_process_start() {
    let h = cold_start_harness(at(0));
    let session = h.controller.start_session_at(SessionState::Foreground, at(-1)).value;
    assert!(!session.cold_start());
}

#[test]
fn test_not_cold_start_without_process_start_time() {
    let h = harness_with(
        SessionConfig::default(),
        ProcessMetadata::new(ProcessIdentifier::new(PROCESS), None),
    );
    let session = h.controller.start_session(SessionState::Foreground).value;
    assert!(!session.cold_start());
}

#[test]
fn test_cold_start_recorded_on_span() {
    let h = cold_start_harness(at(0));
    let _ = h.controller.start_session_at(SessionState::Foreground, at(3));
    let span = h.controller.current_session_span().unwrap();
    assert_eq!(span.attribute("session.cold_start"), Some("true"));
}

// ============================================================================
// End
// ============================================================================

#[test]
fn test_end_session_clears_current_state() {
    let h = harness();
    let _ = h.controller.start_session(SessionState::Foreground);

    let _ = h.controller.end_session();

    assert!(h.controller.current_session().is_none());
    assert!(h.controller.current_session_span().is_none());
}

#[test]
fn test_end_session_persists_end_time_and_closes_span() {
    let h = harness();
    let session = h.controller.start_session(SessionState::Foreground).value;

    let end = h.controller.end_session().into_result().unwrap();

    let rows = stored_sessions(&h.storage);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id(), session.id());
    assert_eq!(rows[0].end_time(), Some(end));

    let ended = h.emitter.ended_spans();
    assert_eq!(ended.len(), 1);
    assert_eq!(ended[0].end_time, end);
    assert!(h.emitter.open_spans().is_empty());
}

#[test]
fn test_end_session_at_explicit_time() {
    let h = harness();
    let _ = h.controller.start_session_at(SessionState::Foreground, at(0));

    let end = h.controller.end_session_at(at(42)).value;

    assert_eq!(end, at(42));
    assert_eq!(stored_sessions(&h.storage)[0].end_time(), Some(at(42)));
}

#[test]
fn test_end_session_sends_will_end_with_session_id() {
    let h = harness();
    let session = h.controller.start_session(SessionState::Foreground).value;
    let mut rx = h.controller.subscribe();

    let _ = h.controller.end_session();

    assert_eq!(
        drain(&mut rx),
        vec![SessionEvent::WillEnd {
            session_id: session.id().clone()
        }]
    );
}

#[test]
fn test_end_session_without_session_is_noop() {
    let h = harness();
    let mut rx = h.controller.subscribe();

    let before = Utc::now();
    let outcome = h.controller.end_session();

    assert!(outcome.is_durable());
    assert!(outcome.value >= before);
    assert!(stored_sessions(&h.storage).is_empty());
    assert!(h.emitter.ended_spans().is_empty());
    assert!(drain(&mut rx).is_empty());
}

#[test]
fn test_end_session_twice_only_ends_once() {
    let h = harness();
    let _ = h.controller.start_session(SessionState::Foreground);
    let first = h.controller.end_session().value;
    let mut rx = h.controller.subscribe();

    let _ = h.controller.end_session();

    assert_eq!(stored_sessions(&h.storage)[0].end_time(), Some(first));
    assert_eq!(h.emitter.ended_spans().len(), 1);
    assert!(drain(&mut rx).is_empty());
}

// ============================================================================
// Update
// ============================================================================

#[test]
fn test_update_state_changes_only_state() {
    let h = harness();
    let session = h.controller.start_session(SessionState::Foreground).value;

    let updated = h
        .controller
        .update(SessionUpdate::new().with_state(SessionState::Background))
        .expect("session is open")
        .into_result()
        .unwrap();

    assert_eq!(updated.id(), session.id());
    assert_eq!(updated.state(), SessionState::Background);
    assert!(!updated.app_terminated());
    assert_eq!(updated.cold_start(), session.cold_start());
    assert!(updated.last_heartbeat_time() >= session.last_heartbeat_time());

    let row = stored_session(&h.storage, session.id());
    assert_eq!(row, updated);
}

#[test]
fn test_update_app_terminated_is_persisted() {
    let h = harness();
    let session = h.controller.start_session(SessionState::Foreground).value;

    let _ = h
        .controller
        .update(SessionUpdate::new().with_app_terminated(true));

    let row = stored_session(&h.storage, session.id());
    assert!(row.app_terminated());
    assert_eq!(row.state(), SessionState::Foreground);
    assert!(row.is_open());
}

#[test]
fn test_update_without_session_is_noop() {
    let h = harness();
    let mut rx = h.controller.subscribe();

    let outcome = h
        .controller
        .update(SessionUpdate::new().with_state(SessionState::Background));

    assert!(outcome.is_none());
    assert!(stored_sessions(&h.storage).is_empty());
    assert!(drain(&mut rx).is_empty());
}

#[test]
fn test_update_sends_no_notification() {
    let h = harness();
    let _ = h.controller.start_session(SessionState::Foreground);
    let mut rx = h.controller.subscribe();

    let _ = h
        .controller
        .update(SessionUpdate::new().with_state(SessionState::Background));

    assert!(drain(&mut rx).is_empty());
}

// ============================================================================
// Heartbeat
// ============================================================================

fn heartbeat_harness() -> Harness {
    harness_with(
        SessionConfig::default().with_heartbeat_interval(Duration::from_millis(100)),
        ProcessMetadata::new(ProcessIdentifier::new(PROCESS), None),
    )
}

#[tokio::test]
async fn test_heartbeat_advances_while_open() {
    let h = heartbeat_harness();
    let session = h.controller.start_session(SessionState::Foreground).value;

    sleep(Duration::from_millis(350)).await;

    let row = stored_session(&h.storage, session.id());
    assert!(row.last_heartbeat_time() > session.last_heartbeat_time());
    assert_eq!(
        h.controller.current_session().map(|s| s.last_heartbeat_time()),
        Some(row.last_heartbeat_time())
    );
}

#[tokio::test]
async fn test_heartbeat_keeps_increasing() {
    let h = heartbeat_harness();
    let session = h.controller.start_session(SessionState::Foreground).value;

    sleep(Duration::from_millis(250)).await;
    let first = stored_session(&h.storage, session.id()).last_heartbeat_time();

    sleep(Duration::from_millis(250)).await;
    let second = stored_session(&h.storage, session.id()).last_heartbeat_time();

    assert!(second > first);
}

#[tokio::test]
async fn test_heartbeat_stops_after_end() {
    let h = heartbeat_harness();
    let session = h.controller.start_session(SessionState::Foreground).value;
    sleep(Duration::from_millis(250)).await;

    let _ = h.controller.end_session();
    let at_end = stored_session(&h.storage, session.id());

    sleep(Duration::from_millis(350)).await;
    let later = stored_session(&h.storage, session.id());

    assert_eq!(later.last_heartbeat_time(), at_end.last_heartbeat_time());
    assert_eq!(later, at_end);
}

#[tokio::test]
async fn test_heartbeat_only_touches_new_session_after_restart() {
    let h = heartbeat_harness();
    let first = h.controller.start_session(SessionState::Foreground).value;
    sleep(Duration::from_millis(150)).await;

    let second = h.controller.start_session(SessionState::Background).value;
    let first_at_end = stored_session(&h.storage, first.id());

    sleep(Duration::from_millis(350)).await;

    assert_eq!(stored_session(&h.storage, first.id()), first_at_end);
    assert!(
        stored_session(&h.storage, second.id()).last_heartbeat_time()
            > second.last_heartbeat_time()
    );
}

#[tokio::test]
async fn test_heartbeat_does_not_change_state_or_notify() {
    let h = heartbeat_harness();
    let session = h.controller.start_session(SessionState::Background).value;
    let mut rx = h.controller.subscribe();

    sleep(Duration::from_millis(250)).await;

    let row = stored_session(&h.storage, session.id());
    assert_eq!(row.state(), SessionState::Background);
    assert!(!row.app_terminated());
    assert!(drain(&mut rx).is_empty());
}

#[tokio::test]
async fn test_heartbeat_survives_storage_failure() {
    let h = heartbeat_harness();
    let _ = h.controller.start_session(SessionState::Foreground);
    h.storage.execute_query("DROP TABLE sessions", &[]).unwrap();

    sleep(Duration::from_millis(250)).await;

    // Still open, and the tick kept the in-memory heartbeat moving.
    let current = h.controller.current_session().expect("still open");
    assert!(current.last_heartbeat_time() > current.start_time());
}

// ============================================================================
// Persistence Failures
// ============================================================================

#[test]
fn test_start_applies_in_memory_when_insert_fails() {
    let h = harness();
    h.storage.execute_query("DROP TABLE sessions", &[]).unwrap();
    let mut rx = h.controller.subscribe();

    let outcome = h.controller.start_session(SessionState::Foreground);

    assert!(!outcome.is_durable());
    let session = outcome.value;
    assert_eq!(h.controller.current_session(), Some(session.clone()));
    assert!(h.controller.current_session_span().is_some());
    assert_eq!(
        drain(&mut rx),
        vec![SessionEvent::DidStart {
            session_id: session.id().clone()
        }]
    );
}

#[test]
fn test_end_applies_in_memory_when_update_fails() {
    let h = harness();
    let _ = h.controller.start_session(SessionState::Foreground);
    h.storage.execute_query("DROP TABLE sessions", &[]).unwrap();

    let outcome = h.controller.end_session();

    assert!(outcome.into_result().is_err());
    assert!(h.controller.current_session().is_none());
    assert!(h.controller.current_session_span().is_none());
    assert_eq!(h.emitter.ended_spans().len(), 1);
}

#[test]
fn test_update_reports_failure_but_keeps_change() {
    let h = harness();
    let _ = h.controller.start_session(SessionState::Foreground);
    h.storage.execute_query("DROP TABLE sessions", &[]).unwrap();

    let outcome = h
        .controller
        .update(SessionUpdate::new().with_state(SessionState::Background))
        .unwrap();

    assert!(!outcome.is_durable());
    assert_eq!(
        h.controller.current_session().map(|s| s.state()),
        Some(SessionState::Background)
    );
}

// ============================================================================
// Orphan Recovery
// ============================================================================

#[test]
fn test_recover_closes_sessions_from_other_processes() {
    let storage = Storage::in_memory().unwrap();

    let mut orphan = SessionRecord::new(
        SessionId::new("orphan"),
        SessionState::Foreground,
        ProcessIdentifier::new(1),
        at(0),
        false,
    );
    orphan.heartbeat(at(30));
    storage.insert(&orphan).unwrap();

    let mut closed = SessionRecord::new(
        SessionId::new("closed"),
        SessionState::Background,
        ProcessIdentifier::new(1),
        at(100),
        false,
    );
    closed.end(at(110));
    storage.insert(&closed).unwrap();

    let controller = SessionController::builder(storage.clone(), InMemoryEmitter::new())
        .process(ProcessMetadata::new(ProcessIdentifier::new(2), None))
        .build()
        .unwrap();
    let mine = controller.start_session(SessionState::Foreground).value;

    assert_eq!(controller.recover_orphaned_sessions().unwrap(), 1);

    let rows = stored_sessions(&storage);
    let find = |id: &str| rows.iter().find(|s| s.id().as_str() == id).unwrap();
    assert_eq!(find("orphan").end_time(), Some(at(30)));
    assert_eq!(find("closed").end_time(), Some(at(110)));
    assert!(find(mine.id().as_str()).is_open());

    // Nothing left to recover.
    assert_eq!(controller.recover_orphaned_sessions().unwrap(), 0);
}

#[test]
fn test_recover_continues_past_failed_row() {
    let storage = Storage::in_memory().unwrap();
    for (id, start) in [("stuck", 0), ("fine", 10)] {
        let mut orphan = SessionRecord::new(
            SessionId::new(id),
            SessionState::Foreground,
            ProcessIdentifier::new(1),
            at(start),
            false,
        );
        orphan.heartbeat(at(start + 5));
        storage.insert(&orphan).unwrap();
    }
    storage
        .execute_query(
            "CREATE TRIGGER reject_stuck BEFORE UPDATE ON sessions
             WHEN OLD.id = 'stuck'
             BEGIN SELECT RAISE(ABORT, 'row is locked'); END",
            &[],
        )
        .unwrap();

    let controller = SessionController::builder(storage.clone(), InMemoryEmitter::new())
        .process(ProcessMetadata::new(ProcessIdentifier::new(2), None))
        .build()
        .unwrap();

    assert_eq!(controller.recover_orphaned_sessions().unwrap(), 1);

    let rows = stored_sessions(&storage);
    let find = |id: &str| rows.iter().find(|s| s.id().as_str() == id).unwrap();
    assert!(find("stuck").is_open());
    assert_eq!(find("fine").end_time(), Some(at(15)));
}

#[test]
fn test_build_rejects_zero_heartbeat_interval() {
    let result = SessionController::builder(Storage::in_memory().unwrap(), InMemoryEmitter::new())
        .config(SessionConfig::default().with_heartbeat_interval(Duration::ZERO))
        .build();

    assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
}

#[test]
fn test_recover_reports_storage_failure() {
    let h = harness();
    h.storage.execute_query("DROP TABLE sessions", &[]).unwrap();
    assert!(h.controller.recover_orphaned_sessions().is_err());
}

// ============================================================================
// Lifecycle Events
// ============================================================================

#[test]
fn test_foregrounded_starts_foreground_session_once() {
    let h = harness();

    h.controller
        .handle_lifecycle(LifecycleEvent::Foregrounded)
        .unwrap();
    let first = h.controller.current_session().unwrap();
    assert_eq!(first.state(), SessionState::Foreground);

    h.controller
        .handle_lifecycle(LifecycleEvent::Foregrounded)
        .unwrap();
    assert_eq!(h.controller.current_session().unwrap().id(), first.id());
}

#[test]
fn test_backgrounded_switches_to_background_session() {
    let h = harness();
    h.controller
        .handle_lifecycle(LifecycleEvent::Foregrounded)
        .unwrap();
    let foreground = h.controller.current_session().unwrap();

    h.controller
        .handle_lifecycle(LifecycleEvent::Backgrounded)
        .unwrap();

    let background = h.controller.current_session().unwrap();
    assert_ne!(background.id(), foreground.id());
    assert_eq!(background.state(), SessionState::Background);
    assert!(stored_session(&h.storage, foreground.id()).end_time().is_some());

    // Already background: nothing changes.
    h.controller
        .handle_lifecycle(LifecycleEvent::Backgrounded)
        .unwrap();
    assert_eq!(h.controller.current_session().unwrap().id(), background.id());
}

#[test]
fn test_backgrounded_without_background_sessions_ends() {
    let h = harness_with(
        SessionConfig::default().with_background_sessions(false),
        ProcessMetadata::new(ProcessIdentifier::new(PROCESS), None),
    );
    h.controller
        .handle_lifecycle(LifecycleEvent::Foregrounded)
        .unwrap();

    h.controller
        .handle_lifecycle(LifecycleEvent::Backgrounded)
        .unwrap();

    assert!(h.controller.current_session().is_none());
    assert_eq!(stored_sessions(&h.storage).len(), 1);
}

#[test]
fn test_foregrounded_replaces_background_session() {
    let h = harness();
    let background = h.controller.start_session(SessionState::Background).value;

    h.controller
        .handle_lifecycle(LifecycleEvent::Foregrounded)
        .unwrap();

    let current = h.controller.current_session().unwrap();
    assert_ne!(current.id(), background.id());
    assert_eq!(current.state(), SessionState::Foreground);
}

#[test]
fn test_will_terminate_marks_and_ends_session() {
    let h = harness();
    let session = h.controller.start_session(SessionState::Foreground).value;
    let mut rx = h.controller.subscribe();

    h.controller
        .handle_lifecycle(LifecycleEvent::WillTerminate)
        .unwrap();

    let row = stored_session(&h.storage, session.id());
    assert!(row.app_terminated());
    assert!(row.end_time().is_some());
    assert!(h.controller.current_session().is_none());
    assert_eq!(
        drain(&mut rx),
        vec![SessionEvent::WillEnd {
            session_id: session.id().clone()
        }]
    );
}

#[test]
fn test_will_terminate_without_session_is_noop() {
    let h = harness();
    h.controller
        .handle_lifecycle(LifecycleEvent::WillTerminate)
        .unwrap();
    assert!(stored_sessions(&h.storage).is_empty());
}

// ============================================================================
// On-disk Store
// ============================================================================

#[test]
fn test_sessions_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let options = StorageOptions::on_disk(dir.path(), "beacon.sqlite");

    let id = {
        let storage = Storage::open(options.clone()).unwrap();
        let controller = SessionController::builder(storage, InMemoryEmitter::new())
            .process(ProcessMetadata::new(ProcessIdentifier::new(PROCESS), None))
            .build()
            .unwrap();
        let session = controller.start_session(SessionState::Foreground).value;
        let _ = controller.end_session_at(session.start_time() + TimeDelta::seconds(5));
        session.id().clone()
    };

    let storage = Storage::open(options).unwrap();
    let row = stored_session(&storage, &id);
    assert_eq!(row.end_time(), Some(row.start_time() + TimeDelta::seconds(5)));
}

// ============================================================================
// Concurrency
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_transitions_leave_one_open_session() {
    let h = heartbeat_harness();

    let mut tasks = Vec::new();
    for i in 0..8 {
        let controller = h.controller.clone();
        tasks.push(tokio::task::spawn_blocking(move || {
            for _ in 0..10 {
                let state = if i % 2 == 0 {
                    SessionState::Foreground
                } else {
                    SessionState::Background
                };
                let _ = controller.start_session(state);
                let _ = controller.update(SessionUpdate::new().with_app_terminated(false));
            }
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    let rows = stored_sessions(&h.storage);
    assert_eq!(rows.len(), 80);
    let open: Vec<_> = rows.iter().filter(|s| s.is_open()).collect();
    assert_eq!(open.len(), 1);
    assert_eq!(
        h.controller.current_session().map(|s| s.id().clone()),
        Some(open[0].id().clone())
    );
    assert_eq!(h.emitter.open_spans().len(), 1);
    assert_eq!(h.emitter.ended_spans().len(), 79);
}
