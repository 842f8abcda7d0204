//! Beacon Session - the session state machine
//!
//! [`SessionController`] owns the current session and keeps its store row
//! and its telemetry span in step as the app moves between foreground and
//! background. A heartbeat task refreshes the open session's liveness
//! timestamp, and [`SessionEvent`]s are broadcast to subscribers on every
//! start and end.
//!
//! All code follows the panic-free policy: no `.unwrap()`, `.expect()`,
//! `panic!()`, `unreachable!()`, `todo!()`, or direct indexing `[i]`.

pub mod config;
pub mod controller;
pub mod events;
mod heartbeat;
pub mod lifecycle;
pub mod persisted;

pub use config::{BeaconConfig, ConfigError, SessionConfig, StorageConfig};
pub use controller::{
    SessionController, SessionControllerBuilder, SessionUpdate, SESSION_SPAN_NAME,
};
pub use events::{SessionEvent, EVENT_BUFFER};
pub use lifecycle::LifecycleEvent;
pub use persisted::Persisted;
