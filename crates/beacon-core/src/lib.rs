//! Beacon Core - Shared types for session lifecycle tracking
//!
//! This crate provides the domain types shared between the record store
//! (`beacon-storage`), the telemetry emitter (`beacon-otel`) and the
//! session controller (`beacon-session`).
//!
//! All code follows the panic-free policy: no `.unwrap()`, `.expect()`,
//! `panic!()`, `unreachable!()`, `todo!()`, or direct indexing `[i]`.

pub mod cold_start;
pub mod error;
pub mod process;
pub mod session;

// Re-exports for convenience
pub use cold_start::{is_cold_start, DEFAULT_ALLOWED_COLD_START_INTERVAL};
pub use error::{DomainError, DomainResult};
pub use process::{ProcessIdentifier, ProcessMetadata, PROCESS_ID_HEX_WIDTH};
pub use session::{SessionId, SessionRecord, SessionState};
