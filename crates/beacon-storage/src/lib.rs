//! Beacon Storage - durable record store for session and span rows
//!
//! An SQLite database behind a single mutex-guarded connection. Every
//! operation is available synchronously (blocks the caller until the write
//! completes) and asynchronously (runs on tokio's blocking pool and resolves
//! to a `StorageResult`).
//!
//! Row types implement [`Record`], which keeps the generic store free of any
//! per-table SQL.

pub mod error;
pub mod options;
pub mod records;
pub mod storage;

pub use error::{StorageError, StorageResult};
pub use options::{StorageOptions, DEFAULT_DATABASE_FILE};
pub use records::{Record, SpanRecord};
pub use rusqlite::types::Value as SqlValue;
pub use storage::Storage;
