//! The SQLite-backed record store.

use std::fs;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use beacon_core::SessionRecord;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};
use tracing::{debug, info};

use crate::error::{StorageError, StorageResult};
use crate::options::StorageOptions;
use crate::records::{Record, SpanRecord};

/// How long a writer waits on a locked database file before failing.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Database connection wrapper.
///
/// Thread-safe via internal Mutex. All database operations acquire the lock,
/// so physical writes are serialized. Cheap to clone; clones share the
/// same connection.
#[derive(Clone)]
pub struct Storage {
    inner: Arc<Inner>,
}

struct Inner {
    options: StorageOptions,
    conn: Mutex<Connection>,
}

impl std::fmt::Debug for Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storage")
            .field("options", &self.inner.options)
            .finish_non_exhaustive()
    }
}

impl Storage {
    /// Opens (or creates) the database and defines all tables.
    pub fn open(options: StorageOptions) -> StorageResult<Self> {
        let conn = match &options {
            StorageOptions::OnDisk {
                base_dir,
                file_name,
            } => {
                fs::create_dir_all(base_dir)?;
                let conn = Connection::open(base_dir.join(file_name))?;
                conn.busy_timeout(BUSY_TIMEOUT)?;
                conn
            }
            StorageOptions::InMemory => Connection::open_in_memory()?,
        };

        SessionRecord::define_table(&conn)?;
        SpanRecord::define_table(&conn)?;

        info!(path = ?options.file_path(), "Storage opened");

        Ok(Self {
            inner: Arc::new(Inner {
                options,
                conn: Mutex::new(conn),
            }),
        })
    }

    /// Opens a private in-memory database.
    pub fn in_memory() -> StorageResult<Self> {
        Self::open(StorageOptions::InMemory)
    }

    pub fn options(&self) -> &StorageOptions {
        &self.inner.options
    }

    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> StorageResult<T>) -> StorageResult<T> {
        let conn = self
            .inner
            .conn
            .lock()
            .map_err(|_| StorageError::LockPoisoned)?;
        f(&conn)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Sync operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Inserts a new row.
    pub fn insert<R: Record>(&self, record: &R) -> StorageResult<()> {
        self.with_conn(|conn| {
            record.insert(conn)?;
            debug!(table = R::TABLE, key = %record.key(), "Record inserted");
            Ok(())
        })
    }

    /// Rewrites an existing row.
    ///
    /// # Errors
    /// - `StorageError::RecordNotFound` if no row has the record's key
    pub fn update<R: Record>(&self, record: &R) -> StorageResult<()> {
        self.with_conn(|conn| {
            if record.update(conn)? == 0 {
                return Err(StorageError::not_found(R::TABLE, record.key()));
            }
            debug!(table = R::TABLE, key = %record.key(), "Record updated");
            Ok(())
        })
    }

    /// Deletes a row. Returns `false` if there was nothing to delete.
    pub fn delete<R: Record>(&self, record: &R) -> StorageResult<bool> {
        self.with_conn(|conn| {
            let deleted = record.delete(conn)? > 0;
            debug!(table = R::TABLE, key = %record.key(), deleted, "Record delete");
            Ok(deleted)
        })
    }

    /// Fetches every row of `R`'s table, oldest first.
    pub fn fetch_all<R: Record>(&self) -> StorageResult<Vec<R>> {
        self.with_conn(|conn| Ok(R::fetch_all(conn)?))
    }

    /// Executes a raw SQL statement; returns rows changed.
    pub fn execute_query(&self, sql: &str, arguments: &[Value]) -> StorageResult<usize> {
        self.with_conn(|conn| {
            let changed = conn.execute(sql, params_from_iter(arguments.iter()))?;
            debug!(sql, changed, "Query executed");
            Ok(changed)
        })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Async operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Async form of [`Storage::insert`].
    pub async fn insert_async<R: Record>(&self, record: R) -> StorageResult<()> {
        let storage = self.clone();
        run_blocking(move || storage.insert(&record)).await
    }

    /// Async form of [`Storage::update`].
    pub async fn update_async<R: Record>(&self, record: R) -> StorageResult<()> {
        let storage = self.clone();
        run_blocking(move || storage.update(&record)).await
    }

    /// Async form of [`Storage::delete`].
    pub async fn delete_async<R: Record>(&self, record: R) -> StorageResult<bool> {
        let storage = self.clone();
        run_blocking(move || storage.delete(&record)).await
    }

    /// Async form of [`Storage::fetch_all`].
    pub async fn fetch_all_async<R: Record>(&self) -> StorageResult<Vec<R>> {
        let storage = self.clone();
        run_blocking(move || storage.fetch_all::<R>()).await
    }

    /// Async form of [`Storage::execute_query`].
    pub async fn execute_query_async(
        &self,
        sql: impl Into<String>,
        arguments: Vec<Value>,
    ) -> StorageResult<usize> {
        let storage = self.clone();
        let sql = sql.into();
        run_blocking(move || storage.execute_query(&sql, &arguments)).await
    }
}

/// Runs a store call on tokio's blocking pool.
async fn run_blocking<T, F>(f: F) -> StorageResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> StorageResult<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| StorageError::Task(e.to_string()))?
}
