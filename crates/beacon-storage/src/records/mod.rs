//! Row types and their table mappings.

mod session;
mod span;

pub use span::SpanRecord;

use rusqlite::Connection;

/// A type persisted as one row of one table.
///
/// Implementors own their SQL; [`crate::Storage`] only sequences calls
/// and translates row counts into results.
pub trait Record: Sized + Send + 'static {
    /// Table the rows live in.
    const TABLE: &'static str;

    /// Creates the table if it does not exist.
    fn define_table(conn: &Connection) -> rusqlite::Result<()>;

    /// Human-readable primary key, used in error messages.
    fn key(&self) -> String;

    fn insert(&self, conn: &Connection) -> rusqlite::Result<()>;

    /// Rewrites the row keyed by `self`; returns rows changed.
    fn update(&self, conn: &Connection) -> rusqlite::Result<usize>;

    /// Deletes the row keyed by `self`; returns rows changed.
    fn delete(&self, conn: &Connection) -> rusqlite::Result<usize>;

    fn fetch_all(conn: &Connection) -> rusqlite::Result<Vec<Self>>;
}

/// Wraps a domain parse failure as a column conversion error.
pub(crate) fn conversion_error<E>(column: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(err))
}
