//! `spans` table mapping.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};

use super::Record;

/// A persisted span.
///
/// `data` holds the span attributes encoded by the emitter (JSON).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpanRecord {
    pub id: String,
    pub trace_id: String,
    pub name: String,
    pub span_type: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub data: String,
}

impl SpanRecord {
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.end_time.is_none()
    }
}

fn map_row(row: &Row<'_>) -> rusqlite::Result<SpanRecord> {
    Ok(SpanRecord {
        id: row.get(0)?,
        trace_id: row.get(1)?,
        name: row.get(2)?,
        span_type: row.get(3)?,
        start_time: row.get(4)?,
        end_time: row.get(5)?,
        data: row.get(6)?,
    })
}

impl Record for SpanRecord {
    const TABLE: &'static str = "spans";

    fn define_table(conn: &Connection) -> rusqlite::Result<()> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS spans (
                id TEXT NOT NULL,
                trace_id TEXT NOT NULL,
                name TEXT NOT NULL,
                type TEXT NOT NULL,
                start_time TEXT NOT NULL,
                end_time TEXT,
                data TEXT NOT NULL,
                PRIMARY KEY (trace_id, id)
            );",
        )
    }

    fn key(&self) -> String {
        format!("{}/{}", self.trace_id, self.id)
    }

    fn insert(&self, conn: &Connection) -> rusqlite::Result<()> {
        conn.execute(
            "INSERT INTO spans (id, trace_id, name, type, start_time, end_time, data)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                self.id,
                self.trace_id,
                self.name,
                self.span_type,
                self.start_time,
                self.end_time,
                self.data,
            ],
        )?;
        Ok(())
    }

    fn update(&self, conn: &Connection) -> rusqlite::Result<usize> {
        conn.execute(
            "UPDATE spans
             SET name = ?3, type = ?4, start_time = ?5, end_time = ?6, data = ?7
             WHERE id = ?1 AND trace_id = ?2",
            params![
                self.id,
                self.trace_id,
                self.name,
                self.span_type,
                self.start_time,
                self.end_time,
                self.data,
            ],
        )
    }

    fn delete(&self, conn: &Connection) -> rusqlite::Result<usize> {
        conn.execute(
            "DELETE FROM spans WHERE id = ?1 AND trace_id = ?2",
            params![self.id, self.trace_id],
        )
    }

    fn fetch_all(conn: &Connection) -> rusqlite::Result<Vec<Self>> {
        let mut stmt = conn.prepare(
            "SELECT id, trace_id, name, type, start_time, end_time, data
             FROM spans ORDER BY start_time, rowid",
        )?;
        let rows = stmt.query_map([], map_row)?;
        rows.collect()
    }
}
