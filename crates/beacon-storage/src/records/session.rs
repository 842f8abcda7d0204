//! `sessions` table mapping for [`SessionRecord`].

use beacon_core::{ProcessIdentifier, SessionId, SessionRecord, SessionState};
use rusqlite::{params, Connection, Row};

use super::{conversion_error, Record};

const COLUMNS: &str =
    "id, state, process_id, start_time, end_time, last_heartbeat_time, cold_start, app_terminated";

fn map_row(row: &Row<'_>) -> rusqlite::Result<SessionRecord> {
    let state: String = row.get(1)?;
    let state = state
        .parse::<SessionState>()
        .map_err(|e| conversion_error(1, e))?;
    let process_id: String = row.get(2)?;
    let process_id = ProcessIdentifier::from_hex(&process_id).map_err(|e| conversion_error(2, e))?;

    Ok(SessionRecord::restore(
        SessionId::new(row.get::<_, String>(0)?),
        state,
        process_id,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
    ))
}

impl Record for SessionRecord {
    const TABLE: &'static str = "sessions";

    fn define_table(conn: &Connection) -> rusqlite::Result<()> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS sessions (
                id TEXT PRIMARY KEY NOT NULL,
                state TEXT NOT NULL,
                process_id TEXT NOT NULL,
                start_time TEXT NOT NULL,
                end_time TEXT,
                last_heartbeat_time TEXT NOT NULL,
                cold_start INTEGER NOT NULL DEFAULT 0,
                app_terminated INTEGER NOT NULL DEFAULT 0
            );
            CREATE INDEX IF NOT EXISTS idx_sessions_process_id ON sessions (process_id);",
        )
    }

    fn key(&self) -> String {
        self.id().to_string()
    }

    fn insert(&self, conn: &Connection) -> rusqlite::Result<()> {
        conn.execute(
            &format!("INSERT INTO sessions ({COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"),
            params![
                self.id().as_str(),
                self.state().as_str(),
                self.process_id().to_hex(),
                self.start_time(),
                self.end_time(),
                self.last_heartbeat_time(),
                self.cold_start(),
                self.app_terminated(),
            ],
        )?;
        Ok(())
    }

    fn update(&self, conn: &Connection) -> rusqlite::Result<usize> {
        conn.execute(
            "UPDATE sessions
             SET state = ?2, process_id = ?3, start_time = ?4, end_time = ?5,
                 last_heartbeat_time = ?6, cold_start = ?7, app_terminated = ?8
             WHERE id = ?1",
            params![
                self.id().as_str(),
                self.state().as_str(),
                self.process_id().to_hex(),
                self.start_time(),
                self.end_time(),
                self.last_heartbeat_time(),
                self.cold_start(),
                self.app_terminated(),
            ],
        )
    }

    fn delete(&self, conn: &Connection) -> rusqlite::Result<usize> {
        conn.execute("DELETE FROM sessions WHERE id = ?1", params![self.id().as_str()])
    }

    fn fetch_all(conn: &Connection) -> rusqlite::Result<Vec<Self>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {COLUMNS} FROM sessions ORDER BY start_time, rowid"
        ))?;
        let rows = stmt.query_map([], map_row)?;
        rows.collect()
    }
}
