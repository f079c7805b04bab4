//! SQLite-based session storage.
//!
//! Provides persistent storage for:
//! - The session log (completed, canceled and interrupted sessions)
//! - Key-value store for application state, including the active-session marker

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection};

use super::csv_log::{read_records, write_records};
use super::data_dir;
use super::session::{ActiveSession, ActiveSessionStore, SessionLog, SessionRecord};
use crate::error::StorageError;

const ACTIVE_SESSION_KEY: &str = "active_session";

/// SQLite database for session storage.
///
/// The connection sits behind a mutex so one database can be shared by
/// the persistence coordinator and the host.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open the database at `~/.config/pucoti/pucoti.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self, StorageError> {
        let path = data_dir()?.join("pucoti.db");
        Self::open_at(&path)
    }

    /// Open (or create) the database at `path`.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open_at(path: &Path) -> Result<Self, StorageError> {
        let conn = Connection::open(path).map_err(|source| StorageError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database (for testing).
    ///
    /// # Errors
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.migrate()?;
        Ok(db)
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn migrate(&self) -> Result<(), StorageError> {
        self.conn().execute_batch(
            "CREATE TABLE IF NOT EXISTS sessions (
                id                INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp         TEXT NOT NULL,
                focus_text        TEXT NOT NULL,
                predicted_seconds INTEGER NOT NULL,
                actual_seconds    INTEGER NOT NULL,
                status            TEXT NOT NULL,
                tags              TEXT NOT NULL DEFAULT '[]'
            );
            DROP INDEX IF EXISTS idx_sessions_identity;
            CREATE INDEX IF NOT EXISTS idx_sessions_lookup
                ON sessions(timestamp, focus_text, status);
            CREATE TABLE IF NOT EXISTS kv (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );",
        )?;
        Ok(())
    }

    /// Insert one row. With `skip_known`, a row matching an existing
    /// timestamp, focus text and status is left out.
    fn insert(&self, record: &SessionRecord, skip_known: bool) -> Result<usize, StorageError> {
        let sql = if skip_known {
            "INSERT INTO sessions
                (timestamp, focus_text, predicted_seconds, actual_seconds, status, tags)
             SELECT ?1, ?2, ?3, ?4, ?5, ?6
             WHERE NOT EXISTS (
                SELECT 1 FROM sessions WHERE timestamp = ?1 AND focus_text = ?2 AND status = ?5
             )"
        } else {
            "INSERT INTO sessions
                (timestamp, focus_text, predicted_seconds, actual_seconds, status, tags)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)"
        };
        let tags = serde_json::to_string(&record.tags)?;
        let changed = self.conn().execute(
            sql,
            params![
                record.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
                record.focus_text,
                record.predicted_seconds as i64,
                record.actual_seconds as i64,
                record.status.as_str(),
                tags,
            ],
        )?;
        Ok(changed)
    }

    /// Every logged session, oldest first.
    ///
    /// # Errors
    /// Returns an error if the query fails or a row cannot be decoded.
    pub fn list_sessions(&self) -> Result<Vec<SessionRecord>, StorageError> {
        self.query_sessions(
            "SELECT timestamp, focus_text, predicted_seconds, actual_seconds, status, tags
             FROM sessions ORDER BY timestamp, id",
            None,
        )
    }

    /// The `limit` most recent sessions, newest first.
    ///
    /// # Errors
    /// Returns an error if the query fails or a row cannot be decoded.
    pub fn recent_sessions(&self, limit: usize) -> Result<Vec<SessionRecord>, StorageError> {
        self.query_sessions(
            "SELECT timestamp, focus_text, predicted_seconds, actual_seconds, status, tags
             FROM sessions ORDER BY timestamp DESC, id DESC LIMIT ?1",
            Some(limit as i64),
        )
    }

    fn query_sessions(
        &self,
        sql: &str,
        limit: Option<i64>,
    ) -> Result<Vec<SessionRecord>, StorageError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(sql)?;
        let map_row = |row: &rusqlite::Row<'_>| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, i64>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
            ))
        };
        let rows = match limit {
            Some(limit) => stmt
                .query_map(params![limit], map_row)?
                .collect::<Result<Vec<_>, _>>()?,
            None => stmt
                .query_map([], map_row)?
                .collect::<Result<Vec<_>, _>>()?,
        };

        rows.into_iter()
            .map(|(timestamp, focus_text, predicted, actual, status, tags)| {
                let timestamp = DateTime::parse_from_rfc3339(&timestamp)
                    .map_err(|e| StorageError::Decode(format!("timestamp '{timestamp}': {e}")))?
                    .with_timezone(&Utc);
                Ok(SessionRecord {
                    timestamp,
                    focus_text,
                    predicted_seconds: predicted.max(0) as u64,
                    actual_seconds: actual.max(0) as u64,
                    status: status.parse()?,
                    tags: serde_json::from_str(&tags)?,
                })
            })
            .collect()
    }

    /// Write every session to `path` in the CSV log format. Returns the row count.
    ///
    /// # Errors
    /// Returns an error if reading the database or writing the file fails.
    pub fn export_csv(&self, path: &Path) -> Result<usize, StorageError> {
        let records = self.list_sessions()?;
        let file = std::fs::File::create(path)?;
        write_records(file, &records, true)?;
        Ok(records.len())
    }

    /// Import sessions from a CSV log, skipping ones already present.
    /// Returns how many rows were added.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed, or an insert fails.
    pub fn import_csv(&self, path: &Path) -> Result<usize, StorageError> {
        let file = std::fs::File::open(path)?;
        let records = read_records(file)?;
        let mut added = 0;
        for record in &records {
            added += self.insert(record, true)?;
        }
        tracing::info!(added, total = records.len(), "imported session log");
        Ok(added)
    }

    /// Get a value from the kv store.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub fn kv_get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let conn = self.conn();
        let mut stmt = conn.prepare("SELECT value FROM kv WHERE key = ?1")?;
        let result = stmt.query_row(params![key], |row| row.get::<_, String>(0));
        match result {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Set a value in the kv store.
    ///
    /// # Errors
    /// Returns an error if the write fails.
    pub fn kv_set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.conn().execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    /// Remove a key from the kv store. Missing keys are fine.
    ///
    /// # Errors
    /// Returns an error if the delete fails.
    pub fn kv_delete(&self, key: &str) -> Result<(), StorageError> {
        self.conn()
            .execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(())
    }
}

impl SessionLog for Database {
    fn append(&self, record: &SessionRecord) -> Result<(), StorageError> {
        self.insert(record, false)?;
        Ok(())
    }
}

impl ActiveSessionStore for Database {
    fn save_active(&self, session: &ActiveSession) -> Result<(), StorageError> {
        let json = serde_json::to_string(session)?;
        self.kv_set(ACTIVE_SESSION_KEY, &json)
    }

    fn load_active(&self) -> Result<Option<ActiveSession>, StorageError> {
        match self.kv_get(ACTIVE_SESSION_KEY)? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    fn clear_active(&self) -> Result<(), StorageError> {
        self.kv_delete(ACTIVE_SESSION_KEY)
    }
}
