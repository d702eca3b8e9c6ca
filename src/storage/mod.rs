//! `SQLite` storage layer for `board`.
//!
//! One key-value table holds the JSON snapshot records: the persisted board
//! state and the simulated backend's issue set. Several `board` processes
//! may share the same file; writes are single statements.

use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use board_core::snapshot::SnapshotStore;
use board_core::{BoardError, Result};
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

pub const KV_TABLE_SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS kv (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
";

/// SQLite-backed [`SnapshotStore`].
#[derive(Debug)]
pub struct SqliteSnapshots {
    conn: Mutex<Connection>,
}

impl SqliteSnapshots {
    /// Open (or create) the database at `path` and apply the schema.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the database cannot be opened or migrated.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(storage_error)?;
        conn.busy_timeout(BUSY_TIMEOUT).map_err(storage_error)?;
        Self::with_connection(conn)
    }

    /// Open an in-memory database for testing.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the schema cannot be applied.
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(storage_error)?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(KV_TABLE_SCHEMA).map_err(storage_error)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of stored records.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the query fails.
    pub fn len(&self) -> Result<usize> {
        let count: i64 = self
            .lock()
            .query_row("SELECT COUNT(*) FROM kv", [], |row| row.get(0))
            .map_err(storage_error)?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    /// # Errors
    ///
    /// Returns `Storage` if the query fails.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

impl SnapshotStore for SqliteSnapshots {
    fn load(&self, key: &str) -> Result<Option<String>> {
        self.lock()
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get(0)
            })
            .optional()
            .map_err(storage_error)
    }

    fn save(&self, key: &str, value: &str) -> Result<()> {
        self.lock()
            .execute(
                "INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
                params![key, value, Utc::now().to_rfc3339()],
            )
            .map_err(storage_error)?;
        Ok(())
    }
}

#[allow(clippy::needless_pass_by_value)]
fn storage_error(err: rusqlite::Error) -> BoardError {
    BoardError::Storage(err.to_string())
}
