//! SQLite-backed ledger store.
//!
//! A single `kv` table holds every shared field. The database runs in WAL
//! mode with a busy timeout so the foreground and background processes can
//! open the same file; `flush()` checkpoints the WAL into the main file.

use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use super::{data_dir, LedgerStore, StoreKey};
use crate::error::StoreError;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

pub struct SqliteStore {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

impl SqliteStore {
    /// Open the store at `<data_dir>/ledger.db`.
    ///
    /// # Errors
    /// Returns an error if the data directory or database cannot be opened.
    pub fn open() -> Result<Self, StoreError> {
        let dir = data_dir().map_err(|e| StoreError::QueryFailed(e.to_string()))?;
        Self::open_at(dir.join("ledger.db"))
    }

    /// Open (or create) the store at an explicit path.
    pub fn open_at(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let conn = Connection::open(&path).map_err(|source| StoreError::OpenFailed {
            path: path.clone(),
            source,
        })?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
            row.get::<_, String>(0)
        })?;
        let store = Self {
            conn: Mutex::new(conn),
            path: Some(path),
        };
        store.migrate()?;
        Ok(store)
    }

    /// Open an in-memory database (for tests).
    pub fn open_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
            path: None,
        };
        store.migrate()?;
        Ok(store)
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::QueryFailed("Failed to lock connection".into()))
    }

    fn migrate(&self) -> Result<(), StoreError> {
        self.lock()?.execute_batch(
            "CREATE TABLE IF NOT EXISTS kv (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );",
        )?;
        Ok(())
    }
}

impl LedgerStore for SqliteStore {
    fn get(&self, key: StoreKey) -> Result<Option<String>, StoreError> {
        let conn = self.lock()?;
        let value = conn
            .query_row(
                "SELECT value FROM kv WHERE key = ?1",
                params![key.as_str()],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: StoreKey, value: &str) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key.as_str(), value],
        )
        .map_err(|e| match StoreError::from(e) {
            StoreError::QueryFailed(message) => StoreError::WriteFailed {
                key: key.as_str().to_string(),
                message,
            },
            other => other,
        })?;
        Ok(())
    }

    fn flush(&self) -> Result<(), StoreError> {
        let conn = self.lock()?;
        // Returns (busy, log frames, checkpointed frames); busy = 1 means a
        // reader kept the checkpoint from completing.
        let busy: i64 = conn
            .query_row("PRAGMA wal_checkpoint(FULL)", [], |row| row.get(0))
            .map_err(|e| StoreError::FlushFailed(e.to_string()))?;
        if busy != 0 {
            return Err(StoreError::FlushFailed("checkpoint blocked by reader".into()));
        }
        Ok(())
    }
}
