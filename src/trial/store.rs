use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use rusqlite::{Connection, OptionalExtension};
use thiserror::Error;

/// Key under which the trial-consumed flag is stored.
pub(crate) const TRIAL_CONSUMED_KEY: &str = "trial_consumed";

/// Errors from the durable flag store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// SQLite-level failure.
    #[error("storage error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Could not create the directory holding the store.
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No platform data directory to place the default store in.
    #[error("no platform data directory available")]
    DataDirUnavailable,
}

/// Durable single-key string storage.
///
/// Only one key is ever used (the trial-consumed flag), but the interface
/// is a plain key/value pair so the gate can be tested against the
/// in-memory fake and production code can use the SQLite implementation.
/// Values must survive process restarts on the same device.
pub trait TrialStore: Send + Sync {
    /// Reads the value stored under `key`, if any.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Stores `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS kv (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL
)";

/// SQLite-backed store, one row per key.
///
/// The schema is initialized on open and uses IF NOT EXISTS so re-opening
/// an existing store is idempotent.
pub struct SqliteTrialStore {
    conn: Mutex<Connection>,
}

impl SqliteTrialStore {
    /// Opens an in-memory store. State is lost on drop; useful in tests.
    pub fn in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    /// Opens a file-based store at the given path, creating the file if
    /// it does not exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        Self::from_connection(Connection::open(path)?)
    }

    /// Opens the store at its default location under the platform data
    /// directory, creating intermediate directories as needed.
    pub fn open_default() -> Result<Self, StoreError> {
        let dir = dirs::data_dir()
            .ok_or(StoreError::DataDirUnavailable)?
            .join("glance");
        std::fs::create_dir_all(&dir)?;
        Self::open(dir.join("trial.db"))
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute(SCHEMA, [])?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl TrialStore for SqliteTrialStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let conn = self.conn.lock().expect("trial store lock poisoned");
        let value = conn
            .query_row("SELECT value FROM kv WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let updated_at = time::OffsetDateTime::now_utc()
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap_or_else(|_| "unknown".to_string());

        let conn = self.conn.lock().expect("trial store lock poisoned");
        conn.execute(
            "INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            (key, value, updated_at),
        )?;
        Ok(())
    }
}

/// In-memory store for deterministic tests.
#[derive(Default)]
pub struct MemoryTrialStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryTrialStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl TrialStore for MemoryTrialStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let entries = self.entries.lock().expect("trial store lock poisoned");
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().expect("trial store lock poisoned");
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}
