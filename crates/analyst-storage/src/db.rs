//! Database connection management.
//!
//! Wraps a single rusqlite Connection in a Mutex and exposes it as a
//! [`KeyValueStore`] over the `kv` table.

use std::path::Path;
use std::sync::Mutex;

use rusqlite::{Connection, OptionalExtension};
use tracing::{debug, info};

use analyst_core::error::AnalystError;

use crate::kv::KeyValueStore;
use crate::migrations;

/// SQLite-backed key-value store.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) a database at the given path and run migrations.
    pub fn new(path: &Path) -> Result<Self, AnalystError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)
            .map_err(|e| AnalystError::Storage(format!("Failed to open database: {}", e)))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;",
        )
        .map_err(|e| AnalystError::Storage(format!("Failed to set pragmas: {}", e)))?;

        info!("Database opened at {}", path.display());

        let db = Self {
            conn: Mutex::new(conn),
        };
        db.with_conn(migrations::run_migrations)?;
        Ok(db)
    }

    /// Open an in-memory database (for testing).
    pub fn in_memory() -> Result<Self, AnalystError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| AnalystError::Storage(format!("Failed to open in-memory db: {}", e)))?;

        let db = Self {
            conn: Mutex::new(conn),
        };
        db.with_conn(migrations::run_migrations)?;
        Ok(db)
    }

    /// Execute a closure with a reference to the underlying connection.
    ///
    /// The mutex is held for the duration of the closure.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T, AnalystError>
    where
        F: FnOnce(&Connection) -> Result<T, AnalystError>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| AnalystError::Storage(format!("Database lock poisoned: {}", e)))?;
        f(&conn)
    }
}

impl KeyValueStore for Database {
    fn get(&self, key: &str) -> Result<Option<String>, AnalystError> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT value FROM kv WHERE key = ?1",
                rusqlite::params![key],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| AnalystError::Storage(format!("Failed to read {}: {}", key, e)))
        })
    }

    fn set(&self, key: &str, value: &str) -> Result<(), AnalystError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, strftime('%s', 'now'))
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
                rusqlite::params![key, value],
            )
            .map_err(|e| AnalystError::Storage(format!("Failed to write {}: {}", key, e)))?;
            debug!(key, bytes = value.len(), "kv write");
            Ok(())
        })
    }

    fn remove(&self, key: &str) -> Result<(), AnalystError> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM kv WHERE key = ?1", rusqlite::params![key])
                .map_err(|e| AnalystError::Storage(format!("Failed to delete {}: {}", key, e)))?;
            Ok(())
        })
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").finish()
    }
}
