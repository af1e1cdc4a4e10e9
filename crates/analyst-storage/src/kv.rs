//! Durable key-value text storage.
//!
//! The session list and every transcript are stored as JSON text under a
//! single key each. Writes are full-value overwrites.

use std::collections::HashMap;
use std::sync::Mutex;

use analyst_core::error::AnalystError;

/// Key-value text storage scoped to one user profile.
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`.
    fn get(&self, key: &str) -> Result<Option<String>, AnalystError>;

    /// Overwrite the value stored under `key`.
    fn set(&self, key: &str, value: &str) -> Result<(), AnalystError>;

    /// Delete `key`. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<(), AnalystError>;
}

/// Volatile store used by tests and by `--ephemeral` runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>, AnalystError> {
        self.entries
            .lock()
            .map_err(|e| AnalystError::Storage(format!("memory store lock poisoned: {}", e)))
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, AnalystError> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), AnalystError> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), AnalystError> {
        self.lock()?.remove(key);
        Ok(())
    }
}
