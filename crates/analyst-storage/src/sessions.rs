//! Session list management.
//!
//! Maintains the ordered list of chat sessions and the active selection,
//! persisted as a JSON array under `chat_sessions`. Once initialized the
//! list is never empty and the active id always names a member.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use analyst_core::error::AnalystError;
use analyst_core::types::Session;

use crate::kv::KeyValueStore;
use crate::transcript::TranscriptStore;

/// Storage key for the session list.
pub const SESSIONS_KEY: &str = "chat_sessions";

/// Generate a unique, time-derived session id.
pub fn generate_session_id() -> String {
    let random = Uuid::new_v4().simple().to_string();
    format!("sess-{}-{}", Utc::now().timestamp_millis(), &random[..8])
}

/// Decode the stored list entry by entry, skipping entries that do not parse.
fn parse_sessions(raw: &str) -> Vec<Session> {
    let entries: Vec<serde_json::Value> = match serde_json::from_str(raw) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(error = %e, "Stored session list is corrupt; starting fresh");
            return Vec::new();
        }
    };

    entries
        .into_iter()
        .enumerate()
        .filter_map(|(index, entry)| match serde_json::from_value(entry) {
            Ok(session) => Some(session),
            Err(e) => {
                warn!(index, error = %e, "Skipping malformed stored session");
                None
            }
        })
        .collect()
}

/// CRUD over the persisted session list.
pub struct SessionStore {
    store: Arc<dyn KeyValueStore>,
    transcripts: TranscriptStore,
    sessions: Vec<Session>,
    active: Option<String>,
    initialized: bool,
}

impl SessionStore {
    pub fn new(store: Arc<dyn KeyValueStore>, transcripts: TranscriptStore) -> Self {
        Self {
            store,
            transcripts,
            sessions: Vec::new(),
            active: None,
            initialized: false,
        }
    }

    /// Load the persisted list, creating a default session if it is empty.
    pub fn initialize(&mut self) -> Result<(), AnalystError> {
        if self.initialized {
            return Err(AnalystError::AlreadyInitialized);
        }

        let stored = match self.store.get(SESSIONS_KEY)? {
            Some(raw) => parse_sessions(&raw),
            None => Vec::new(),
        };

        if stored.is_empty() {
            let session = Session::new(generate_session_id());
            self.active = Some(session.id.clone());
            self.sessions = vec![session];
        } else {
            self.active = Some(stored[0].id.clone());
            self.sessions = stored;
        }

        self.initialized = true;
        info!(count = self.sessions.len(), "Session store initialized");
        self.persist()
    }

    /// Create a session at the front of the list and make it active.
    pub fn create(&mut self) -> Result<String, AnalystError> {
        self.ensure_initialized()?;
        let session = Session::new(generate_session_id());
        let id = session.id.clone();
        self.sessions.insert(0, session);
        self.active = Some(id.clone());
        debug!(session_id = %id, "Session created");
        self.persist()?;
        Ok(id)
    }

    /// Rename a session. Blank names and unknown ids are ignored.
    ///
    /// Returns whether a session was renamed.
    pub fn rename(&mut self, id: &str, new_name: &str) -> Result<bool, AnalystError> {
        self.ensure_initialized()?;
        let name = new_name.trim();
        if name.is_empty() {
            return Ok(false);
        }
        let Some(session) = self.sessions.iter_mut().find(|s| s.id == id) else {
            return Ok(false);
        };
        session.name = name.to_string();
        self.persist()?;
        Ok(true)
    }

    /// Delete a session and purge its transcript.
    ///
    /// Returns whether a session was deleted. Unknown ids are ignored.
    pub fn delete(&mut self, id: &str) -> Result<bool, AnalystError> {
        self.ensure_initialized()?;
        let Some(pos) = self.sessions.iter().position(|s| s.id == id) else {
            return Ok(false);
        };
        // Purge first so a storage failure leaves the list untouched.
        self.transcripts.purge(id)?;
        self.sessions.remove(pos);

        if self.sessions.is_empty() {
            let session = Session::new(generate_session_id());
            self.active = Some(session.id.clone());
            self.sessions.push(session);
        } else if self.active.as_deref() == Some(id) {
            self.active = Some(self.sessions[0].id.clone());
        }

        debug!(session_id = %id, remaining = self.sessions.len(), "Session deleted");
        self.persist()?;
        Ok(true)
    }

    /// Select the active session. Unknown ids are ignored.
    pub fn set_active(&mut self, id: &str) -> Result<bool, AnalystError> {
        self.ensure_initialized()?;
        if !self.contains(id) {
            return Ok(false);
        }
        self.active = Some(id.to_string());
        self.persist()?;
        Ok(true)
    }

    /// Sessions in display order.
    pub fn sessions(&self) -> &[Session] {
        &self.sessions
    }

    /// The active session id; `None` only before initialization.
    pub fn active_id(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub fn get(&self, id: &str) -> Option<&Session> {
        self.sessions.iter().find(|s| s.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    fn ensure_initialized(&self) -> Result<(), AnalystError> {
        if self.initialized {
            Ok(())
        } else {
            Err(AnalystError::NotInitialized)
        }
    }

    fn persist(&self) -> Result<(), AnalystError> {
        if !self.initialized {
            return Ok(());
        }
        let json = serde_json::to_string(&self.sessions)?;
        self.store.set(SESSIONS_KEY, &json)
    }
}
