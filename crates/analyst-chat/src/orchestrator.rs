//! Analyst controller: the single owner of application state.
//!
//! Wires the session and transcript stores to the analysis client, runs the
//! send pipeline, and keeps the latest report per session for export.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use analyst_core::types::{Message, Session};
use analyst_report::{export_async, write_export, ExportFormat, ExportedFile};
use analyst_storage::{KeyValueStore, SessionStore, TranscriptStore};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::client::{AnalysisClient, ChatRequest};
use crate::error::ChatError;
use crate::interpreter::{interpret_body, Outcome};
use crate::render::{render, transport_error, QuickReply};

/// Marks a session as `Sending` for as long as it lives.
struct InFlightGuard<'a> {
    in_flight: &'a Mutex<HashSet<String>>,
    session_id: String,
}

impl<'a> InFlightGuard<'a> {
    fn acquire(in_flight: &'a Mutex<HashSet<String>>, session_id: &str) -> Result<Self, ChatError> {
        let mut set = lock(in_flight, "in-flight")?;
        if !set.insert(session_id.to_string()) {
            return Err(ChatError::SendInFlight(session_id.to_string()));
        }
        Ok(Self {
            in_flight,
            session_id: session_id.to_string(),
        })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        let mut set = self
            .in_flight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        set.remove(&self.session_id);
    }
}

fn lock<'a, T>(mutex: &'a Mutex<T>, what: &str) -> Result<MutexGuard<'a, T>, ChatError> {
    mutex
        .lock()
        .map_err(|e| ChatError::Storage(format!("{} lock poisoned: {}", what, e)))
}

/// Coordinates sessions, transcripts, the analysis service and reports.
pub struct AnalystController {
    sessions: Mutex<SessionStore>,
    transcripts: TranscriptStore,
    client: Arc<dyn AnalysisClient>,
    in_flight: Mutex<HashSet<String>>,
    reports: Mutex<HashMap<String, Value>>,
}

impl AnalystController {
    pub fn new(store: Arc<dyn KeyValueStore>, client: Arc<dyn AnalysisClient>) -> Self {
        let transcripts = TranscriptStore::new(Arc::clone(&store));
        let sessions = SessionStore::new(store, transcripts.clone());
        Self {
            sessions: Mutex::new(sessions),
            transcripts,
            client,
            in_flight: Mutex::new(HashSet::new()),
            reports: Mutex::new(HashMap::new()),
        }
    }

    /// Load persisted sessions. Must be called once before anything else.
    pub fn initialize(&self) -> Result<(), ChatError> {
        let mut sessions = lock(&self.sessions, "session")?;
        sessions.initialize()?;
        info!(
            sessions = sessions.sessions().len(),
            active = ?sessions.active_id(),
            "Controller initialized"
        );
        Ok(())
    }

    // =========================================================================
    // Sessions
    // =========================================================================

    pub fn sessions(&self) -> Result<Vec<Session>, ChatError> {
        Ok(lock(&self.sessions, "session")?.sessions().to_vec())
    }

    pub fn active_session_id(&self) -> Result<Option<String>, ChatError> {
        Ok(lock(&self.sessions, "session")?
            .active_id()
            .map(str::to_string))
    }

    /// Create a session, make it active, and return its id.
    pub fn create_session(&self) -> Result<String, ChatError> {
        Ok(lock(&self.sessions, "session")?.create()?)
    }

    pub fn rename_session(&self, session_id: &str, name: &str) -> Result<bool, ChatError> {
        Ok(lock(&self.sessions, "session")?.rename(session_id, name)?)
    }

    /// Delete a session together with its transcript and report.
    pub fn delete_session(&self, session_id: &str) -> Result<bool, ChatError> {
        let mut sessions = lock(&self.sessions, "session")?;
        let deleted = sessions.delete(session_id)?;
        if deleted {
            lock(&self.reports, "report")?.remove(session_id);
        }
        Ok(deleted)
    }

    pub fn select_session(&self, session_id: &str) -> Result<bool, ChatError> {
        Ok(lock(&self.sessions, "session")?.set_active(session_id)?)
    }

    /// Transcript of a session, welcome message first.
    pub fn history(&self, session_id: &str) -> Result<Vec<Message>, ChatError> {
        self.ensure_session(session_id)?;
        Ok(self.transcripts.load(session_id)?)
    }

    pub fn is_sending(&self, session_id: &str) -> bool {
        self.in_flight
            .lock()
            .map(|set| set.contains(session_id))
            .unwrap_or(false)
    }

    fn ensure_session(&self, session_id: &str) -> Result<(), ChatError> {
        if lock(&self.sessions, "session")?.contains(session_id) {
            Ok(())
        } else {
            Err(ChatError::SessionNotFound(session_id.to_string()))
        }
    }

    fn active_or_err(&self) -> Result<String, ChatError> {
        self.active_session_id()?
            .ok_or_else(|| ChatError::SessionNotFound("<none active>".to_string()))
    }

    // =========================================================================
    // Send pipeline
    // =========================================================================

    /// Send user input to the analysis service on behalf of `session_id`.
    ///
    /// Appends the trimmed user message, performs one request, then appends
    /// and returns the rendered system reply. Transport failures become the
    /// fixed error message rather than an `Err`.
    pub async fn send(&self, session_id: &str, input: &str) -> Result<Message, ChatError> {
        let text = input.trim();
        if text.is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        self.ensure_session(session_id)?;

        let _guard = InFlightGuard::acquire(&self.in_flight, session_id)?;
        self.transcripts.append(session_id, Message::user(text))?;

        let request = ChatRequest::chat(session_id, text);
        let (reply, report) = match self.client.run(&request).await {
            Ok(body) => {
                let outcome = interpret_body(&body);
                info!(session_id = %session_id, outcome = outcome.kind(), "Analysis reply received");
                let reply = render(&outcome);
                let report = match outcome {
                    Outcome::ReportComplete { payload } => Some(payload),
                    _ => None,
                };
                (reply, report)
            }
            Err(e) => {
                warn!(session_id = %session_id, error = %e, "Analysis request failed");
                (transport_error(), None)
            }
        };

        // Held until the reply is stored so a concurrent delete cannot
        // interleave with the append.
        let sessions = lock(&self.sessions, "session")?;
        if !sessions.contains(session_id) {
            debug!(session_id = %session_id, "Dropping reply for deleted session");
            return Ok(reply);
        }

        self.transcripts.append(session_id, reply.clone())?;
        if let Some(payload) = report {
            lock(&self.reports, "report")?.insert(session_id.to_string(), payload);
        }
        drop(sessions);
        Ok(reply)
    }

    /// [`AnalystController::send`] on the active session.
    pub async fn send_active(&self, input: &str) -> Result<Message, ChatError> {
        let session_id = self.active_or_err()?;
        self.send(&session_id, input).await
    }

    /// Send a quick-reply or feedback token.
    pub async fn quick_reply(
        &self,
        session_id: &str,
        reply: QuickReply,
    ) -> Result<Message, ChatError> {
        self.send(session_id, reply.token()).await
    }

    // =========================================================================
    // Reports
    // =========================================================================

    /// The most recent report payload received in a session.
    pub fn report(&self, session_id: &str) -> Result<Option<Value>, ChatError> {
        Ok(lock(&self.reports, "report")?.get(session_id).cloned())
    }

    pub fn has_report(&self, session_id: &str) -> bool {
        self.reports
            .lock()
            .map(|reports| reports.contains_key(session_id))
            .unwrap_or(false)
    }

    /// Render the session's report. The stored report is left untouched.
    pub async fn export(
        &self,
        session_id: &str,
        format: ExportFormat,
    ) -> Result<ExportedFile, ChatError> {
        let report = self.report(session_id)?;
        Ok(export_async(report, format).await?)
    }

    /// Render the session's report and write it under `dir`.
    pub async fn export_to(
        &self,
        session_id: &str,
        format: ExportFormat,
        dir: &Path,
    ) -> Result<PathBuf, ChatError> {
        let file = self.export(session_id, format).await?;
        Ok(write_export(&file, dir)?)
    }
}
