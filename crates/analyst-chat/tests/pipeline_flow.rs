//! End-to-end tests for the analyst send pipeline.
//!
//! Each test drives an `AnalystController` over a real SQLite store with a
//! scripted analysis client standing in for the remote service.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::Notify;

use analyst_chat::{
    AnalysisClient, AnalystController, ChatError, ChatRequest, QuickReply, REPORT_READY_TEXT,
    TRANSPORT_ERROR_TEXT,
};
use analyst_core::types::{OutcomeTag, Sender};
use analyst_report::{ExportFormat, ReportError};
use analyst_storage::{Database, KeyValueStore, WELCOME_TEXT};

// =============================================================================
// Helpers
// =============================================================================

/// Replays canned responses in order and records every request.
#[derive(Default)]
struct ScriptedClient {
    replies: Mutex<VecDeque<Result<String, ChatError>>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedClient {
    fn with(replies: Vec<Result<String, ChatError>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl AnalysisClient for ScriptedClient {
    async fn run(&self, request: &ChatRequest) -> Result<String, ChatError> {
        self.requests.lock().unwrap().push(request.clone());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ChatError::Transport("script exhausted".to_string())))
    }
}

/// Holds every request until released.
struct GatedClient {
    release: Notify,
    calls: Mutex<usize>,
    body: String,
}

#[async_trait]
impl AnalysisClient for GatedClient {
    async fn run(&self, _request: &ChatRequest) -> Result<String, ChatError> {
        *self.calls.lock().unwrap() += 1;
        self.release.notified().await;
        Ok(self.body.clone())
    }
}

/// Wrap an inner payload in the service's response envelope.
fn envelope(inner: serde_json::Value) -> String {
    json!({
        "outputs": [{
            "outputs": [{
                "results": {"message": {"text": format!("json {}", inner)}}
            }]
        }]
    })
    .to_string()
}

fn clarification(question: &str) -> String {
    envelope(json!({
        "status": "clarification_needed",
        "clarification_question": question
    }))
}

fn complete_report() -> String {
    envelope(json!({
        "status": "complete",
        "document_payload": {
            "System Impact Analysis Report": {
                "Summary": "Replace password login with SSO",
                "Functional Impact": {
                    "Affected Modules": "Auth, Session",
                    "Rollback": ""
                }
            }
        }
    }))
}

fn make_controller(
    store: Arc<dyn KeyValueStore>,
    client: Arc<dyn AnalysisClient>,
) -> (Arc<AnalystController>, String) {
    let ctrl = AnalystController::new(store, client);
    ctrl.initialize().unwrap();
    let sid = ctrl.active_session_id().unwrap().unwrap();
    (Arc::new(ctrl), sid)
}

fn in_memory() -> Arc<dyn KeyValueStore> {
    Arc::new(Database::in_memory().unwrap())
}

// =============================================================================
// Clarification round trip
// =============================================================================

#[tokio::test]
async fn test_clarification_then_yes_round_trip() {
    let client = ScriptedClient::with(vec![
        Ok(clarification("Which auth provider?")),
        Ok(clarification("Should existing sessions be revoked?")),
    ]);
    let (ctrl, sid) = make_controller(in_memory(), client.clone());

    let first = ctrl
        .send(&sid, "I want to change the login flow")
        .await
        .unwrap();
    assert!(first.wants_quick_replies());
    assert!(first.text.contains("**Q:** Which auth provider?"));
    assert!(first.text.contains("💡 *Suggested:* N/A"));

    ctrl.quick_reply(&sid, QuickReply::Yes).await.unwrap();

    let requests = client.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].input_value, "I want to change the login flow");
    assert_eq!(requests[1].input_value, "✅");
    assert!(requests.iter().all(|r| r.session_id == sid
        && r.input_type == "chat"
        && r.output_type == "chat"));

    let history = ctrl.history(&sid).unwrap();
    let senders: Vec<Sender> = history.iter().map(|m| m.sender).collect();
    assert_eq!(
        senders,
        vec![Sender::System, Sender::User, Sender::System, Sender::User, Sender::System]
    );
    assert_eq!(history[3].text, "✅");
}

// =============================================================================
// Report and export
// =============================================================================

#[tokio::test]
async fn test_report_then_export_all_formats() {
    let client = ScriptedClient::with(vec![Ok(complete_report())]);
    let (ctrl, sid) = make_controller(in_memory(), client);

    let reply = ctrl.send(&sid, "Proceed").await.unwrap();
    assert_eq!(reply.text, REPORT_READY_TEXT);
    assert_eq!(reply.outcome, Some(OutcomeTag::Report));

    let text = ctrl.export(&sid, ExportFormat::Text).await.unwrap();
    let text = String::from_utf8(text.bytes).unwrap();
    assert!(text.contains("Affected Modules: Auth, Session"));
    assert!(text.contains("Rollback: N/A"));

    let html = ctrl.export(&sid, ExportFormat::Html).await.unwrap();
    assert_eq!(html.file_name, "System_Impact_Analysis_Report.html");

    let dir = tempfile::tempdir().unwrap();
    let path = ctrl
        .export_to(&sid, ExportFormat::Docx, dir.path())
        .await
        .unwrap();
    let bytes = std::fs::read(path).unwrap();
    assert_eq!(&bytes[..2], b"PK");

    // Exporting does not consume the report.
    assert!(ctrl.has_report(&sid));
}

#[tokio::test]
async fn test_export_without_report_writes_nothing() {
    let (ctrl, sid) = make_controller(in_memory(), ScriptedClient::with(vec![]));
    let dir = tempfile::tempdir().unwrap();

    for format in ExportFormat::ALL {
        let err = ctrl.export_to(&sid, format, dir.path()).await.unwrap_err();
        assert!(matches!(err, ChatError::Report(ReportError::NoReportData)));
    }
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

// =============================================================================
// Failure paths
// =============================================================================

#[tokio::test]
async fn test_transport_error_is_inline_message() {
    let client = ScriptedClient::with(vec![
        Err(ChatError::Transport("503 Service Unavailable".to_string())),
        Ok(clarification("Retry worked?")),
    ]);
    let (ctrl, sid) = make_controller(in_memory(), client);

    let reply = ctrl.send(&sid, "hello").await.unwrap();
    assert_eq!(reply.text, TRANSPORT_ERROR_TEXT);
    assert_eq!(reply.outcome, Some(OutcomeTag::Error));

    let reply = ctrl.send(&sid, "hello again").await.unwrap();
    assert!(reply.wants_quick_replies());
}

#[tokio::test]
async fn test_malformed_envelopes_degrade() {
    let client = ScriptedClient::with(vec![
        Ok(r#"{"error":"flow not found"}"#.to_string()),
        Ok("upstream proxy error".to_string()),
        Ok(json!({"outputs": [{"outputs": [{"results": {"message": {"text": "Not JSON at all"}}}]}]})
            .to_string()),
    ]);
    let (ctrl, sid) = make_controller(in_memory(), client);

    let reply = ctrl.send(&sid, "a").await.unwrap();
    assert!(reply.text.starts_with("📦 Raw Fallback: "));
    assert!(reply.text.contains("flow not found"));

    let reply = ctrl.send(&sid, "b").await.unwrap();
    assert_eq!(reply.text, "📦 Raw Fallback: \"upstream proxy error\"");

    let reply = ctrl.send(&sid, "c").await.unwrap();
    assert_eq!(reply.text, "Not JSON at all");
    assert!(!reply.wants_quick_replies());
}

// =============================================================================
// Concurrency
// =============================================================================

#[tokio::test]
async fn test_single_send_in_flight_per_session() {
    let client = Arc::new(GatedClient {
        release: Notify::new(),
        calls: Mutex::new(0),
        body: clarification("Which region?"),
    });
    let (ctrl, sid) = make_controller(in_memory(), client.clone());
    let other = ctrl.create_session().unwrap();

    let pending = {
        let ctrl = Arc::clone(&ctrl);
        let sid = sid.clone();
        tokio::spawn(async move { ctrl.send(&sid, "first").await })
    };

    tokio::time::timeout(Duration::from_secs(5), async {
        while !ctrl.is_sending(&sid) {
            tokio::task::yield_now().await;
        }
    })
    .await
    .unwrap();

    let second = ctrl.send(&sid, "second").await;
    assert!(matches!(second, Err(ChatError::SendInFlight(_))));
    assert_eq!(*client.calls.lock().unwrap(), 1);

    // Transcript holds the welcome and the first user message only.
    let history = ctrl.history(&sid).unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[1].text, "first");

    // Other sessions are independent.
    assert!(!ctrl.is_sending(&other));

    client.release.notify_one();
    let reply = pending.await.unwrap().unwrap();
    assert!(reply.wants_quick_replies());
    assert!(!ctrl.is_sending(&sid));
}

#[tokio::test]
async fn test_reply_lands_in_issuing_session_after_switch() {
    let client = Arc::new(GatedClient {
        release: Notify::new(),
        calls: Mutex::new(0),
        body: clarification("Which team owns billing?"),
    });
    let (ctrl, sid) = make_controller(in_memory(), client.clone());

    let pending = {
        let ctrl = Arc::clone(&ctrl);
        let sid = sid.clone();
        tokio::spawn(async move { ctrl.send(&sid, "billing change").await })
    };
    while !ctrl.is_sending(&sid) {
        tokio::task::yield_now().await;
    }

    let other = ctrl.create_session().unwrap();
    assert_eq!(ctrl.active_session_id().unwrap().as_deref(), Some(other.as_str()));

    client.release.notify_one();
    pending.await.unwrap().unwrap();

    assert_eq!(ctrl.history(&sid).unwrap().len(), 3);
    assert_eq!(ctrl.history(&other).unwrap().len(), 1);
}

#[tokio::test]
async fn test_reply_for_session_deleted_mid_request_is_dropped() {
    let client = Arc::new(GatedClient {
        release: Notify::new(),
        calls: Mutex::new(0),
        body: complete_report(),
    });
    let store = in_memory();
    let (ctrl, doomed) = make_controller(store.clone(), client.clone());
    let survivor = ctrl.create_session().unwrap();
    ctrl.rename_session(&survivor, "Keep me").unwrap();

    let pending = {
        let ctrl = Arc::clone(&ctrl);
        let doomed = doomed.clone();
        tokio::spawn(async move { ctrl.send(&doomed, "generate the report").await })
    };
    while !ctrl.is_sending(&doomed) {
        tokio::task::yield_now().await;
    }

    assert!(ctrl.delete_session(&doomed).unwrap());
    client.release.notify_one();

    let reply = pending.await.unwrap().unwrap();
    assert_eq!(reply.outcome, Some(OutcomeTag::Report));

    assert!(store.get(&format!("messages-{}", doomed)).unwrap().is_none());
    assert!(!ctrl.has_report(&doomed));

    let sessions = ctrl.sessions().unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].id, survivor);
    assert_eq!(sessions[0].name, "Keep me");
    assert_eq!(ctrl.history(&survivor).unwrap().len(), 1);
    assert!(!ctrl.has_report(&survivor));
}

// =============================================================================
// Persistence
// =============================================================================

#[tokio::test]
async fn test_transcripts_survive_restart_without_welcome_duplication() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("analyst.db");

    let sid = {
        let store: Arc<dyn KeyValueStore> = Arc::new(Database::new(&db_path).unwrap());
        let client = ScriptedClient::with(vec![Ok(clarification("Scope?"))]);
        let (ctrl, sid) = make_controller(store, client);
        ctrl.rename_session(&sid, "Login revamp").unwrap();
        ctrl.send(&sid, "change login").await.unwrap();
        sid
    };

    let store: Arc<dyn KeyValueStore> = Arc::new(Database::new(&db_path).unwrap());
    let (ctrl, active) = make_controller(store.clone(), ScriptedClient::with(vec![]));
    assert_eq!(active, sid);
    assert_eq!(ctrl.sessions().unwrap()[0].name, "Login revamp");

    let history = ctrl.history(&sid).unwrap();
    assert_eq!(history.len(), 3);
    assert_eq!(history[0].text, WELCOME_TEXT);
    assert_eq!(history[2].outcome, Some(OutcomeTag::Clarification));

    let raw = store.get(&format!("messages-{}", sid)).unwrap().unwrap();
    assert!(!raw.contains(WELCOME_TEXT));

    // Reports are not persisted across restarts.
    assert!(!ctrl.has_report(&sid));
}
