//! Per-session message log.
//!
//! Transcripts are stored as a JSON array under `messages-<session id>`.
//! Every load is prefixed with a freshly synthesized welcome message, which
//! is never written back.

use std::sync::Arc;

use analyst_core::error::AnalystError;
use analyst_core::types::{Message, Sender};
use tracing::warn;

use crate::kv::KeyValueStore;

/// Greeting shown at the top of every transcript.
pub const WELCOME_TEXT: &str = "👋 Hello! I’m your **System Impact Analyst Assistant**.

🧠 I help you analyze the impact of system changes across:
- Functional Logic
- Data
- APIs
- UI/UX
- Compliance
- Access Control
- Performance

📘 You can:
- Provide a **detailed summary**
- Or just describe **what you want to change** in your system

🔍 I’ll:
- Ask clarifying questions if needed
- Suggest responses you can accept, modify, or expand
- Use various tools to assess the change

📄 At the end, you can **generate a professional System Impact Report**.

✍️ **Please provide your change request below to begin!**";

/// Storage key for a session's transcript.
pub fn transcript_key(session_id: &str) -> String {
    format!("messages-{}", session_id)
}

/// The synthesized welcome message.
pub fn welcome_message() -> Message {
    Message::system(WELCOME_TEXT)
}

fn is_welcome(message: &Message) -> bool {
    message.sender == Sender::System && message.text == WELCOME_TEXT
}

/// Reads and writes session transcripts.
#[derive(Clone)]
pub struct TranscriptStore {
    store: Arc<dyn KeyValueStore>,
}

impl TranscriptStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Load a transcript for display: `[welcome] ++ persisted`.
    pub fn load(&self, session_id: &str) -> Result<Vec<Message>, AnalystError> {
        let mut messages = Vec::new();
        messages.push(welcome_message());
        messages.extend(self.load_persisted(session_id)?);
        Ok(messages)
    }

    /// Append a message and persist the result.
    ///
    /// Returns the updated in-memory sequence, welcome message included.
    pub fn append(&self, session_id: &str, message: Message) -> Result<Vec<Message>, AnalystError> {
        let mut messages = self.load(session_id)?;
        messages.push(message);
        self.persist(session_id, &messages)?;
        Ok(messages)
    }

    /// Write a transcript, dropping any welcome message first.
    pub fn persist(&self, session_id: &str, messages: &[Message]) -> Result<(), AnalystError> {
        let kept: Vec<&Message> = messages.iter().filter(|m| !is_welcome(m)).collect();
        let json = serde_json::to_string(&kept)?;
        self.store.set(&transcript_key(session_id), &json)
    }

    /// Delete a session's transcript entirely.
    pub fn purge(&self, session_id: &str) -> Result<(), AnalystError> {
        self.store.remove(&transcript_key(session_id))
    }

    fn load_persisted(&self, session_id: &str) -> Result<Vec<Message>, AnalystError> {
        let Some(raw) = self.store.get(&transcript_key(session_id))? else {
            return Ok(Vec::new());
        };
        match serde_json::from_str(&raw) {
            Ok(messages) => Ok(messages),
            Err(e) => {
                warn!(session_id, error = %e, "Stored transcript is corrupt; starting empty");
                Ok(Vec::new())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::MemoryStore;
    use analyst_core::types::OutcomeTag;

    fn store() -> (Arc<MemoryStore>, TranscriptStore) {
        let kv = Arc::new(MemoryStore::new());
        let transcripts = TranscriptStore::new(kv.clone());
        (kv, transcripts)
    }

    #[test]
    fn test_load_empty_session_is_only_welcome() {
        let (_, transcripts) = store();
        let messages = transcripts.load("s1").unwrap();
        assert_eq!(messages, vec![welcome_message()]);
    }

    #[test]
    fn test_load_prefixes_welcome_to_persisted() {
        let (kv, transcripts) = store();
        kv.set(
            "messages-s1",
            r#"[{"sender":"user","text":"hi"},{"sender":"system","text":"hello"}]"#,
        )
        .unwrap();

        let messages = transcripts.load("s1").unwrap();
        assert_eq!(
            messages,
            vec![welcome_message(), Message::user("hi"), Message::system("hello")]
        );
    }

    #[test]
    fn test_persist_of_loaded_state_writes_back_exactly_persisted() {
        let (kv, transcripts) = store();
        let persisted = r#"[{"sender":"user","text":"hi"},{"sender":"system","text":"hello"}]"#;
        kv.set("messages-s1", persisted).unwrap();

        for _ in 0..3 {
            let loaded = transcripts.load("s1").unwrap();
            transcripts.persist("s1", &loaded).unwrap();
        }

        assert_eq!(kv.get("messages-s1").unwrap().as_deref(), Some(persisted));
        assert_eq!(transcripts.load("s1").unwrap().len(), 3);
    }

    #[test]
    fn test_persist_filters_every_welcome_copy() {
        let (kv, transcripts) = store();
        let messages = vec![
            welcome_message(),
            Message::user("a"),
            welcome_message(),
        ];
        transcripts.persist("s1", &messages).unwrap();
        assert_eq!(
            kv.get("messages-s1").unwrap().as_deref(),
            Some(r#"[{"sender":"user","text":"a"}]"#)
        );
    }

    #[test]
    fn test_user_message_with_welcome_text_is_kept() {
        let (_, transcripts) = store();
        transcripts
            .append("s1", Message::user(WELCOME_TEXT))
            .unwrap();
        let loaded = transcripts.load("s1").unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[1].sender, Sender::User);
    }

    #[test]
    fn test_append_preserves_order_and_tags() {
        let (_, transcripts) = store();
        transcripts.append("s1", Message::user("first")).unwrap();
        let messages = transcripts
            .append(
                "s1",
                Message::system_with("question", OutcomeTag::Clarification),
            )
            .unwrap();

        assert_eq!(messages.len(), 3);
        assert_eq!(messages[1].text, "first");
        assert_eq!(messages[2].outcome, Some(OutcomeTag::Clarification));
        assert_eq!(transcripts.load("s1").unwrap(), messages);
    }

    #[test]
    fn test_sessions_are_isolated() {
        let (_, transcripts) = store();
        transcripts.append("s1", Message::user("one")).unwrap();
        transcripts.append("s2", Message::user("two")).unwrap();

        assert_eq!(transcripts.load("s1").unwrap()[1].text, "one");
        assert_eq!(transcripts.load("s2").unwrap()[1].text, "two");
    }

    #[test]
    fn test_purge_removes_entry() {
        let (kv, transcripts) = store();
        transcripts.append("s1", Message::user("one")).unwrap();
        transcripts.purge("s1").unwrap();
        assert_eq!(kv.get("messages-s1").unwrap(), None);
        assert_eq!(transcripts.load("s1").unwrap().len(), 1);
    }

    #[test]
    fn test_corrupt_transcript_loads_as_empty() {
        let (kv, transcripts) = store();
        kv.set("messages-s1", "not json").unwrap();
        assert_eq!(transcripts.load("s1").unwrap(), vec![welcome_message()]);
    }
}
