use serde::{Deserialize, Serialize};

/// Display name given to newly created sessions.
pub const DEFAULT_SESSION_NAME: &str = "New Session";

// =============================================================================
// Session
// =============================================================================

/// An independently named, independently persisted conversation thread.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Opaque, time-derived identifier.
    pub id: String,
    /// User-editable display name.
    #[serde(default = "default_session_name")]
    pub name: String,
}

fn default_session_name() -> String {
    DEFAULT_SESSION_NAME.to_string()
}

impl Session {
    /// Create a session with the default name.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: DEFAULT_SESSION_NAME.to_string(),
        }
    }
}

// =============================================================================
// Messages
// =============================================================================

/// Who produced a transcript message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    User,
    System,
}

/// Classification a system message was rendered from.
///
/// Carried on the message so the render layer never has to guess from text.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeTag {
    /// The analyst asked a clarifying question.
    Clarification,
    /// The analysis finished and a report is available.
    Report,
    /// A structured reply without a recognised status.
    Reply,
    /// The envelope shape was unrecognised or the payload was not JSON.
    Fallback,
    /// The request never completed.
    Error,
}

/// One entry in a session transcript. Text is markdown-bearing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub sender: Sender,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<OutcomeTag>,
}

impl Message {
    /// A message typed by the user.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::User,
            text: text.into(),
            outcome: None,
        }
    }

    /// An untagged system message.
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::System,
            text: text.into(),
            outcome: None,
        }
    }

    /// A system message rendered from an interpreted outcome.
    pub fn system_with(text: impl Into<String>, outcome: OutcomeTag) -> Self {
        Self {
            sender: Sender::System,
            text: text.into(),
            outcome: Some(outcome),
        }
    }

    /// Whether the UI should offer yes / no / explain-more quick replies.
    pub fn wants_quick_replies(&self) -> bool {
        self.sender == Sender::System && self.outcome == Some(OutcomeTag::Clarification)
    }
}
