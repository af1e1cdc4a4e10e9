//! Outcome to transcript message rendering.

use analyst_core::types::{Message, OutcomeTag};

use crate::interpreter::Outcome;

/// Shown when the analysis service could not be reached.
pub const TRANSPORT_ERROR_TEXT: &str = "❌ Error connecting to analyzer.";

/// Shown when a report becomes available.
pub const REPORT_READY_TEXT: &str = "✅ System Impact Report is ready. Use /export to download.";

const NOT_AVAILABLE: &str = "N/A";

/// Fixed inputs sent on behalf of the user by quick-reply and feedback actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QuickReply {
    Yes,
    No,
    ExplainMore,
    Like,
    Dislike,
}

impl QuickReply {
    pub fn token(&self) -> &'static str {
        match self {
            QuickReply::Yes => "✅",
            QuickReply::No => "❌",
            QuickReply::ExplainMore => "🔍 Explain more",
            QuickReply::Like => "👍",
            QuickReply::Dislike => "👎",
        }
    }

    /// Replies offered under a clarification message.
    pub fn clarification_choices() -> [QuickReply; 3] {
        [QuickReply::Yes, QuickReply::No, QuickReply::ExplainMore]
    }
}

/// Render an interpreted outcome as a tagged system message.
pub fn render(outcome: &Outcome) -> Message {
    match outcome {
        Outcome::ClarificationNeeded {
            question,
            suggested_value,
        } => Message::system_with(
            format!(
                "🟡 **Clarification Needed**\n\n**Q:** {}\n\n💡 *Suggested:* {}\n\nReply ✅ to accept, ❌ to reject, or 🔍 to ask for more detail.",
                question.as_deref().unwrap_or(NOT_AVAILABLE),
                suggested_value.as_deref().unwrap_or(NOT_AVAILABLE),
            ),
            OutcomeTag::Clarification,
        ),
        Outcome::ReportComplete { .. } => {
            Message::system_with(REPORT_READY_TEXT, OutcomeTag::Report)
        }
        Outcome::PlainReply { text } => {
            Message::system_with(format!("📦 {}", text), OutcomeTag::Reply)
        }
        Outcome::RawFallback { raw_json } => Message::system_with(
            format!("📦 Raw Fallback: {}", raw_json),
            OutcomeTag::Fallback,
        ),
        Outcome::Unparseable { raw_text } => {
            Message::system_with(raw_text.clone(), OutcomeTag::Fallback)
        }
    }
}

/// The fixed message appended when a request fails in transport.
pub fn transport_error() -> Message {
    Message::system_with(TRANSPORT_ERROR_TEXT, OutcomeTag::Error)
}
