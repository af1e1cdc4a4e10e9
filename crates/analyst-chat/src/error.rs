//! Error types for the analyst conversation.

use analyst_core::error::AnalystError;
use analyst_report::ReportError;

/// Errors from the chat controller.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("message cannot be empty")]
    EmptyMessage,
    #[error("a request is already in flight for session {0}")]
    SendInFlight(String),
    #[error("session not found: {0}")]
    SessionNotFound(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("storage error: {0}")]
    Storage(String),
    #[error("report error: {0}")]
    Report(#[from] ReportError),
}

impl From<AnalystError> for ChatError {
    fn from(err: AnalystError) -> Self {
        ChatError::Storage(err.to_string())
    }
}

impl From<reqwest::Error> for ChatError {
    fn from(err: reqwest::Error) -> Self {
        ChatError::Transport(err.to_string())
    }
}
