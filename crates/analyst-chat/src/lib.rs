//! Conversation with the System Impact Analyst service.
//!
//! Sends user input to the analysis endpoint, interprets the reply envelope
//! into a tagged outcome, renders transcript messages, and keeps per-session
//! reports available for export.

pub mod client;
pub mod error;
pub mod interpreter;
pub mod orchestrator;
pub mod render;

pub use client::{AnalysisClient, ChatRequest, HttpAnalysisClient};
pub use error::ChatError;
pub use interpreter::{interpret, interpret_body, Outcome};
pub use orchestrator::AnalystController;
pub use render::{render, transport_error, QuickReply, REPORT_READY_TEXT, TRANSPORT_ERROR_TEXT};
