//! Reply envelope interpretation.
//!
//! The analysis service wraps its structured answer as a string deep inside
//! a response envelope. [`interpret`] digs it out, classifies it, and never
//! fails: a malformed envelope degrades to [`Outcome::RawFallback`] and a
//! malformed payload to [`Outcome::Unparseable`].

use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

/// Leading tag token the upstream formatter sometimes prepends.
static JSON_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^json\s*").expect("Invalid tag regex"));

const STATUS_CLARIFICATION: &str = "clarification_needed";
const STATUS_COMPLETE: &str = "complete";

/// Classification of one service reply.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// A structured reply with no recognised status, pretty-printed.
    PlainReply { text: String },
    /// The analyst needs more information.
    ClarificationNeeded {
        question: Option<String>,
        suggested_value: Option<String>,
    },
    /// The analysis finished; `payload` is the `document_payload` value.
    ReportComplete { payload: Value },
    /// The envelope lacked the expected text field.
    RawFallback { raw_json: String },
    /// The embedded text was not JSON.
    Unparseable { raw_text: String },
}

impl Outcome {
    pub fn kind(&self) -> &'static str {
        match self {
            Outcome::PlainReply { .. } => "plain_reply",
            Outcome::ClarificationNeeded { .. } => "clarification_needed",
            Outcome::ReportComplete { .. } => "report_complete",
            Outcome::RawFallback { .. } => "raw_fallback",
            Outcome::Unparseable { .. } => "unparseable",
        }
    }
}

/// Interpret a raw HTTP body. Bodies that are not JSON are treated as a
/// JSON string value and therefore fall back to [`Outcome::RawFallback`].
pub fn interpret_body(body: &str) -> Outcome {
    match serde_json::from_str::<Value>(body) {
        Ok(value) => interpret(&value),
        Err(_) => interpret(&Value::String(body.to_string())),
    }
}

/// Interpret a decoded response envelope.
pub fn interpret(envelope: &Value) -> Outcome {
    let Some(text) = embedded_text(envelope) else {
        return Outcome::RawFallback {
            raw_json: pretty(envelope),
        };
    };

    let cleaned = JSON_TAG.replace(text.trim_start(), "");
    let parsed: Value = match serde_json::from_str(cleaned.trim()) {
        Ok(v) => v,
        Err(_) => {
            return Outcome::Unparseable {
                raw_text: text.to_string(),
            }
        }
    };

    match parsed.get("status").and_then(Value::as_str) {
        Some(STATUS_CLARIFICATION) => Outcome::ClarificationNeeded {
            question: optional_text(parsed.get("clarification_question")),
            suggested_value: optional_text(parsed.get("suggested_value")),
        },
        Some(STATUS_COMPLETE) => match parsed.get("document_payload") {
            Some(payload) if !payload.is_null() => Outcome::ReportComplete {
                payload: payload.clone(),
            },
            _ => Outcome::PlainReply {
                text: pretty(&parsed),
            },
        },
        _ => Outcome::PlainReply {
            text: pretty(&parsed),
        },
    }
}

/// `outputs[0].outputs[0].results.message.text`, if present and non-empty.
/// Whitespace-only text counts as present.
fn embedded_text(envelope: &Value) -> Option<&str> {
    envelope
        .get("outputs")?
        .get(0)?
        .get("outputs")?
        .get(0)?
        .get("results")?
        .get("message")?
        .get("text")?
        .as_str()
        .filter(|s| !s.is_empty())
}

/// Empty, null and missing values are absent; other scalars are stringified.
fn optional_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}
