//! Line-oriented command parsing for the interactive session.

use analyst_chat::QuickReply;
use analyst_core::types::{Message, Sender, Session};

pub const HELP_TEXT: &str = "\
Commands:
  /sessions               list sessions (* marks the active one)
  /new                    start a new session
  /switch <n|id>          switch to a session
  /rename <n|id> <name>   rename a session
  /delete <n|id>          delete a session and its transcript
  /history                show the active transcript
  /yes /no /more          answer a clarification
  /like /dislike          rate the last reply
  /export [txt|html|docx] export the current report
  /help                   show this help
  /quit                   exit
Anything else is sent to the analyst.";

/// A parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Send(String),
    Sessions,
    New,
    Switch(String),
    Rename(String, String),
    Delete(String),
    History,
    Quick(QuickReply),
    Export(Option<String>),
    Help,
    Quit,
    Empty,
    Invalid(String),
}

pub fn parse_command(line: &str) -> Command {
    let line = line.trim();
    if line.is_empty() {
        return Command::Empty;
    }
    let Some(rest) = line.strip_prefix('/') else {
        return Command::Send(line.to_string());
    };

    let (name, args) = match rest.split_once(char::is_whitespace) {
        Some((name, args)) => (name, args.trim()),
        None => (rest, ""),
    };

    match (name.to_ascii_lowercase().as_str(), args) {
        ("sessions" | "ls", _) => Command::Sessions,
        ("new", _) => Command::New,
        ("switch", target) if !target.is_empty() => Command::Switch(target.to_string()),
        ("rename", args) => match args.split_once(char::is_whitespace) {
            Some((target, name)) if !name.trim().is_empty() => {
                Command::Rename(target.to_string(), name.trim().to_string())
            }
            _ => Command::Invalid("usage: /rename <n|id> <name>".to_string()),
        },
        ("delete", target) if !target.is_empty() => Command::Delete(target.to_string()),
        ("history", _) => Command::History,
        ("yes", _) => Command::Quick(QuickReply::Yes),
        ("no", _) => Command::Quick(QuickReply::No),
        ("more", _) => Command::Quick(QuickReply::ExplainMore),
        ("like", _) => Command::Quick(QuickReply::Like),
        ("dislike", _) => Command::Quick(QuickReply::Dislike),
        ("export", "") => Command::Export(None),
        ("export", format) => Command::Export(Some(format.to_string())),
        ("help" | "?", _) => Command::Help,
        ("quit" | "exit" | "q", _) => Command::Quit,
        ("switch" | "delete", _) => Command::Invalid(format!("usage: /{} <n|id>", name)),
        (other, _) => Command::Invalid(format!("unknown command: /{} (try /help)", other)),
    }
}

/// Resolve a 1-based list position or a literal session id.
pub fn resolve_session<'a>(sessions: &'a [Session], target: &str) -> Option<&'a Session> {
    if let Ok(n) = target.parse::<usize>() {
        return n.checked_sub(1).and_then(|i| sessions.get(i));
    }
    sessions.iter().find(|s| s.id == target)
}

pub fn format_sessions(sessions: &[Session], active: Option<&str>) -> String {
    sessions
        .iter()
        .enumerate()
        .map(|(i, s)| {
            let marker = if Some(s.id.as_str()) == active { '*' } else { ' ' };
            format!("{} {:>2}. {}  ({})", marker, i + 1, s.name, s.id)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn format_message(message: &Message) -> String {
    match message.sender {
        Sender::User => format!("you> {}", message.text),
        Sender::System => format!("analyst> {}", message.text),
    }
}

/// Hint printed under messages that offer quick replies.
pub fn quick_reply_hint(message: &Message) -> Option<&'static str> {
    message
        .wants_quick_replies()
        .then_some("  [/yes ✅] [/no ❌] [/more 🔍]")
}
