//! Analyst storage crate - durable key-value store, sessions and transcripts.
//!
//! Provides a SQLite-backed key-value store with migrations, an in-memory
//! store for tests, and the session and transcript stores built on top.

pub mod db;
pub mod kv;
pub mod migrations;
pub mod sessions;
pub mod transcript;

pub use db::Database;
pub use kv::{KeyValueStore, MemoryStore};
pub use sessions::{generate_session_id, SessionStore, SESSIONS_KEY};
pub use transcript::{transcript_key, welcome_message, TranscriptStore, WELCOME_TEXT};
