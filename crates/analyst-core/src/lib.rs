//! Shared configuration, error and data types for the analyst client.

pub mod config;
pub mod error;
pub mod types;

pub use config::AnalystConfig;
pub use error::{AnalystError, Result};
pub use types::*;
