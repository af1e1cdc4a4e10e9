use thiserror::Error;

/// Top-level error type for the analyst client.
///
/// Subsystem crates define their own error types and implement
/// `From<AnalystError>` so that `?` works across crate boundaries.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AnalystError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Session store used before initialization")]
    NotInitialized,

    #[error("Session store already initialized")]
    AlreadyInitialized,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for AnalystError {
    fn from(err: toml::de::Error) -> Self {
        AnalystError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for AnalystError {
    fn from(err: toml::ser::Error) -> Self {
        AnalystError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for AnalystError {
    fn from(err: serde_json::Error) -> Self {
        AnalystError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for analyst operations.
pub type Result<T> = std::result::Result<T, AnalystError>;
