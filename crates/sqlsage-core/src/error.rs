//! Error types for sqlsage

use thiserror::Error;

/// The query text has no recognizable SELECT structure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Malformed query: {reason}")]
pub struct MalformedQueryError {
    pub reason: String,
}

impl MalformedQueryError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// No schema table could be inferred from a natural-language intent.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unsupported intent: no table in the schema matches \"{intent}\"")]
pub struct UnsupportedIntentError {
    pub intent: String,
}

impl UnsupportedIntentError {
    pub fn new(intent: impl Into<String>) -> Self {
        Self {
            intent: intent.into(),
        }
    }
}

/// Core error type for sqlsage operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AssistError {
    #[error(transparent)]
    MalformedQuery(#[from] MalformedQueryError),

    #[error(transparent)]
    UnsupportedIntent(#[from] UnsupportedIntentError),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Result type alias for sqlsage operations
pub type Result<T> = std::result::Result<T, AssistError>;
