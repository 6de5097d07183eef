//! Domain-level error taxonomy for tally.

/// Errors produced by webhook payload classification.
///
/// An event that raises one of these is dropped before any other component
/// runs; no notification is sent for malformed ingress input.
#[derive(Debug, thiserror::Error)]
pub enum EventError {
    #[error("payload is neither a push nor a check_suite event")]
    UnrecognizedShape,

    #[error("{kind} event missing required field: {field}")]
    MissingField {
        kind: &'static str,
        field: &'static str,
    },

    #[error("push ref {0:?} does not name a branch")]
    BadRef(String),
}

/// Tally pipeline errors.
#[derive(Debug, thiserror::Error)]
pub enum TallyError {
    #[error("event rejected: {0}")]
    Event(#[from] EventError),

    #[error("repository setup failed: {0}")]
    Setup(String),

    #[error("git error: {0}")]
    Git(String),

    #[error("tool {tool} failed: {reason}")]
    Tool { tool: String, reason: String },

    #[error("mail delivery failed: {0}")]
    Mail(String),

    #[error("configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for tally domain operations.
pub type Result<T> = std::result::Result<T, TallyError>;
