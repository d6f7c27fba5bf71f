//! Error types for genie-chat.

use std::time::Duration;

/// Top-level error type for the crate.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Genie API error: {0}")]
    Genie(#[from] GenieError),

    #[error("History error: {0}")]
    History(#[from] HistoryError),

    #[error("Access error: {0}")]
    Access(#[from] AccessError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures from the Genie service and the transport beneath it.
///
/// None of these are retried automatically; callers decide whether a retry
/// makes sense for the operation at hand.
#[derive(Debug, thiserror::Error)]
pub enum GenieError {
    /// The service answered with a non-2xx status.
    #[error("Genie API returned {status}: {body}")]
    Transport { status: u16, body: String },

    /// The request never produced an HTTP status (connect, DNS, TLS).
    #[error("Request failed: {0}")]
    Request(String),

    /// A poll exhausted its wall-clock budget. The message may still complete
    /// later, so polling again with the same identifiers is valid.
    #[error("Message {message_id} did not reach a terminal status within {elapsed:?}")]
    Timeout {
        message_id: String,
        elapsed: Duration,
    },

    /// A query-result payload was missing required structure.
    #[error("Malformed query result: {reason}")]
    MalformedResult { reason: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A follow-up or poll was attempted before any conversation was started.
    #[error("No active conversation; send an initial prompt first")]
    NoConversation,
}

/// History sink errors.
#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Access registry errors.
#[derive(Debug, thiserror::Error)]
pub enum AccessError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Access request not found: {0}")]
    RequestNotFound(uuid::Uuid),
}

/// Result type alias for the crate.
pub type Result<T> = std::result::Result<T, Error>;
