//! Error types for the relay.
//!
//! Rejections on the write path (validation, rate limiting) are raised before
//! any state is touched. Persistence failures never reach a caller: the flush
//! task logs them and drops the batch.

use thiserror::Error;

/// Result type alias for relay operations.
pub type Result<T> = std::result::Result<T, RelayError>;

/// Top-level error type for store operations.
#[derive(Error, Debug)]
pub enum RelayError {
    /// A write failed field validation
    #[error("Invalid message: {0}")]
    Validation(#[from] ValidationError),

    /// The request body or query string could not be decoded
    #[error("{0}")]
    Malformed(String),

    /// The client wrote again before its window elapsed
    #[error("Too many messages, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    /// Administrative delete of a position outside the buffer
    #[error("No message at index {index} (buffer holds {len})")]
    NotFound { index: usize, len: usize },

    /// Durable log failure surfaced at startup or on an explicit flush
    #[error("Durable log error: {0}")]
    Log(#[from] LogError),

    /// Invalid configuration value
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Reasons a write is rejected before touching the buffer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("text is empty")]
    EmptyText,

    #[error("text is too long ({actual} characters, max {max})")]
    TextTooLong { max: usize, actual: usize },

    #[error("channel is missing")]
    MissingChannel,

    #[error("channel is too long ({actual} characters, max {max})")]
    ChannelTooLong { max: usize, actual: usize },
}

/// Durable log errors.
#[derive(Error, Debug)]
pub enum LogError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}
