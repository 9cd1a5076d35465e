use thiserror::Error;

use crate::domain::MessageId;

/// Error type returned by message handlers.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Storage-layer failures surfaced by a `QueueStore`.
///
/// Stores never retry on their own; callers decide.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("queue store unavailable: {0}")]
    Unavailable(String),

    #[error("queue store operation failed: {0}")]
    Operation(String),
}

#[derive(Debug, Error)]
pub enum PollqError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("handler failed for message {message_id}: {source}")]
    Handler {
        message_id: MessageId,
        #[source]
        source: HandlerError,
    },

    #[error("background task `{task}` failed: {reason}")]
    Task { task: String, reason: String },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;
pub type Result<T> = std::result::Result<T, PollqError>;
