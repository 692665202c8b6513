//! Error types for the sync layer.

use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur in sync operations.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The remote store could not be reached.
    #[error("network error: {0}")]
    Network(String),

    /// The remote store answered with a non-success status.
    #[error("remote store returned {status}: {message}")]
    Remote { status: u16, message: String },

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Wire type decoding error.
    #[error(transparent)]
    Types(#[from] roster_types::Error),

    /// Fallback cache error.
    #[error("cache error: {0}")]
    Cache(String),

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Channel closed.
    #[error("channel closed")]
    ChannelClosed,
}
