//! Error types for the items fetcher

use shared_types::PeerId;
use thiserror::Error;

/// Result type alias for fetcher operations
pub type Result<T> = std::result::Result<T, FetcherError>;

/// Fetcher failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetcherError {
    /// The notification queue is full
    #[error("fetcher queue full")]
    QueueFull,

    /// The fetcher loop has stopped
    #[error("fetcher stopped")]
    Stopped,

    /// `run` was called twice
    #[error("fetcher already running")]
    AlreadyRunning,

    /// A request could not be sent
    #[error("request to {peer} failed: {reason}")]
    Request {
        /// Peer asked
        peer: PeerId,
        /// Cause
        reason: String,
    },
}

impl FetcherError {
    /// Whether retrying later may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, FetcherError::QueueFull | FetcherError::Request { .. })
    }

    /// Label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            FetcherError::QueueFull => "queue_full",
            FetcherError::Stopped => "stopped",
            FetcherError::AlreadyRunning => "already_running",
            FetcherError::Request { .. } => "request",
        }
    }
}
