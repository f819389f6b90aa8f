//! Error types for admission control.

use shared_types::Metric;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for semaphore operations
pub type Result<T> = std::result::Result<T, SemaphoreError>;

/// Errors returned by [`crate::DataSemaphore`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SemaphoreError {
    /// Granting the request would exceed the item ceiling.
    #[error("{name}: count exceeded: requested {requested}, processing {processing}, limit {limit}")]
    CountExceeded {
        /// Semaphore name
        name: String,
        /// Requested item count
        requested: u64,
        /// Items currently held
        processing: u64,
        /// Item ceiling
        limit: u64,
    },

    /// Granting the request would exceed the byte ceiling.
    #[error("{name}: size exceeded: requested {requested}, processing {processing}, limit {limit}")]
    SizeExceeded {
        /// Semaphore name
        name: String,
        /// Requested bytes
        requested: u64,
        /// Bytes currently held
        processing: u64,
        /// Byte ceiling
        limit: u64,
    },

    /// The request alone is larger than the ceilings and can never be granted.
    #[error("{name}: weight {weight} exceeds limit {limit}")]
    WeightOverLimit {
        /// Semaphore name
        name: String,
        /// Requested weight
        weight: Metric,
        /// Ceilings
        limit: Metric,
    },

    /// Waited for capacity longer than the allowed bound.
    #[error("{name}: timed out after {waited:?}")]
    Timeout {
        /// Semaphore name
        name: String,
        /// Time spent waiting
        waited: Duration,
    },

    /// More was released than is currently held.
    #[error("{name}: release of {released} exceeds processing {processing}")]
    ReleaseUnderflow {
        /// Semaphore name
        name: String,
        /// Released weight
        released: Metric,
        /// Weight currently held
        processing: Metric,
    },

    /// The semaphore was closed during shutdown.
    #[error("{name}: closed")]
    Closed {
        /// Semaphore name
        name: String,
    },
}

impl SemaphoreError {
    /// Whether retrying later may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            SemaphoreError::CountExceeded { .. }
                | SemaphoreError::SizeExceeded { .. }
                | SemaphoreError::Timeout { .. }
        )
    }

    /// Whether the error indicates an accounting bug in the caller.
    pub fn is_programming_error(&self) -> bool {
        matches!(self, SemaphoreError::ReleaseUnderflow { .. })
    }

    /// Short label for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            SemaphoreError::CountExceeded { .. } => "count_exceeded",
            SemaphoreError::SizeExceeded { .. } => "size_exceeded",
            SemaphoreError::WeightOverLimit { .. } => "weight_over_limit",
            SemaphoreError::Timeout { .. } => "timeout",
            SemaphoreError::ReleaseUnderflow { .. } => "release_underflow",
            SemaphoreError::Closed { .. } => "closed",
        }
    }
}
