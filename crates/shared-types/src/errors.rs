//! # Error Types
//!
//! Errors shared by the stream stores and transports of every subsystem.

use thiserror::Error;

/// Errors returned by stream stores.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Items were applied past the end of the stored range.
    #[error("gap before index {start}: next expected {next}")]
    Gap {
        /// Start of the rejected range.
        start: u64,
        /// Next index the store expects.
        next: u64,
    },

    /// An item conflicts with one already stored at the same index.
    #[error("conflicting item at index {index}")]
    Conflict {
        /// Conflicting index.
        index: u64,
    },

    /// Backend failure.
    #[error("database error: {0}")]
    DatabaseError(String),
}
