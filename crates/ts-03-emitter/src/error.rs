//! Error types for the emitter

use shared_types::{Epoch, ValidatorId};
use thiserror::Error;
use ts_02_event_check::CheckError;

/// Result type for emitter operations
pub type Result<T> = std::result::Result<T, EmitterError>;

/// Emitter errors
#[derive(Debug, Clone, Error)]
pub enum EmitterError {
    /// The configured validator is not in the active set
    #[error("{validator} is not a validator of epoch {epoch}")]
    NotValidator {
        /// Configured validator
        validator: ValidatorId,
        /// Active epoch
        epoch: Epoch,
    },

    /// Signing failed
    #[error("signing failed: {0}")]
    Signing(String),

    /// The freshly built event failed validation
    #[error("self-check failed: {0}")]
    SelfCheck(#[from] CheckError),

    /// The gossip layer refused the event
    #[error("broadcast failed: {0}")]
    Broadcast(String),

    /// Invalid configuration
    #[error("invalid emitter config: {0}")]
    InvalidConfig(String),
}

impl EmitterError {
    /// Whether the next tick may succeed without intervention.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            EmitterError::NotValidator { .. } | EmitterError::Broadcast(_)
        )
    }

    /// Label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            EmitterError::NotValidator { .. } => "not_validator",
            EmitterError::Signing(_) => "signing",
            EmitterError::SelfCheck(_) => "self_check",
            EmitterError::Broadcast(_) => "broadcast",
            EmitterError::InvalidConfig(_) => "invalid_config",
        }
    }
}
