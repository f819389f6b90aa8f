//! Node assembly errors.

use shared_types::ValidatorSetError;
use thiserror::Error;
use ts_02_event_check::BatchError;
use ts_03_emitter::EmitterError;

use crate::config::ConfigError;

/// Failures while building or starting a node.
#[derive(Debug, Error)]
pub enum NodeError {
    /// The configuration is inconsistent.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The emitter refused its settings.
    #[error("emitter: {0}")]
    Emitter(#[from] EmitterError),

    /// The heavy check pool could not start.
    #[error("heavy check pool: {0}")]
    HeavyPool(#[from] BatchError),

    /// The genesis validator set is malformed.
    #[error("genesis: {0}")]
    Genesis(#[from] ValidatorSetError),

    /// `run` was called twice.
    #[error("node is already running")]
    AlreadyRunning,
}

impl NodeError {
    /// Label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            NodeError::Config(_) => "config",
            NodeError::Emitter(_) => "emitter",
            NodeError::HeavyPool(_) => "heavy_pool",
            NodeError::Genesis(_) => "genesis",
            NodeError::AlreadyRunning => "already_running",
        }
    }
}
