//! Epoch context for gas power computation.

use shared_types::{EpochSnapshot, GasPowerKind, PrevEpochEvent, Timestamp, ValidatorId, ValidatorSet};
use std::sync::Arc;

use crate::config::GasPowerConfig;

/// Inputs shared by every gas power computation within one epoch.
#[derive(Clone, Debug)]
pub struct GasPowerContext {
    snapshot: Arc<EpochSnapshot>,
    configs: [GasPowerConfig; 2],
}

impl GasPowerContext {
    /// Derive the context from the active epoch snapshot.
    pub fn from_snapshot(snapshot: Arc<EpochSnapshot>) -> Self {
        let configs = GasPowerConfig::pair_from_rules(&snapshot.rules);
        Self { snapshot, configs }
    }

    /// Validators of the epoch.
    pub fn validators(&self) -> &ValidatorSet {
        &self.snapshot.validators
    }

    /// Config of one kind.
    pub fn config(&self, kind: GasPowerKind) -> &GasPowerConfig {
        &self.configs[kind.index()]
    }

    /// Epoch start time.
    pub fn epoch_start(&self) -> Timestamp {
        self.snapshot.epoch_start
    }

    /// Carry-over state of `creator` from the previous epoch.
    pub fn prev_epoch_event(&self, creator: ValidatorId) -> Option<&PrevEpochEvent> {
        self.snapshot.prev_epoch_last.get(&creator)
    }
}
