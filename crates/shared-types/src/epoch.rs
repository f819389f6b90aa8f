//! Per-epoch read-only snapshots.
//!
//! Checkers and the emitter read the active epoch through a [`SnapshotCell`].
//! On epoch transition the whole snapshot is swapped; readers holding the
//! previous `Arc` keep a consistent view until they drop it.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use crate::entities::{Epoch, ValidatorId};
use crate::event::GasPowerLeft;
use crate::rules::Rules;
use crate::time::Timestamp;
use crate::validators::ValidatorSet;

/// Gas power state a validator carries over from its last event of the
/// previous epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrevEpochEvent {
    /// Gas power left after that event.
    pub gas_power_left: GasPowerLeft,
    /// Median time of that event.
    pub median_time: Timestamp,
}

/// Everything event validation needs to know about one epoch.
#[derive(Debug, Clone)]
pub struct EpochSnapshot {
    /// Epoch number.
    pub epoch: Epoch,
    /// Validators of the epoch.
    pub validators: Arc<ValidatorSet>,
    /// Rules of the epoch.
    pub rules: Arc<Rules>,
    /// Start time of the epoch (gas power baseline for first events).
    pub epoch_start: Timestamp,
    /// Last events of the previous epoch, by creator.
    pub prev_epoch_last: HashMap<ValidatorId, PrevEpochEvent>,
}

impl EpochSnapshot {
    /// Snapshot with no carry-over state.
    pub fn new(epoch: Epoch, validators: ValidatorSet, rules: Rules, epoch_start: Timestamp) -> Self {
        Self {
            epoch,
            validators: Arc::new(validators),
            rules: Arc::new(rules),
            epoch_start,
            prev_epoch_last: HashMap::new(),
        }
    }

    /// Builder-style setter for the carry-over map.
    pub fn with_prev_epoch_last(mut self, prev: HashMap<ValidatorId, PrevEpochEvent>) -> Self {
        self.prev_epoch_last = prev;
        self
    }
}

/// Source of the active epoch snapshot.
pub trait EpochReader: Send + Sync {
    /// Current snapshot.
    fn snapshot(&self) -> Arc<EpochSnapshot>;
}

/// Swappable holder of the active snapshot.
#[derive(Debug)]
pub struct SnapshotCell {
    inner: RwLock<Arc<EpochSnapshot>>,
}

impl SnapshotCell {
    /// Holder initialised with `snapshot`.
    pub fn new(snapshot: EpochSnapshot) -> Self {
        Self {
            inner: RwLock::new(Arc::new(snapshot)),
        }
    }

    /// Replace the snapshot on epoch transition.
    pub fn replace(&self, snapshot: EpochSnapshot) {
        let epoch = snapshot.epoch;
        *self.inner.write() = Arc::new(snapshot);
        tracing::info!(epoch = %epoch, "Epoch snapshot replaced");
    }
}

impl EpochReader for SnapshotCell {
    fn snapshot(&self) -> Arc<EpochSnapshot> {
        self.inner.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validators::ValidatorProfile;

    fn snapshot(epoch: u32) -> EpochSnapshot {
        let validators = ValidatorSet::new(vec![(
            ValidatorId(1),
            ValidatorProfile {
                weight: 1,
                pubkey: [0u8; 32],
            },
        )])
        .unwrap();
        EpochSnapshot::new(Epoch(epoch), validators, Rules::for_testing(), Timestamp(0))
    }

    #[test]
    fn test_readers_keep_old_snapshot_after_replace() {
        let cell = SnapshotCell::new(snapshot(1));
        let held = cell.snapshot();
        cell.replace(snapshot(2));
        assert_eq!(held.epoch, Epoch(1));
        assert_eq!(cell.snapshot().epoch, Epoch(2));
    }
}
