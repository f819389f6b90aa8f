//! Validators currently believed offline.

use parking_lot::RwLock;
use shared_types::ValidatorId;
use std::collections::HashSet;
use std::sync::Arc;

/// Shared set of offline validators.
///
/// Written by a liveness monitor, read by turn scheduling. Views may differ
/// between nodes; that only costs duplicate or missed turns.
#[derive(Debug, Clone, Default)]
pub struct OfflineValidators {
    inner: Arc<RwLock<HashSet<ValidatorId>>>,
}

impl OfflineValidators {
    /// Empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `id` offline. Returns true if it was online before.
    pub fn set_offline(&self, id: ValidatorId) -> bool {
        self.inner.write().insert(id)
    }

    /// Mark `id` online. Returns true if it was offline before.
    pub fn set_online(&self, id: ValidatorId) -> bool {
        self.inner.write().remove(&id)
    }

    /// Replace the whole view.
    pub fn replace(&self, offline: HashSet<ValidatorId>) {
        *self.inner.write() = offline;
    }

    /// Whether `id` is believed offline.
    pub fn contains(&self, id: ValidatorId) -> bool {
        self.inner.read().contains(&id)
    }

    /// Number of offline validators.
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    /// Whether every validator is believed online.
    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    /// Copy of the current view.
    pub fn snapshot(&self) -> HashSet<ValidatorId> {
        self.inner.read().clone()
    }
}
