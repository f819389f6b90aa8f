//! Outbound ports (driven side - SPI)

use async_trait::async_trait;
use shared_types::{Address, Epoch, Event, EventPayload, Hash, Transaction, ValidatorId};
use std::collections::HashMap;

use crate::error::Result;

/// Port: pending transactions.
pub trait TxPool: Send + Sync {
    /// Executable transactions grouped by sender.
    fn pending(&self) -> HashMap<Address, Vec<Transaction>>;

    /// Whether the pool still holds `hash`.
    fn has(&self, hash: &Hash) -> bool;

    /// Number of pooled transactions.
    fn count(&self) -> usize;
}

/// Port: read access to the local DAG.
pub trait DagReader: Send + Sync {
    /// Events of `epoch` without known descendants.
    fn heads(&self, epoch: Epoch) -> Vec<Event>;

    /// Latest event of `creator` in `epoch`.
    fn last_event(&self, epoch: Epoch, creator: ValidatorId) -> Option<Event>;
}

/// Port: signs events with the local validator key.
pub trait EventSigner: Send + Sync {
    /// Fill in `payload.signature`.
    fn sign(&self, payload: &mut EventPayload) -> Result<()>;
}

/// Port: hands finished events to the gossip layer.
#[async_trait]
pub trait EventBroadcaster: Send + Sync {
    /// Connect the event locally and announce it to peers.
    async fn broadcast(&self, event: Event) -> Result<()>;
}
