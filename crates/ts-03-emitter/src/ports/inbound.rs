//! Inbound ports (driving side - API)

use async_trait::async_trait;
use shared_types::{Event, EventId, Timestamp, ValidatorId};

use crate::error::Result;

/// Primary port: the local event emitter.
#[async_trait]
pub trait EmitterApi: Send + Sync {
    /// Try to build and broadcast one event now. `None` when emission is
    /// throttled or the validator lacks gas power.
    async fn emit(&self) -> Result<Option<Event>>;

    /// An event of any creator was connected to the DAG.
    fn on_event_connected(&self, event: &Event);

    /// An event was confirmed by consensus.
    fn on_event_confirmed(&self, event: &Event);

    /// Current status.
    fn status(&self) -> EmitterStatus;
}

/// Emitter status.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EmitterStatus {
    /// Local validator
    pub validator: ValidatorId,
    /// Last emitted event
    pub last_event: Option<EventId>,
    /// Creation time of the last emitted event
    pub last_emitted_at: Option<Timestamp>,
    /// Gas of unconfirmed events
    pub pending_gas: u64,
}
