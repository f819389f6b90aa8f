//! Outbound ports: what the leecher and seeder need from the node.

use async_trait::async_trait;
use shared_types::{Event, EventId, PeerId, StoreError};

use crate::domain::{ChunkRequest, ChunkResponse};
use crate::error::TransportError;

/// Sends chunk requests to remote seeders.
#[async_trait]
pub trait ChunkTransport<I>: Send + Sync {
    /// Request a chunk from `peer`.
    async fn request(
        &self,
        peer: PeerId,
        req: ChunkRequest,
    ) -> Result<ChunkResponse<I>, TransportError>;
}

/// Local index-addressed storage of one stream.
pub trait StreamStore<I>: Send + Sync {
    /// Index of the next item to be applied.
    fn next_index(&self) -> u64;

    /// Items from `from` on, stopping at `max_count` items or before
    /// exceeding `max_size` bytes. The first item is returned even if it
    /// alone exceeds `max_size`.
    fn read_range(&self, from: u64, max_count: u64, max_size: u64) -> Vec<I>;

    /// Store items at `start..`. Items already held are skipped when
    /// identical; a start past `next_index` is a gap.
    fn apply(&self, start: u64, items: Vec<I>) -> Result<(), StoreError>;
}

/// Why an item of a chunk was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemRejection {
    /// Stream index of the item
    pub index: u64,
    /// Human-readable cause
    pub reason: String,
    /// Whether the sending peer is at fault
    pub penalize: bool,
}

/// Checks items before they are stored.
pub trait ItemValidator<I>: Send + Sync {
    /// Validate a chunk starting at stream index `start`. One bad item
    /// fails the whole chunk.
    fn validate_chunk(&self, start: u64, items: &[I]) -> Result<(), ItemRejection>;
}

/// Accepts every item.
#[derive(Debug, Default, Clone, Copy)]
pub struct AcceptAll;

impl<I> ItemValidator<I> for AcceptAll {
    fn validate_chunk(&self, _start: u64, _items: &[I]) -> Result<(), ItemRejection> {
        Ok(())
    }
}

/// Punishes misbehaving peers. Dropping or banning is up to the node.
pub trait PeerPenalizer: Send + Sync {
    /// Report `peer` for `reason`.
    fn penalize(&self, peer: PeerId, reason: &str);
}

/// Peers currently available for syncing.
pub trait PeerSource: Send + Sync {
    /// Connected peers.
    fn peers(&self) -> Vec<PeerId>;
}

/// Read access to events already in the local DAG.
pub trait EventLookup: Send + Sync {
    /// Event by ID.
    fn get_event(&self, id: &EventId) -> Option<Event>;

    /// Whether the event is known.
    fn has_event(&self, id: &EventId) -> bool {
        self.get_event(id).is_some()
    }
}
