//! Stream kinds and the chunk wire types.

use serde::{Deserialize, Serialize};
use shared_types::{ItemSize, Metric};
use std::fmt;
use uuid::Uuid;

/// Identifier of one leecher session. A restart gets a fresh ID so late
/// responses to the old session are recognised and dropped.
pub type SessionId = Uuid;

/// Replicated streams.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StreamKind {
    /// DAG events
    Events,
    /// Block votes
    BlockVotes,
    /// Finalized block records
    BlockRecords,
    /// Sealed epoch packs
    EpochPacks,
}

impl StreamKind {
    /// All kinds.
    pub const ALL: [StreamKind; 4] = [
        StreamKind::Events,
        StreamKind::BlockVotes,
        StreamKind::BlockRecords,
        StreamKind::EpochPacks,
    ];

    /// Label for logs and metrics.
    pub const fn as_str(self) -> &'static str {
        match self {
            StreamKind::Events => "events",
            StreamKind::BlockVotes => "bvs",
            StreamKind::BlockRecords => "brs",
            StreamKind::EpochPacks => "eps",
        }
    }
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Anything a stream can carry.
pub trait StreamItem: ItemSize + Clone + Send + Sync + 'static {}

impl<T: ItemSize + Clone + Send + Sync + 'static> StreamItem for T {}

/// Request for the items at `start..start + limit.num`, at most
/// `limit.size` bytes in total.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkRequest {
    /// Requesting session
    pub session: SessionId,
    /// Stream
    pub kind: StreamKind,
    /// First requested index
    pub start: u64,
    /// Item and byte budget
    pub limit: Metric,
}

impl ChunkRequest {
    /// One past the last requested index.
    pub fn end(&self) -> u64 {
        self.start.saturating_add(self.limit.num)
    }
}

/// Items `start..start + items.len()`. Fewer items than requested means
/// the seeder hit a budget or its own tail; none means it has nothing from
/// `start` on.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkResponse<I> {
    /// Session of the request
    pub session: SessionId,
    /// Stream
    pub kind: StreamKind,
    /// Index of the first item
    pub start: u64,
    /// Items in index order
    pub items: Vec<I>,
}

impl<I: ItemSize> ChunkResponse<I> {
    /// Total item count and encoded size.
    pub fn weight(&self) -> Metric {
        Metric::new(
            self.items.len() as u64,
            self.items
                .iter()
                .fold(0u64, |acc, i| acc.saturating_add(i.encoded_size())),
        )
    }
}
