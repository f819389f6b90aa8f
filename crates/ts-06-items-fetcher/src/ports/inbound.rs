//! Inbound ports.

use async_trait::async_trait;
use shared_types::{Hash, PeerId};

use crate::error::Result;

/// Announcement intake of a fetcher.
#[async_trait]
pub trait FetcherApi: Send + Sync {
    /// `peer` announced `hashes`. Fails fast when the queue is full.
    fn notify_announces(&self, peer: PeerId, hashes: Vec<Hash>) -> Result<()>;

    /// Items with `hashes` arrived. Waits for queue space.
    async fn notify_received(&self, hashes: Vec<Hash>) -> Result<()>;

    /// Whether announcements are arriving faster than they are processed.
    fn overloaded(&self) -> bool;
}
