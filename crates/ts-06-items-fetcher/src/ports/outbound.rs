//! Outbound ports.

use async_trait::async_trait;
use shared_types::{Hash, PeerId};

use crate::error::Result;

/// Sends item requests to peers. Items arrive later through the normal
/// message path and are reported with `notify_received`.
#[async_trait]
pub trait ItemRequester: Send + Sync {
    /// Ask `peer` for the items with `hashes`.
    async fn request_items(&self, peer: PeerId, hashes: Vec<Hash>) -> Result<()>;
}

/// Local knowledge of items.
pub trait KnownItems: Send + Sync {
    /// Whether the item is already held or being processed.
    fn is_known(&self, hash: &Hash) -> bool;
}
