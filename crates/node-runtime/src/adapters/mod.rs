//! Port implementations backed by process memory.

pub mod dag;
pub mod fetch;
pub mod peers;
pub mod tx_pool;

pub use dag::{DagError, MemoryDag};
pub use fetch::{Delivery, PeerItemRequester};
pub use peers::PeerSet;
pub use tx_pool::MemoryTxPool;

use shared_types::Hash;

/// Items a peer can hand out by hash.
pub trait ItemSource<T>: Send + Sync {
    /// Items found among `hashes`, in request order.
    fn get_items(&self, hashes: &[Hash]) -> Vec<T>;
}
