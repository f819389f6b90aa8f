//! In-process item retrieval for the fetchers.

use async_trait::async_trait;
use parking_lot::RwLock;
use shared_types::{Hash, PeerId};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use ts_06_items_fetcher::{FetcherError, ItemRequester};

use super::ItemSource;

/// Items a peer sent in answer to a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery<T> {
    /// Sender
    pub peer: PeerId,
    /// Requested items the peer had
    pub items: Vec<T>,
}

/// Asks connected peers' stores directly and queues what they return for
/// the node's inbound processing.
pub struct PeerItemRequester<T> {
    sources: RwLock<HashMap<PeerId, Arc<dyn ItemSource<T>>>>,
    deliver: mpsc::Sender<Delivery<T>>,
}

impl<T: Send + 'static> PeerItemRequester<T> {
    /// Requester delivering into `deliver`.
    pub fn new(deliver: mpsc::Sender<Delivery<T>>) -> Self {
        Self {
            sources: RwLock::new(HashMap::new()),
            deliver,
        }
    }

    /// Make `peer`'s items reachable.
    pub fn connect(&self, peer: PeerId, source: Arc<dyn ItemSource<T>>) {
        self.sources.write().insert(peer, source);
    }

    /// Make `peer` unreachable.
    pub fn disconnect(&self, peer: PeerId) {
        self.sources.write().remove(&peer);
    }
}

#[async_trait]
impl<T: Send + 'static> ItemRequester for PeerItemRequester<T> {
    async fn request_items(&self, peer: PeerId, hashes: Vec<Hash>) -> ts_06_items_fetcher::Result<()> {
        let source = self
            .sources
            .read()
            .get(&peer)
            .cloned()
            .ok_or_else(|| FetcherError::Request {
                peer,
                reason: "peer not connected".to_string(),
            })?;
        let items = source.get_items(&hashes);
        if items.is_empty() {
            return Ok(());
        }
        self.deliver
            .send(Delivery { peer, items })
            .await
            .map_err(|_| FetcherError::Stopped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::NodeId;

    struct Fixed(Vec<(Hash, u32)>);

    impl ItemSource<u32> for Fixed {
        fn get_items(&self, hashes: &[Hash]) -> Vec<u32> {
            self.0
                .iter()
                .filter(|(h, _)| hashes.contains(h))
                .map(|(_, v)| *v)
                .collect()
        }
    }

    #[tokio::test]
    async fn test_delivers_found_items() {
        let (tx, mut rx) = mpsc::channel(4);
        let requester = PeerItemRequester::new(tx);
        let peer = NodeId([2; 32]);
        requester.connect(peer, Arc::new(Fixed(vec![([1; 32], 10), ([2; 32], 20)])));

        requester.request_items(peer, vec![[2; 32], [3; 32]]).await.unwrap();
        assert_eq!(rx.recv().await, Some(Delivery { peer, items: vec![20] }));

        // nothing found, nothing delivered
        requester.request_items(peer, vec![[3; 32]]).await.unwrap();
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_unknown_peer_fails() {
        let (tx, _rx) = mpsc::channel(4);
        let requester: PeerItemRequester<u32> = PeerItemRequester::new(tx);
        let peer = NodeId([2; 32]);
        let err = requester.request_items(peer, vec![[1; 32]]).await.unwrap_err();
        assert!(matches!(err, FetcherError::Request { .. }));

        requester.connect(peer, Arc::new(Fixed(vec![])));
        requester.disconnect(peer);
        assert!(requester.request_items(peer, vec![[1; 32]]).await.is_err());
    }
}
