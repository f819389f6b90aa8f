//! In-process transport connecting leechers to seeders directly.

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use shared_types::PeerId;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use crate::domain::{ChunkRequest, ChunkResponse, StreamItem};
use crate::error::TransportError;
use crate::ports::{ChunkTransport, ServeApi};

/// Requests kept for inspection.
const SENT_LOG_LEN: usize = 1024;

/// Routes requests to the seeder registered for each peer.
pub struct LoopbackTransport<I> {
    local: PeerId,
    seeders: RwLock<HashMap<PeerId, Arc<dyn ServeApi<I>>>>,
    sent: Mutex<VecDeque<(PeerId, ChunkRequest)>>,
}

impl<I: StreamItem> LoopbackTransport<I> {
    /// Transport of the node `local`.
    pub fn new(local: PeerId) -> Self {
        Self {
            local,
            seeders: RwLock::new(HashMap::new()),
            sent: Mutex::new(VecDeque::new()),
        }
    }

    /// Make `peer` reachable.
    pub fn connect(&self, peer: PeerId, seeder: Arc<dyn ServeApi<I>>) {
        self.seeders.write().insert(peer, seeder);
    }

    /// Make `peer` unreachable.
    pub fn disconnect(&self, peer: PeerId) {
        self.seeders.write().remove(&peer);
    }

    /// Whether `peer` is reachable.
    pub fn is_connected(&self, peer: PeerId) -> bool {
        self.seeders.read().contains_key(&peer)
    }

    /// The most recent requests, oldest first.
    pub fn sent(&self) -> Vec<(PeerId, ChunkRequest)> {
        self.sent.lock().iter().cloned().collect()
    }
}

#[async_trait]
impl<I: StreamItem> ChunkTransport<I> for LoopbackTransport<I> {
    async fn request(
        &self,
        peer: PeerId,
        req: ChunkRequest,
    ) -> Result<ChunkResponse<I>, TransportError> {
        {
            let mut sent = self.sent.lock();
            if sent.len() == SENT_LOG_LEN {
                sent.pop_front();
            }
            sent.push_back((peer, req.clone()));
        }
        let seeder = self
            .seeders
            .read()
            .get(&peer)
            .cloned()
            .ok_or(TransportError::PeerUnavailable(peer))?;
        seeder
            .serve(self.local, req)
            .await
            .map(|served| served.into_response())
            .map_err(|err| TransportError::Remote(err.to_string()))
    }
}
