//! Connected peers and their penalty tally.

use parking_lot::RwLock;
use shared_types::PeerId;
use std::collections::BTreeMap;
use tracing::{info, warn};
use ts_05_stream_sync::{PeerPenalizer, PeerSource};

type DropHook = Box<dyn Fn(PeerId) + Send + Sync>;

/// Peer registry shared by every stream of a node.
pub struct PeerSet {
    peers: RwLock<BTreeMap<PeerId, u32>>,
    max_penalties: u32,
    on_drop: RwLock<Vec<DropHook>>,
}

impl PeerSet {
    /// Empty set dropping peers at `max_penalties`.
    pub fn new(max_penalties: u32) -> Self {
        Self {
            peers: RwLock::new(BTreeMap::new()),
            max_penalties: max_penalties.max(1),
            on_drop: RwLock::new(Vec::new()),
        }
    }

    /// Call `hook` whenever a peer leaves, voluntarily or not.
    pub fn on_drop(&self, hook: impl Fn(PeerId) + Send + Sync + 'static) {
        self.on_drop.write().push(Box::new(hook));
    }

    /// Register a peer. `false` if it was already connected.
    pub fn add(&self, peer: PeerId) -> bool {
        let added = self.peers.write().insert(peer, 0).is_none();
        if added {
            info!(peer = %peer, "Peer connected");
        }
        added
    }

    /// Forget a peer and cancel whatever runs against it.
    pub fn remove(&self, peer: PeerId) -> bool {
        let removed = self.peers.write().remove(&peer).is_some();
        if removed {
            info!(peer = %peer, "Peer disconnected");
            for hook in self.on_drop.read().iter() {
                hook(peer);
            }
        }
        removed
    }

    /// Whether `peer` is connected.
    pub fn contains(&self, peer: PeerId) -> bool {
        self.peers.read().contains_key(&peer)
    }

    /// Penalties recorded against `peer`.
    pub fn penalties(&self, peer: PeerId) -> u32 {
        self.peers.read().get(&peer).copied().unwrap_or(0)
    }
}

impl PeerSource for PeerSet {
    fn peers(&self) -> Vec<PeerId> {
        self.peers.read().keys().copied().collect()
    }
}

impl PeerPenalizer for PeerSet {
    fn penalize(&self, peer: PeerId, reason: &str) {
        let tally = {
            let mut peers = self.peers.write();
            let Some(tally) = peers.get_mut(&peer) else {
                return;
            };
            *tally += 1;
            *tally
        };
        warn!(peer = %peer, reason, penalties = tally, "Peer penalized");
        if tally >= self.max_penalties {
            warn!(peer = %peer, "Dropping misbehaving peer");
            self.remove(peer);
        }
    }
}
