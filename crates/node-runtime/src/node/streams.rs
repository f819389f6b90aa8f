//! One stream protocol: its leecher, its seeder and the transport between
//! the leecher and the peers' seeders.

use shared_types::{Metric, PeerId};
use std::sync::Arc;
use ts_04_flow_control::DataSemaphore;
use ts_05_stream_sync::{
    ItemValidator, LeecherConfig, LeecherDeps, LoopbackTransport, PeerPenalizer, SeederConfig,
    StreamItem, StreamKind, StreamLeecher, StreamSeeder, StreamStore,
};

/// Both sides of one stream on one node.
pub struct StreamProtocol<I> {
    /// Pull side
    pub leecher: Arc<StreamLeecher<I>>,
    /// Serving side
    pub seeder: Arc<StreamSeeder<I>>,
    /// Links to peers' seeders
    pub transport: Arc<LoopbackTransport<I>>,
    /// Unsent response budget of the seeder
    pub outbound: Arc<DataSemaphore>,
}

/// Construction inputs shared by every stream.
pub(crate) struct ProtocolParts<I> {
    pub kind: StreamKind,
    pub local: PeerId,
    pub leecher: LeecherConfig,
    pub seeder: SeederConfig,
    pub store: Arc<dyn StreamStore<I>>,
    pub validator: Arc<dyn ItemValidator<I>>,
    pub penalizer: Arc<dyn PeerPenalizer>,
    pub inbound: Arc<DataSemaphore>,
}

impl<I: StreamItem> StreamProtocol<I> {
    pub(crate) fn new(parts: ProtocolParts<I>) -> Self {
        let transport = Arc::new(LoopbackTransport::new(parts.local));
        let outbound = Arc::new(DataSemaphore::new(
            format!("{}-outbound", parts.kind),
            parts.seeder.max_pending_responses,
        ));
        let seeder = Arc::new(StreamSeeder::new(
            parts.kind,
            parts.seeder,
            parts.store.clone(),
            outbound.clone(),
        ));
        let leecher = Arc::new(StreamLeecher::new(
            parts.kind,
            parts.leecher,
            LeecherDeps {
                transport: transport.clone(),
                store: parts.store,
                validator: parts.validator,
                penalizer: parts.penalizer,
                semaphore: parts.inbound,
            },
        ));
        Self {
            leecher,
            seeder,
            transport,
            outbound,
        }
    }

    /// Let the leecher pull from `remote`'s seeder.
    pub(crate) fn link(&self, peer: PeerId, remote: &StreamProtocol<I>) {
        self.transport.connect(peer, remote.seeder.clone());
    }

    /// Cancel the session with `peer` and forget its seeder.
    pub(crate) fn unlink(&self, peer: PeerId) {
        self.leecher.peer_disconnected(peer);
        self.transport.disconnect(peer);
    }

    /// Outbound budget currently held by unsent responses.
    pub fn pending_responses(&self) -> Metric {
        self.outbound.processing()
    }
}
