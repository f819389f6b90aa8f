//! Inbound ports: what the node calls on the leecher and seeder.

use async_trait::async_trait;
use shared_types::PeerId;

use crate::domain::{ChunkRequest, SessionInfo, StreamKind};
use crate::error::{LeecherError, SeederError};
use crate::service::{ServedChunk, SyncReport};

/// Pull side of one stream.
#[async_trait]
pub trait SyncApi: Send + Sync {
    /// Stream this leecher replicates.
    fn kind(&self) -> StreamKind;

    /// Sync with `peer` until it has nothing more, the session is
    /// abandoned, or it is cancelled.
    async fn sync(&self, peer: PeerId) -> Result<SyncReport, LeecherError>;

    /// Running sessions.
    fn sessions(&self) -> Vec<SessionInfo>;

    /// Cancel the session with `peer`, if any.
    fn peer_disconnected(&self, peer: PeerId);
}

/// Serving side of one stream.
#[async_trait]
pub trait ServeApi<I>: Send + Sync {
    /// Answer a chunk request from `peer`.
    async fn serve(&self, peer: PeerId, req: ChunkRequest) -> Result<ServedChunk<I>, SeederError>;
}
