//! # Stream Sync (Subsystem 05)
//!
//! Chunked pull replication of the four index-addressed streams: DAG
//! events, block votes, block records and epoch packs. One generic
//! leecher/seeder pair is instantiated per stream.
//!
//! ## Architecture Role
//!
//! ```text
//!  StreamLeecher<I>                                   StreamSeeder<I>
//! ┌──────────────────────┐  ChunkRequest{start,limit} ┌─────────────────┐
//! │ Session per peer     │ ─────────────────────────→ │ read_range      │
//! │  pending chunks by   │                            │ caps + outbound │
//! │  start index         │ ←───────────────────────── │ DataSemaphore   │
//! └──────────┬───────────┘  ChunkResponse{items}      └─────────────────┘
//!            │ in index order
//!            ↓
//!   ItemValidator (Checkers for events) → StreamStore::apply
//! ```
//!
//! ## Session Lifecycle
//!
//! `Idle → AwaitingChunk → Applying → Idle`, and `Stalled → Restarting`
//! when no chunk was applied within the restart deadline. A restart takes
//! a fresh session ID and resumes from the last applied index; the store
//! absorbs re-delivered items idempotently.
//!
//! ## Guarantees
//!
//! - Chunks are applied in ascending index order, never across a gap.
//! - A short response schedules a follow-up for the missing tail; an empty
//!   response means the peer has nothing more.
//! - One rejected item fails its whole chunk and ends the session.
//! - Every outstanding chunk holds semaphore budget; cancellation and
//!   restarts drop it.

#![warn(missing_docs)]

pub mod adapters;
pub mod config;
pub mod domain;
pub mod error;
pub mod metrics;
pub mod ports;
pub mod service;

pub use adapters::{EventChunkValidator, LoopbackTransport, MemoryStreamStore};
pub use config::{LeecherConfig, SeederConfig};
pub use domain::{
    ChunkPlan, ChunkRequest, ChunkResponse, Session, SessionId, SessionInfo, SessionState,
    StreamItem, StreamKind,
};
pub use error::{LeecherError, SeederError, SessionError, TransportError};
pub use metrics::{LeecherMetrics, LeecherMetricsSnapshot, SeederMetrics, SeederMetricsSnapshot};
pub use ports::{
    AcceptAll, ChunkTransport, EventLookup, ItemRejection, ItemValidator, PeerPenalizer,
    PeerSource, ServeApi, StreamStore, SyncApi,
};
pub use service::{LeecherDeps, ServedChunk, StreamLeecher, StreamSeeder, SyncReport};
