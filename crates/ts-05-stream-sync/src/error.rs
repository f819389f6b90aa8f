//! Error types for stream sync

use shared_types::{PeerId, StoreError};
use thiserror::Error;
use ts_04_flow_control::SemaphoreError;

use crate::domain::StreamKind;

/// Network failures of a chunk request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Peer is not connected
    #[error("peer {0} unavailable")]
    PeerUnavailable(PeerId),

    /// No response in time
    #[error("request timed out")]
    Timeout,

    /// Seeder refused the request
    #[error("remote error: {0}")]
    Remote(String),
}

/// Responses that do not fit the session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// Response belongs to an earlier incarnation of the session
    #[error("response for a previous session")]
    StaleResponse,

    /// Response for a different stream
    #[error("response for stream {got}, session streams {expected}")]
    KindMismatch {
        /// Session stream
        expected: StreamKind,
        /// Response stream
        got: StreamKind,
    },

    /// No request is outstanding at this index
    #[error("unexpected chunk at {start}")]
    UnexpectedChunk {
        /// Response start
        start: u64,
    },

    /// More items than requested
    #[error("chunk at {start} carries {got} items, {requested} requested")]
    OversizedChunk {
        /// Response start
        start: u64,
        /// Requested items
        requested: u64,
        /// Delivered items
        got: u64,
    },
}

impl SessionError {
    /// Whether the peer violated the protocol.
    pub fn penalizes_peer(&self) -> bool {
        !matches!(self, SessionError::StaleResponse)
    }
}

/// Leecher failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LeecherError {
    /// A session with this peer is already running
    #[error("already syncing {kind} with {peer}")]
    AlreadySyncing {
        /// Peer
        peer: PeerId,
        /// Stream
        kind: StreamKind,
    },

    /// The session was cancelled
    #[error("session cancelled")]
    Cancelled,

    /// Too many restarts without progress
    #[error("session abandoned after {restarts} restarts")]
    Abandoned {
        /// Restarts performed
        restarts: u32,
    },

    /// An item of a chunk was rejected
    #[error("invalid chunk at {start}: item {index} rejected: {reason}")]
    InvalidChunk {
        /// Chunk start
        start: u64,
        /// Index of the rejected item
        index: u64,
        /// Rejection reason
        reason: String,
    },

    /// The peer broke the chunk protocol
    #[error("protocol violation: {0}")]
    Protocol(#[from] SessionError),

    /// Local store refused the chunk
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl LeecherError {
    /// Whether a later session may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            LeecherError::AlreadySyncing { .. }
                | LeecherError::Cancelled
                | LeecherError::Abandoned { .. }
        )
    }

    /// Label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            LeecherError::AlreadySyncing { .. } => "already_syncing",
            LeecherError::Cancelled => "cancelled",
            LeecherError::Abandoned { .. } => "abandoned",
            LeecherError::InvalidChunk { .. } => "invalid_chunk",
            LeecherError::Protocol(_) => "protocol",
            LeecherError::Store(_) => "store",
        }
    }
}

/// Seeder failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SeederError {
    /// Request for a stream this seeder does not serve
    #[error("seeder serves {expected}, request for {got}")]
    KindMismatch {
        /// Served stream
        expected: StreamKind,
        /// Requested stream
        got: StreamKind,
    },

    /// Request for zero items or bytes
    #[error("empty chunk request")]
    EmptyRequest,

    /// Outbound budget exhausted
    #[error("seeder busy: {0}")]
    Busy(#[from] SemaphoreError),

    /// All sender slots taken
    #[error("too many concurrent senders")]
    TooManySenders,
}

impl SeederError {
    /// Label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            SeederError::KindMismatch { .. } => "kind_mismatch",
            SeederError::EmptyRequest => "empty_request",
            SeederError::Busy(_) => "busy",
            SeederError::TooManySenders => "too_many_senders",
        }
    }

    /// Whether the requester misbehaved.
    pub fn penalizes_peer(&self) -> bool {
        !matches!(self, SeederError::Busy(_) | SeederError::TooManySenders)
    }
}
