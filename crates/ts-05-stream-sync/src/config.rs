//! Leecher and seeder configuration.

use serde::{Deserialize, Serialize};
use shared_types::Metric;
use std::time::Duration;
use ts_04_flow_control::{HARD_LIMIT_ITEMS, PROTOCOL_MAX_MSG_SIZE, SOFT_LIMIT_ITEMS};

use crate::domain::ChunkPlan;

const KIB: u64 = 1024;
const MIB: u64 = 1024 * KIB;

/// Leecher session tuning.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LeecherConfig {
    /// Items per chunk request
    pub chunk_num: u64,
    /// Bytes per chunk request
    pub chunk_size: u64,
    /// Chunks outstanding per session
    pub parallel_chunks: usize,
    /// Received but unapplied data one session may hold
    pub session_buffer: Metric,
    /// Peer rescan interval of the run loop, in ms
    pub recheck_interval_ms: u64,
    /// First restart deadline without progress, in ms
    pub min_session_restart_ms: u64,
    /// Restart deadline ceiling, in ms
    pub max_session_restart_ms: u64,
    /// Restarts before a session is abandoned
    pub max_session_restarts: u32,
    /// Peers synced concurrently by the run loop
    pub max_sessions: usize,
    /// Deadline of one chunk request, in ms. Below the first restart
    /// deadline, so a hung request is requeued before the session restarts.
    pub request_timeout_ms: u64,
    /// Wait for semaphore capacity before a request, in ms
    pub permit_timeout_ms: u64,
}

impl Default for LeecherConfig {
    fn default() -> Self {
        Self {
            chunk_num: 500,
            chunk_size: 512 * KIB,
            parallel_chunks: 6,
            session_buffer: Metric::new(6 * 500 + SOFT_LIMIT_ITEMS, 6 * 512 * KIB + 8 * MIB),
            recheck_interval_ms: 1000,
            min_session_restart_ms: 5_000,
            max_session_restart_ms: 5 * 60_000,
            max_session_restarts: 5,
            max_sessions: 1,
            request_timeout_ms: 3_000,
            permit_timeout_ms: 5_000,
        }
    }
}

impl LeecherConfig {
    /// DAG stream defaults: shorter restart ceiling.
    pub fn for_dag() -> Self {
        Self {
            max_session_restart_ms: 4 * 60_000,
            ..Self::default()
        }
    }

    /// Small chunks and short deadlines for tests.
    pub fn for_testing() -> Self {
        Self {
            chunk_num: 50,
            chunk_size: 64 * KIB,
            parallel_chunks: 2,
            session_buffer: Metric::new(500, 4 * MIB),
            recheck_interval_ms: 100,
            min_session_restart_ms: 500,
            max_session_restart_ms: 2_000,
            max_session_restarts: 3,
            max_sessions: 2,
            request_timeout_ms: 200,
            permit_timeout_ms: 100,
        }
    }

    /// Budget of one chunk.
    pub fn chunk_limit(&self) -> Metric {
        Metric::new(self.chunk_num, self.chunk_size)
    }

    /// Session chunk plan.
    pub fn plan(&self) -> ChunkPlan {
        ChunkPlan {
            limit: self.chunk_limit(),
            parallel: self.parallel_chunks,
        }
    }

    /// Peer rescan interval.
    pub fn recheck_interval(&self) -> Duration {
        Duration::from_millis(self.recheck_interval_ms)
    }

    /// First restart deadline.
    pub fn min_session_restart(&self) -> Duration {
        Duration::from_millis(self.min_session_restart_ms)
    }

    /// Restart deadline ceiling.
    pub fn max_session_restart(&self) -> Duration {
        Duration::from_millis(self.max_session_restart_ms)
    }

    /// Chunk request deadline.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Semaphore wait bound.
    pub fn permit_timeout(&self) -> Duration {
        Duration::from_millis(self.permit_timeout_ms)
    }

    /// Check protocol ceilings and internal consistency.
    pub fn validate(&self) -> Result<(), String> {
        if self.chunk_num == 0 || self.chunk_size == 0 {
            return Err("chunk size must be positive".into());
        }
        if self.chunk_num >= HARD_LIMIT_ITEMS {
            return Err(format!(
                "chunk of {} items reaches hard limit {}",
                self.chunk_num, HARD_LIMIT_ITEMS
            ));
        }
        if self.chunk_size > PROTOCOL_MAX_MSG_SIZE / 2 {
            return Err(format!(
                "chunk of {} bytes exceeds half the max message size",
                self.chunk_size
            ));
        }
        if self.parallel_chunks == 0 {
            return Err("parallel_chunks must be positive".into());
        }
        if !self.chunk_limit().fits_in(&self.session_buffer) {
            return Err(format!(
                "session buffer {} smaller than one chunk {}",
                self.session_buffer,
                self.chunk_limit()
            ));
        }
        if self.max_sessions == 0 {
            return Err("max_sessions must be positive".into());
        }
        if self.min_session_restart_ms > self.max_session_restart_ms {
            return Err("min_session_restart exceeds max_session_restart".into());
        }
        if self.request_timeout_ms >= self.min_session_restart_ms {
            return Err(format!(
                "request_timeout {}ms must be below min_session_restart {}ms",
                self.request_timeout_ms, self.min_session_restart_ms
            ));
        }
        Ok(())
    }
}

/// Seeder tuning.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeederConfig {
    /// Concurrent serves
    pub max_senders: usize,
    /// Item cap of one response
    pub max_response_num: u64,
    /// Byte cap of one response
    pub max_response_size: u64,
    /// Outbound data awaiting send, across all responses
    pub max_pending_responses: Metric,
    /// Wait for outbound capacity, in ms
    pub permit_timeout_ms: u64,
}

impl Default for SeederConfig {
    fn default() -> Self {
        Self {
            max_senders: 8,
            max_response_num: HARD_LIMIT_ITEMS - 1,
            max_response_size: PROTOCOL_MAX_MSG_SIZE / 2,
            max_pending_responses: Metric::new(HARD_LIMIT_ITEMS * 16, 64 * MIB),
            permit_timeout_ms: 1_000,
        }
    }
}

impl SeederConfig {
    /// Small caps for tests.
    pub fn for_testing() -> Self {
        Self {
            max_senders: 2,
            max_pending_responses: Metric::new(1000, 16 * MIB),
            permit_timeout_ms: 50,
            ..Self::default()
        }
    }

    /// Largest response.
    pub fn response_limit(&self) -> Metric {
        Metric::new(self.max_response_num, self.max_response_size)
    }

    /// Outbound capacity wait bound.
    pub fn permit_timeout(&self) -> Duration {
        Duration::from_millis(self.permit_timeout_ms)
    }
}
