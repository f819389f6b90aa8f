//! Metrics collection for stream sync

use std::sync::atomic::{AtomicU64, Ordering};

/// Leecher counters.
#[derive(Debug, Default)]
pub struct LeecherMetrics {
    /// Sessions started
    pub sessions_started: AtomicU64,
    /// Sessions that reached the seeder's tail
    pub sessions_completed: AtomicU64,
    /// Sessions given up after repeated restarts
    pub sessions_abandoned: AtomicU64,
    /// Sessions cancelled
    pub sessions_cancelled: AtomicU64,
    /// Restarts after a stall
    pub restarts: AtomicU64,
    /// Chunk requests sent
    pub chunks_requested: AtomicU64,
    /// Chunks applied to the store
    pub chunks_applied: AtomicU64,
    /// Items applied to the store
    pub items_applied: AtomicU64,
    /// Requests that failed or timed out
    pub request_failures: AtomicU64,
    /// Chunks with a rejected item
    pub invalid_chunks: AtomicU64,
    /// Responses to a previous session incarnation
    pub stale_responses: AtomicU64,
    /// Requests deferred for lack of semaphore capacity
    pub permit_timeouts: AtomicU64,
}

/// Point-in-time copy of [`LeecherMetrics`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LeecherMetricsSnapshot {
    /// Sessions started
    pub sessions_started: u64,
    /// Sessions completed
    pub sessions_completed: u64,
    /// Sessions abandoned
    pub sessions_abandoned: u64,
    /// Sessions cancelled
    pub sessions_cancelled: u64,
    /// Restarts
    pub restarts: u64,
    /// Chunk requests
    pub chunks_requested: u64,
    /// Applied chunks
    pub chunks_applied: u64,
    /// Applied items
    pub items_applied: u64,
    /// Failed requests
    pub request_failures: u64,
    /// Invalid chunks
    pub invalid_chunks: u64,
    /// Stale responses
    pub stale_responses: u64,
    /// Permit timeouts
    pub permit_timeouts: u64,
}

impl LeecherMetrics {
    /// Create new metrics collector
    pub fn new() -> Self {
        Self::default()
    }

    fn inc(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a session start
    pub fn record_session_started(&self) {
        Self::inc(&self.sessions_started);
    }

    /// Record a completed session
    pub fn record_session_completed(&self) {
        Self::inc(&self.sessions_completed);
    }

    /// Record an abandoned session
    pub fn record_session_abandoned(&self) {
        Self::inc(&self.sessions_abandoned);
    }

    /// Record a cancelled session
    pub fn record_session_cancelled(&self) {
        Self::inc(&self.sessions_cancelled);
    }

    /// Record a restart
    pub fn record_restart(&self) {
        Self::inc(&self.restarts);
    }

    /// Record a chunk request
    pub fn record_chunk_requested(&self) {
        Self::inc(&self.chunks_requested);
    }

    /// Record an applied chunk of `items` items
    pub fn record_chunk_applied(&self, items: u64) {
        Self::inc(&self.chunks_applied);
        self.items_applied.fetch_add(items, Ordering::Relaxed);
    }

    /// Record a failed request
    pub fn record_request_failure(&self) {
        Self::inc(&self.request_failures);
    }

    /// Record an invalid chunk
    pub fn record_invalid_chunk(&self) {
        Self::inc(&self.invalid_chunks);
    }

    /// Record a stale response
    pub fn record_stale_response(&self) {
        Self::inc(&self.stale_responses);
    }

    /// Record a permit timeout
    pub fn record_permit_timeout(&self) {
        Self::inc(&self.permit_timeouts);
    }

    /// Copy all counters
    pub fn snapshot(&self) -> LeecherMetricsSnapshot {
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);
        LeecherMetricsSnapshot {
            sessions_started: load(&self.sessions_started),
            sessions_completed: load(&self.sessions_completed),
            sessions_abandoned: load(&self.sessions_abandoned),
            sessions_cancelled: load(&self.sessions_cancelled),
            restarts: load(&self.restarts),
            chunks_requested: load(&self.chunks_requested),
            chunks_applied: load(&self.chunks_applied),
            items_applied: load(&self.items_applied),
            request_failures: load(&self.request_failures),
            invalid_chunks: load(&self.invalid_chunks),
            stale_responses: load(&self.stale_responses),
            permit_timeouts: load(&self.permit_timeouts),
        }
    }
}

/// Seeder counters.
#[derive(Debug, Default)]
pub struct SeederMetrics {
    /// Responses produced
    pub requests_served: AtomicU64,
    /// Items sent
    pub items_served: AtomicU64,
    /// Bytes sent
    pub bytes_served: AtomicU64,
    /// Requests refused for lack of outbound capacity
    pub busy_rejections: AtomicU64,
    /// Malformed requests
    pub invalid_requests: AtomicU64,
}

/// Point-in-time copy of [`SeederMetrics`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SeederMetricsSnapshot {
    /// Responses
    pub requests_served: u64,
    /// Items
    pub items_served: u64,
    /// Bytes
    pub bytes_served: u64,
    /// Busy rejections
    pub busy_rejections: u64,
    /// Malformed requests
    pub invalid_requests: u64,
}

impl SeederMetrics {
    /// Create new metrics collector
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a response of `items` items and `bytes` bytes
    pub fn record_served(&self, items: u64, bytes: u64) {
        self.requests_served.fetch_add(1, Ordering::Relaxed);
        self.items_served.fetch_add(items, Ordering::Relaxed);
        self.bytes_served.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Record a busy rejection
    pub fn record_busy(&self) {
        self.busy_rejections.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a malformed request
    pub fn record_invalid_request(&self) {
        self.invalid_requests.fetch_add(1, Ordering::Relaxed);
    }

    /// Copy all counters
    pub fn snapshot(&self) -> SeederMetricsSnapshot {
        SeederMetricsSnapshot {
            requests_served: self.requests_served.load(Ordering::Relaxed),
            items_served: self.items_served.load(Ordering::Relaxed),
            bytes_served: self.bytes_served.load(Ordering::Relaxed),
            busy_rejections: self.busy_rejections.load(Ordering::Relaxed),
            invalid_requests: self.invalid_requests.load(Ordering::Relaxed),
        }
    }
}
