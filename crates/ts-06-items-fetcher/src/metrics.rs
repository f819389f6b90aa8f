//! Metrics collection for the items fetcher

use std::sync::atomic::{AtomicU64, Ordering};

use crate::domain::{AnnounceOutcome, PollOutcome};

/// Fetcher counters and gauges.
#[derive(Debug, Default)]
pub struct Metrics {
    /// Announced (hash, peer) pairs accepted
    pub announces_accepted: AtomicU64,
    /// Announced hashes already known
    pub announces_known: AtomicU64,
    /// Announced hashes dropped at the per-peer limit
    pub announces_over_limit: AtomicU64,
    /// Announcement batches dropped on a full queue
    pub announces_overloaded: AtomicU64,
    /// Requests sent
    pub requests_sent: AtomicU64,
    /// Hashes requested
    pub hashes_requested: AtomicU64,
    /// Requests that failed to send
    pub request_failures: AtomicU64,
    /// Hashes whose request exceeded the arrive timeout
    pub arrive_timeouts: AtomicU64,
    /// Hashes dropped at the forget timeout
    pub forgotten: AtomicU64,
    /// Tracked hashes that arrived
    pub received: AtomicU64,
    /// Currently tracked hashes
    pub tracked: AtomicU64,
    /// Currently outstanding requests
    pub in_flight: AtomicU64,
}

/// Point-in-time copy of [`Metrics`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetricsSnapshot {
    /// Accepted announces
    pub announces_accepted: u64,
    /// Known announces
    pub announces_known: u64,
    /// Over-limit announces
    pub announces_over_limit: u64,
    /// Overload drops
    pub announces_overloaded: u64,
    /// Requests
    pub requests_sent: u64,
    /// Requested hashes
    pub hashes_requested: u64,
    /// Send failures
    pub request_failures: u64,
    /// Arrive timeouts
    pub arrive_timeouts: u64,
    /// Forgotten hashes
    pub forgotten: u64,
    /// Received hashes
    pub received: u64,
    /// Tracked now
    pub tracked: u64,
    /// Outstanding now
    pub in_flight: u64,
}

impl Metrics {
    /// Create new metrics collector
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an announcement batch
    pub fn record_announce(&self, outcome: &AnnounceOutcome) {
        self.announces_accepted
            .fetch_add(outcome.accepted as u64, Ordering::Relaxed);
        self.announces_known
            .fetch_add(outcome.known as u64, Ordering::Relaxed);
        self.announces_over_limit
            .fetch_add(outcome.over_limit as u64, Ordering::Relaxed);
    }

    /// Record a dropped announcement batch
    pub fn record_overloaded(&self) {
        self.announces_overloaded.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a poll
    pub fn record_poll(&self, outcome: &PollOutcome) {
        self.requests_sent
            .fetch_add(outcome.requests.len() as u64, Ordering::Relaxed);
        let hashes: usize = outcome.requests.iter().map(|r| r.hashes.len()).sum();
        self.hashes_requested
            .fetch_add(hashes as u64, Ordering::Relaxed);
        self.arrive_timeouts
            .fetch_add(outcome.timed_out as u64, Ordering::Relaxed);
        self.forgotten
            .fetch_add(outcome.forgotten as u64, Ordering::Relaxed);
        self.received
            .fetch_add(outcome.arrived_elsewhere as u64, Ordering::Relaxed);
    }

    /// Record tracked hashes that arrived
    pub fn record_received(&self, count: usize) {
        self.received.fetch_add(count as u64, Ordering::Relaxed);
    }

    /// Record a request that failed to send
    pub fn record_request_failure(&self) {
        self.request_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Update gauges
    pub fn set_gauges(&self, tracked: usize, in_flight: usize) {
        self.tracked.store(tracked as u64, Ordering::Relaxed);
        self.in_flight.store(in_flight as u64, Ordering::Relaxed);
    }

    /// Copy all counters
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            announces_accepted: self.announces_accepted.load(Ordering::Relaxed),
            announces_known: self.announces_known.load(Ordering::Relaxed),
            announces_over_limit: self.announces_over_limit.load(Ordering::Relaxed),
            announces_overloaded: self.announces_overloaded.load(Ordering::Relaxed),
            requests_sent: self.requests_sent.load(Ordering::Relaxed),
            hashes_requested: self.hashes_requested.load(Ordering::Relaxed),
            request_failures: self.request_failures.load(Ordering::Relaxed),
            arrive_timeouts: self.arrive_timeouts.load(Ordering::Relaxed),
            forgotten: self.forgotten.load(Ordering::Relaxed),
            received: self.received.load(Ordering::Relaxed),
            tracked: self.tracked.load(Ordering::Relaxed),
            in_flight: self.in_flight.load(Ordering::Relaxed),
        }
    }
}
