//! Metrics collection for inbound gossip processing

use std::sync::atomic::{AtomicU64, Ordering};

/// Inbound item counters.
#[derive(Debug, Default)]
pub struct NodeMetrics {
    /// Events delivered by peers
    pub events_received: AtomicU64,
    /// Delivered events connected to the DAG
    pub events_connected: AtomicU64,
    /// Delivered events already known
    pub events_duplicate: AtomicU64,
    /// Delivered events failing validation
    pub events_rejected: AtomicU64,
    /// Delivered events whose parents are unknown
    pub events_orphaned: AtomicU64,
    /// Event batches dropped on a full heavy check queue
    pub heavy_queue_full: AtomicU64,
    /// Transactions delivered by peers
    pub txs_received: AtomicU64,
    /// Delivered transactions added to the pool
    pub txs_added: AtomicU64,
    /// Announcement batches a peer's fetcher could not queue
    pub announces_dropped: AtomicU64,
    /// Deliveries dropped for lack of semaphore room
    pub deliveries_dropped: AtomicU64,
}

/// Point-in-time copy of [`NodeMetrics`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NodeMetricsSnapshot {
    /// Events received
    pub events_received: u64,
    /// Events connected
    pub events_connected: u64,
    /// Duplicate events
    pub events_duplicate: u64,
    /// Rejected events
    pub events_rejected: u64,
    /// Orphaned events
    pub events_orphaned: u64,
    /// Heavy queue overflows
    pub heavy_queue_full: u64,
    /// Transactions received
    pub txs_received: u64,
    /// Transactions added
    pub txs_added: u64,
    /// Dropped announcements
    pub announces_dropped: u64,
    /// Dropped deliveries
    pub deliveries_dropped: u64,
}

impl NodeMetrics {
    /// Create new metrics collector
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add(counter: &AtomicU64, n: usize) {
        counter.fetch_add(n as u64, Ordering::Relaxed);
    }

    /// Copy all counters
    pub fn snapshot(&self) -> NodeMetricsSnapshot {
        NodeMetricsSnapshot {
            events_received: self.events_received.load(Ordering::Relaxed),
            events_connected: self.events_connected.load(Ordering::Relaxed),
            events_duplicate: self.events_duplicate.load(Ordering::Relaxed),
            events_rejected: self.events_rejected.load(Ordering::Relaxed),
            events_orphaned: self.events_orphaned.load(Ordering::Relaxed),
            heavy_queue_full: self.heavy_queue_full.load(Ordering::Relaxed),
            txs_received: self.txs_received.load(Ordering::Relaxed),
            txs_added: self.txs_added.load(Ordering::Relaxed),
            announces_dropped: self.announces_dropped.load(Ordering::Relaxed),
            deliveries_dropped: self.deliveries_dropped.load(Ordering::Relaxed),
        }
    }
}
