//! Metrics collection for admission control

use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::SemaphoreError;

/// Counters of one semaphore.
#[derive(Debug, Default)]
pub struct Metrics {
    /// Successful acquisitions
    pub acquired: AtomicU64,

    /// Releases
    pub released: AtomicU64,

    /// Requests rejected on the item ceiling
    pub count_rejections: AtomicU64,

    /// Requests rejected on the byte ceiling
    pub size_rejections: AtomicU64,

    /// Requests that could never fit
    pub oversized_rejections: AtomicU64,

    /// Waits that timed out
    pub timeouts: AtomicU64,

    /// Over-releases detected
    pub release_underflows: AtomicU64,
}

/// Point-in-time copy of [`Metrics`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetricsSnapshot {
    /// Successful acquisitions
    pub acquired: u64,
    /// Releases
    pub released: u64,
    /// Item ceiling rejections
    pub count_rejections: u64,
    /// Byte ceiling rejections
    pub size_rejections: u64,
    /// Never-fitting requests
    pub oversized_rejections: u64,
    /// Wait timeouts
    pub timeouts: u64,
    /// Over-releases
    pub release_underflows: u64,
}

impl Metrics {
    /// Create new metrics collector
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successful acquisition
    pub fn record_acquired(&self) {
        self.acquired.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a release
    pub fn record_released(&self) {
        self.released.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a failure by kind
    pub fn record_error(&self, err: &SemaphoreError) {
        let counter = match err {
            SemaphoreError::CountExceeded { .. } => &self.count_rejections,
            SemaphoreError::SizeExceeded { .. } => &self.size_rejections,
            SemaphoreError::WeightOverLimit { .. } => &self.oversized_rejections,
            SemaphoreError::Timeout { .. } => &self.timeouts,
            SemaphoreError::ReleaseUnderflow { .. } => &self.release_underflows,
            SemaphoreError::Closed { .. } => return,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Copy all counters
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            acquired: self.acquired.load(Ordering::Relaxed),
            released: self.released.load(Ordering::Relaxed),
            count_rejections: self.count_rejections.load(Ordering::Relaxed),
            size_rejections: self.size_rejections.load(Ordering::Relaxed),
            oversized_rejections: self.oversized_rejections.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
            release_underflows: self.release_underflows.load(Ordering::Relaxed),
        }
    }
}
