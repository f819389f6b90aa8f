//! Metrics collection for event validation

use std::sync::atomic::{AtomicU64, Ordering};

use crate::domain::errors::CheckError;

/// Validation outcome counters, one per rejecting checker.
#[derive(Debug, Default)]
pub struct Metrics {
    /// Events that passed every stage
    pub accepted: AtomicU64,
    /// Rejected by Basic
    pub rejected_basic: AtomicU64,
    /// Rejected by Epoch
    pub rejected_epoch: AtomicU64,
    /// Rejected by Parents
    pub rejected_parents: AtomicU64,
    /// Rejected by GasPower
    pub rejected_gas_power: AtomicU64,
    /// Rejected by Heavy
    pub rejected_heavy: AtomicU64,
}

/// Point-in-time copy of [`Metrics`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetricsSnapshot {
    /// Accepted events
    pub accepted: u64,
    /// Basic rejections
    pub rejected_basic: u64,
    /// Epoch rejections
    pub rejected_epoch: u64,
    /// Parents rejections
    pub rejected_parents: u64,
    /// GasPower rejections
    pub rejected_gas_power: u64,
    /// Heavy rejections
    pub rejected_heavy: u64,
}

impl Metrics {
    /// Create new metrics collector
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an accepted event
    pub fn record_accepted(&self) {
        self.accepted.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a rejection under the failing checker
    pub fn record_rejected(&self, err: &CheckError) {
        let counter = match err {
            CheckError::Basic(_) => &self.rejected_basic,
            CheckError::Epoch(_) => &self.rejected_epoch,
            CheckError::Parents(_) => &self.rejected_parents,
            CheckError::GasPower(_) => &self.rejected_gas_power,
            CheckError::Heavy(_) => &self.rejected_heavy,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Copy all counters
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            accepted: self.accepted.load(Ordering::Relaxed),
            rejected_basic: self.rejected_basic.load(Ordering::Relaxed),
            rejected_epoch: self.rejected_epoch.load(Ordering::Relaxed),
            rejected_parents: self.rejected_parents.load(Ordering::Relaxed),
            rejected_gas_power: self.rejected_gas_power.load(Ordering::Relaxed),
            rejected_heavy: self.rejected_heavy.load(Ordering::Relaxed),
        }
    }
}
