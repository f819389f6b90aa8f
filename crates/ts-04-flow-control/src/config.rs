//! Configuration for the node-wide semaphores.

use serde::{Deserialize, Serialize};
use shared_types::Metric;
use std::time::Duration;

const MIB: u64 = 1024 * 1024;

/// Ceilings of the three independent semaphores.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SemaphoreConfig {
    /// Generic inbound message buffering
    pub msgs_limit: Metric,
    /// Event gossip and DAG stream chunks
    pub events_limit: Metric,
    /// Block vote gossip and vote stream chunks
    pub bvs_limit: Metric,
    /// Maximum wait for message capacity in ms
    pub msgs_timeout_ms: u64,
}

impl Default for SemaphoreConfig {
    fn default() -> Self {
        Self {
            msgs_limit: Metric::new(1000, 30 * MIB),
            events_limit: Metric::new(10_000, 30 * MIB),
            bvs_limit: Metric::new(5000, 15 * MIB),
            msgs_timeout_ms: 10_000,
        }
    }
}

impl SemaphoreConfig {
    /// Maximum wait for message capacity.
    pub fn msgs_timeout(&self) -> Duration {
        Duration::from_millis(self.msgs_timeout_ms)
    }

    /// Ceilings scaled by `target / base`.
    pub fn scaled(&self, target: u64, base: u64) -> Self {
        Self {
            msgs_limit: self.msgs_limit.scaled(target, base),
            events_limit: self.events_limit.scaled(target, base),
            bvs_limit: self.bvs_limit.scaled(target, base),
            msgs_timeout_ms: self.msgs_timeout_ms,
        }
    }

    /// Small ceilings and a short timeout for tests.
    pub fn for_testing() -> Self {
        Self {
            msgs_limit: Metric::new(100, 4 * MIB),
            events_limit: Metric::new(1000, 24 * MIB),
            bvs_limit: Metric::new(500, 24 * MIB),
            msgs_timeout_ms: 200,
        }
    }
}
