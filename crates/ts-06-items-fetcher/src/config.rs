//! Fetcher configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Announcement tracking and request batching limits.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetcherConfig {
    /// Drop a hash from tracking this long after its first announcement, in ms
    pub forget_timeout_ms: u64,
    /// Consider a request failed after this long without the item, in ms
    pub arrive_timeout_ms: u64,
    /// Collect announcements this long before requesting, in ms
    pub gather_slack_ms: u64,
    /// Hashes one peer may have pending at once
    pub hash_limit: usize,
    /// Hashes per request
    pub max_batch: usize,
    /// Notification batches queued before the fetcher reports overload
    pub max_queued_batches: usize,
    /// Requests outstanding at once
    pub max_parallel_requests: usize,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            forget_timeout_ms: 60_000,
            arrive_timeout_ms: 1_000,
            gather_slack_ms: 100,
            hash_limit: 10_000,
            max_batch: 512,
            max_queued_batches: 32,
            max_parallel_requests: 64,
        }
    }
}

impl FetcherConfig {
    /// Event fetcher defaults: events take longer to arrive and are
    /// requested from more peers at once.
    pub fn for_dag() -> Self {
        Self {
            arrive_timeout_ms: 4_000,
            max_parallel_requests: 192,
            ..Self::default()
        }
    }

    /// Transaction fetcher defaults.
    pub fn for_txs() -> Self {
        Self::default()
    }

    /// Short timeouts for tests.
    pub fn for_testing() -> Self {
        Self {
            forget_timeout_ms: 2_000,
            arrive_timeout_ms: 300,
            gather_slack_ms: 50,
            hash_limit: 100,
            max_batch: 4,
            max_queued_batches: 8,
            max_parallel_requests: 4,
        }
    }

    /// Batch sizes scaled by `target / base`, never below one.
    pub fn scaled(&self, target: u64, base: u64) -> Self {
        let scale = |v: usize| -> usize {
            if base == 0 {
                return v;
            }
            ((v as u128 * target as u128 / base as u128) as usize).max(1)
        };
        Self {
            max_batch: scale(self.max_batch),
            max_queued_batches: scale(self.max_queued_batches),
            ..self.clone()
        }
    }

    /// Forget timeout.
    pub fn forget_timeout(&self) -> Duration {
        Duration::from_millis(self.forget_timeout_ms)
    }

    /// Arrive timeout.
    pub fn arrive_timeout(&self) -> Duration {
        Duration::from_millis(self.arrive_timeout_ms)
    }

    /// Gather slack.
    pub fn gather_slack(&self) -> Duration {
        Duration::from_millis(self.gather_slack_ms)
    }

    /// Check internal consistency.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_batch == 0 || self.max_parallel_requests == 0 || self.max_queued_batches == 0 {
            return Err("fetcher batch and parallelism limits must be positive".into());
        }
        if self.hash_limit == 0 {
            return Err("fetcher hash_limit must be positive".into());
        }
        if self.arrive_timeout_ms >= self.forget_timeout_ms {
            return Err(format!(
                "arrive timeout {}ms must be shorter than forget timeout {}ms",
                self.arrive_timeout_ms, self.forget_timeout_ms
            ));
        }
        Ok(())
    }
}
