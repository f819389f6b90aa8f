//! Configuration for batch signature checking.

use serde::{Deserialize, Serialize};

/// Heavy check worker pool settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeavyCheckConfig {
    /// Worker threads; 0 uses one per CPU
    pub threads: usize,
    /// Maximum events queued or in flight across all batches
    pub max_queued_tasks: usize,
}

impl Default for HeavyCheckConfig {
    fn default() -> Self {
        Self {
            threads: 0,
            max_queued_tasks: 1024,
        }
    }
}

impl HeavyCheckConfig {
    /// Two threads and a small queue for tests.
    pub fn for_testing() -> Self {
        Self {
            threads: 2,
            max_queued_tasks: 16,
        }
    }
}
