//! Emitter configuration

use serde::{Deserialize, Serialize};
use shared_types::ValidatorId;
use std::time::Duration;

use crate::domain::{ThrottleConfig, TurnConfig};
use crate::error::{EmitterError, Result};

/// Emitter configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmitterConfig {
    /// Local validator
    pub validator: ValidatorId,

    /// Minimum time between own events in ms
    pub min_emit_interval_ms: u64,

    /// Maximum time without an own event in ms; empty events are emitted
    /// only once this elapses
    pub max_emit_interval_ms: u64,

    /// Parent cap below the epoch's limit; 0 uses the epoch's limit
    pub max_parents: u32,

    /// Gas power throttling
    pub throttle: ThrottleConfig,

    /// Turn rotation
    pub turn: TurnConfig,
}

impl Default for EmitterConfig {
    fn default() -> Self {
        Self {
            validator: ValidatorId(0),
            min_emit_interval_ms: 110,
            max_emit_interval_ms: 10 * 60 * 1000,
            max_parents: 0,
            throttle: ThrottleConfig::default(),
            turn: TurnConfig::default(),
        }
    }
}

impl EmitterConfig {
    /// Default config for `validator`.
    pub fn for_validator(validator: ValidatorId) -> Self {
        Self {
            validator,
            ..Self::default()
        }
    }

    /// Fast emission for tests.
    pub fn for_testing(validator: ValidatorId) -> Self {
        Self {
            validator,
            min_emit_interval_ms: 10,
            max_emit_interval_ms: 1_000,
            ..Self::default()
        }
    }

    /// Minimum time between own events.
    pub fn min_emit_interval(&self) -> Duration {
        Duration::from_millis(self.min_emit_interval_ms)
    }

    /// Maximum time without an own event.
    pub fn max_emit_interval(&self) -> Duration {
        Duration::from_millis(self.max_emit_interval_ms)
    }

    /// Reject inconsistent settings.
    pub fn validate(&self) -> Result<()> {
        if self.min_emit_interval_ms == 0 {
            return Err(EmitterError::InvalidConfig(
                "min_emit_interval_ms must be positive".into(),
            ));
        }
        if self.max_emit_interval_ms < self.min_emit_interval_ms {
            return Err(EmitterError::InvalidConfig(
                "max_emit_interval_ms below min_emit_interval_ms".into(),
            ));
        }
        if self.turn.period_ms == 0 || self.turn.latency_ms >= self.turn.period_ms {
            return Err(EmitterError::InvalidConfig(
                "turn latency must be shorter than a positive turn period".into(),
            ));
        }
        if self.turn.nonces == 0 {
            return Err(EmitterError::InvalidConfig("turn nonces must be positive".into()));
        }
        Ok(())
    }
}
