//! Allocation parameters of one gas power kind.

use serde::{Deserialize, Serialize};
use shared_types::{GasPowerRules, GasRules};
use std::time::Duration;

/// Accrual parameters for one gas power kind.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GasPowerConfig {
    /// Network-wide allocation per second, split by stake share
    pub alloc_per_sec: u64,
    /// Accrual cap expressed as a period of allocation
    pub max_alloc_period: Duration,
    /// Per-validator floor of the per-second allocation
    pub min_ensured_alloc: u64,
    /// Startup grant expressed as a period of allocation
    pub startup_alloc_period: Duration,
    /// Floor of the startup grant
    pub min_startup_gas: u64,
}

impl GasPowerConfig {
    /// Build from epoch rules. Every validator is ensured enough allocation
    /// to emit at least one maximum-size event per second.
    pub fn from_rules(power: &GasPowerRules, gas: &GasRules) -> Self {
        Self {
            alloc_per_sec: power.alloc_per_sec,
            max_alloc_period: power.max_alloc_period,
            min_ensured_alloc: gas.max_event_gas,
            startup_alloc_period: power.startup_alloc_period,
            min_startup_gas: power.min_startup_gas,
        }
    }

    /// Configs of both kinds, indexed by `GasPowerKind::index`.
    pub fn pair_from_rules(rules: &shared_types::Rules) -> [GasPowerConfig; 2] {
        let eco = &rules.economy;
        [
            Self::from_rules(&eco.short_gas_power, &eco.gas),
            Self::from_rules(&eco.long_gas_power, &eco.gas),
        ]
    }
}
