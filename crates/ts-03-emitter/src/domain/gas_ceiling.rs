//! How much of an event's gas power may go to transactions.

use serde::{Deserialize, Serialize};
use shared_types::{EventPayload, Rules, ValidatorSet, TX_GAS};
use std::time::Duration;
use ts_01_gas_power::{calc_validator_gas_power, GasPowerConfig};

/// Floor of the pending-gas ceiling.
pub const MIN_MAX_PENDING_GAS: u64 = 15_000_000;

/// Gas power thresholds that throttle transaction inclusion.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThrottleConfig {
    /// Below this much gas power no transactions are added.
    pub no_txs_threshold: u64,
    /// Below this much gas power inclusion is smoothed.
    pub limited_tps_threshold: u64,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            no_txs_threshold: shared_types::DEFAULT_EVENT_GAS * 30,
            limited_tps_threshold: shared_types::DEFAULT_EVENT_GAS * 120,
        }
    }
}

/// Gas the pending-events ceiling allows: a third of a block, at least one
/// event, and never less than [`MIN_MAX_PENDING_GAS`].
pub fn max_pending_gas(rules: &Rules) -> u64 {
    (rules.blocks.max_block_gas / 3)
        .max(rules.economy.gas.max_event_gas)
        .max(MIN_MAX_PENDING_GAS)
}

/// Upper bound on the gas power `e` may spend in total, transactions
/// included.
///
/// The minimum of the event's remaining power, a smoothing ceiling between
/// the two thresholds, and what the pending-gas ceiling still allows.
/// Results below one plain transfer are reported as zero.
pub fn max_gas_power_to_use(
    e: &EventPayload,
    validators: &ValidatorSet,
    rules: &Rules,
    throttle: &ThrottleConfig,
    pending_gas: u64,
) -> u64 {
    let left = e.gas_power_left.min();
    let mut max = rules.economy.gas.max_event_gas.min(left);

    if throttle.limited_tps_threshold > throttle.no_txs_threshold {
        let upper = throttle.limited_tps_threshold;
        let down = throttle.no_txs_threshold;

        let estimate_cfg = GasPowerConfig {
            alloc_per_sec: rules.economy.long_gas_power.alloc_per_sec * 4 / 5,
            max_alloc_period: Duration::from_secs(60),
            min_ensured_alloc: 0,
            startup_alloc_period: Duration::ZERO,
            min_startup_gas: 0,
        };
        let estimated = calc_validator_gas_power(
            e.creator,
            e.self_parent().is_some(),
            e.creation_time,
            e.median_time,
            0,
            validators,
            &estimate_cfg,
        );
        let gpl = left.saturating_add(estimated);
        if gpl < down {
            return 0;
        }
        let new_gpl = gpl.saturating_sub(max);

        // Power above `upper` is spent at full speed, power between the
        // thresholds at half speed.
        let x1 = new_gpl.max(down);
        let x2 = gpl.min(upper);
        let trespassing = x2.saturating_sub(x1);
        let healthy = gpl.saturating_sub(x2);
        max = max.min(healthy + trespassing / 2);
    }

    let max_pending = max_pending_gas(rules);
    if max_pending <= pending_gas {
        return 0;
    }
    max = max.min(max_pending - pending_gas);

    if left <= throttle.no_txs_threshold {
        return 0;
    }
    max = max.min(left - throttle.no_txs_threshold);

    if max < TX_GAS {
        0
    } else {
        max
    }
}
