//! Gas power accrual.

use shared_types::{Event, EventPayload, GasPowerKind, GasPowerLeft, Timestamp, ValidatorId, ValidatorSet};
use std::time::Duration;

use crate::config::GasPowerConfig;
use crate::context::GasPowerContext;

const NANOS_PER_SEC: u128 = 1_000_000_000;

/// Per-validator allocation derived from its stake share.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct ValidatorAllocation {
    /// Gas power accrued per second
    pub per_sec: u64,
    /// Accrual cap
    pub max_gas_power: u64,
    /// Grant for a validator's first event
    pub startup: u64,
}

fn saturate(v: u128) -> u64 {
    u64::try_from(v).unwrap_or(u64::MAX)
}

fn over_period(per_sec: u64, period: Duration) -> u128 {
    u128::from(per_sec) * period.as_nanos() / NANOS_PER_SEC
}

/// Allocation of `validator`. Non-members get nothing.
pub fn calc_validator_gas_power_per_sec(
    validator: ValidatorId,
    validators: &ValidatorSet,
    config: &GasPowerConfig,
) -> ValidatorAllocation {
    let stake = validators.get(validator);
    if stake == 0 || validators.total_weight() == 0 {
        return ValidatorAllocation::default();
    }

    let share = u128::from(config.alloc_per_sec) * u128::from(stake)
        / u128::from(validators.total_weight());
    let per_sec = saturate(share).max(config.min_ensured_alloc);

    let max_gas_power = saturate(over_period(per_sec, config.max_alloc_period));
    let startup = saturate(over_period(per_sec, config.startup_alloc_period)).max(config.min_startup_gas);

    ValidatorAllocation {
        per_sec,
        max_gas_power,
        startup,
    }
}

/// Gas power available to `creator` at `e_time`, having had `prev_left` at
/// `prev_time`.
///
/// First events of a chain (`has_self_parent == false`) are topped up to the
/// startup grant. Time running backwards accrues nothing.
pub fn calc_validator_gas_power(
    creator: ValidatorId,
    has_self_parent: bool,
    e_time: Timestamp,
    prev_time: Timestamp,
    prev_left: u64,
    validators: &ValidatorSet,
    config: &GasPowerConfig,
) -> u64 {
    let alloc = calc_validator_gas_power_per_sec(creator, validators, config);

    let prev_left = if has_self_parent {
        prev_left
    } else {
        prev_left.max(alloc.startup)
    };
    let prev_time = prev_time.min(e_time);

    let elapsed = u128::from(e_time.as_nanos() - prev_time.as_nanos());
    let accrued = saturate(elapsed * u128::from(alloc.per_sec) / NANOS_PER_SEC);

    accrued.saturating_add(prev_left).min(alloc.max_gas_power)
}

/// Gas power available to the creator of `e` before spending, per kind.
///
/// Accrual runs from the self-parent's median time; without a self-parent it
/// runs from the creator's last event of the previous epoch, or from the
/// epoch start with nothing carried over.
pub fn calc_gas_power(
    e: &EventPayload,
    self_parent: Option<&Event>,
    ctx: &GasPowerContext,
) -> GasPowerLeft {
    let mut out = GasPowerLeft::default();
    for kind in GasPowerKind::ALL {
        let (prev_left, prev_time) = match (self_parent, ctx.prev_epoch_event(e.creator)) {
            (Some(parent), _) => (parent.gas_power_left().get(kind), parent.median_time()),
            (None, Some(prev)) => (prev.gas_power_left.get(kind), prev.median_time),
            (None, None) => (0, ctx.epoch_start()),
        };
        out.gas[kind.index()] = calc_validator_gas_power(
            e.creator,
            self_parent.is_some(),
            e.median_time,
            prev_time,
            prev_left,
            ctx.validators(),
            ctx.config(kind),
        );
    }
    out
}
