//! Turn-based transaction origination.
//!
//! Every transaction has exactly one validator entitled to include it in a
//! given round. Rounds rotate every `period` through a stake-weighted
//! permutation seeded by the transaction's sender, nonce bucket and epoch,
//! so any third party can recompute the originator from public data.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use shared_types::{Address, Epoch, Hash, Timestamp, ValidatorId, ValidatorSet};
use std::time::Duration;

use super::offline::OfflineValidators;
use super::permutation::weighted_permutation;

/// Turn rotation parameters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TurnConfig {
    /// Length of one round, in milliseconds.
    pub period_ms: u64,
    /// Guard band before a round boundary, in milliseconds.
    pub latency_ms: u64,
    /// Consecutive nonces of a sender sharing one permutation.
    pub nonces: u64,
}

impl Default for TurnConfig {
    fn default() -> Self {
        Self {
            period_ms: 8_000,
            latency_ms: 1_000,
            nonces: 32,
        }
    }
}

impl TurnConfig {
    /// Round length.
    pub fn period(&self) -> Duration {
        Duration::from_millis(self.period_ms)
    }

    /// Guard band.
    pub fn latency(&self) -> Duration {
        Duration::from_millis(self.latency_ms)
    }
}

/// Outcome of the originator selection for one transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TurnDecision {
    /// The round is about to change; nobody originates.
    RoundChanging,
    /// The first online validator of the walk.
    Originator {
        /// Entitled validator
        validator: ValidatorId,
        /// Offline validators skipped before it
        skipped_offline: usize,
    },
    /// Every validator from the round index onward is offline.
    Exhausted {
        /// Offline validators skipped
        skipped_offline: usize,
    },
}

impl TurnDecision {
    /// Offline validators skipped during the walk.
    pub fn skipped_offline(&self) -> usize {
        match self {
            TurnDecision::RoundChanging => 0,
            TurnDecision::Originator {
                skipped_offline, ..
            }
            | TurnDecision::Exhausted { skipped_offline } => *skipped_offline,
        }
    }

    /// Whether `me` is entitled to originate.
    pub fn is(&self, me: ValidatorId) -> bool {
        matches!(self, TurnDecision::Originator { validator, .. } if *validator == me)
    }
}

/// Inputs shared by every transaction of one scheduling pass.
#[derive(Clone, Copy)]
pub struct TurnContext<'a> {
    /// Active validators
    pub validators: &'a ValidatorSet,
    /// Epoch of the event under construction
    pub epoch: Epoch,
    /// Liveness view
    pub offline: &'a OfflineValidators,
    /// Rotation parameters
    pub config: &'a TurnConfig,
}

/// First-seen time of a transaction, derived from its hash so that every
/// node agrees on it.
pub fn tx_time(tx_hash: &Hash, period: Duration) -> Timestamp {
    let period_ns = u64::try_from(period.as_nanos()).unwrap_or(u64::MAX).max(1);
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&tx_hash[..8]);
    Timestamp::from_nanos(u64::from_be_bytes(prefix) % period_ns)
}

/// Round index of a transaction first seen at `tx_time`, among
/// `validators_num` validators.
pub fn tx_round_index(
    now: Timestamp,
    tx_time: Timestamp,
    validators_num: usize,
    period: Duration,
) -> usize {
    if validators_num == 0 {
        return 0;
    }
    let period_ns = period.as_nanos().max(1);
    let passed = now.saturating_duration_since(tx_time).as_nanos();
    ((passed / period_ns) % validators_num as u128) as usize
}

/// Seed of the permutation shared by a sender's nonce bucket in one epoch:
/// `sha256(sender || be_u64(nonce / nonces) || be_u32(epoch))`.
pub fn turn_seed(sender: &Address, nonce: u64, nonces: u64, epoch: Epoch) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update(sender);
    hasher.update((nonce / nonces.max(1)).to_be_bytes());
    hasher.update(epoch.0.to_be_bytes());
    hasher.finalize().into()
}

/// Select the validator entitled to originate a transaction at `now`.
pub fn tx_turn_originator(
    tx_hash: &Hash,
    sender: &Address,
    nonce: u64,
    now: Timestamp,
    ctx: &TurnContext<'_>,
) -> TurnDecision {
    let n = ctx.validators.len();
    if n == 0 {
        return TurnDecision::Exhausted { skipped_offline: 0 };
    }

    let period = ctx.config.period();
    let first_seen = tx_time(tx_hash, period);
    let round = tx_round_index(now, first_seen, n, period);
    let ahead = now.saturating_add(ctx.config.latency());
    if tx_round_index(ahead, first_seen, n, period) != round {
        return TurnDecision::RoundChanging;
    }

    let seed = turn_seed(sender, nonce, ctx.config.nonces, ctx.epoch);
    let weights = ctx.validators.sorted_weights();
    // Set members always carry positive weight.
    let Ok(order) = weighted_permutation(n, &weights, seed) else {
        return TurnDecision::Exhausted { skipped_offline: 0 };
    };

    let mut skipped_offline = 0;
    for idx in &order[round..] {
        let Some(validator) = ctx.validators.get_id(*idx) else {
            continue;
        };
        if ctx.offline.contains(validator) {
            skipped_offline += 1;
            continue;
        }
        return TurnDecision::Originator {
            validator,
            skipped_offline,
        };
    }
    TurnDecision::Exhausted { skipped_offline }
}

/// Whether `me` may originate the transaction at `now`.
pub fn is_my_tx_turn(
    tx_hash: &Hash,
    sender: &Address,
    nonce: u64,
    now: Timestamp,
    me: ValidatorId,
    ctx: &TurnContext<'_>,
) -> bool {
    tx_turn_originator(tx_hash, sender, nonce, now, ctx).is(me)
}
