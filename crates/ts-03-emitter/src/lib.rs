//! # Emitter (Subsystem 03)
//!
//! Builds this validator's own events: picks parents, accounts gas power,
//! schedules transactions fairly and hands finished events to gossip.
//!
//! ## Architecture Role
//!
//! ```text
//!  [TxPool] ──pending──┐            ┌──heads / last own──[DagReader]
//!                      ↓            ↓
//!                  Emitter::create_event(now)
//!                      │
//!      choose_parents → calc_gas_power → max_gas_power_to_use
//!                      │
//!      add_txs: epoch rules → gas ceiling → sender conflict
//!               → tx turn (weighted permutation) → still pooled
//!                      │
//!              sign → Checkers::validate (self-check)
//!                      ↓
//!              [EventBroadcaster] → gossip
//! ```
//!
//! ## Turn Fairness
//!
//! Each transaction has one entitled originator per round. Rounds last
//! `TurnConfig::period_ms` and rotate through a stake-weighted permutation
//! seeded by `keccak(sender ‖ nonce / nonces ‖ epoch)`. Validators in
//! [`OfflineValidators`] are skipped; near a round boundary nobody
//! originates.
//!
//! ## Gas Ceiling
//!
//! Transactions may use no more than the minimum of the event's remaining
//! gas power, a smoothing ceiling between `no_txs_threshold` and
//! `limited_tps_threshold`, and the room left under the pending-gas
//! ceiling. At or below `no_txs_threshold` nothing is added.

#![warn(missing_docs)]

pub mod adapters;
pub mod config;
pub mod domain;
pub mod error;
pub mod metrics;
pub mod ports;
pub mod service;

pub use adapters::LocalKeySigner;
pub use config::EmitterConfig;
pub use domain::{
    add_txs, is_my_tx_turn, max_gas_power_to_use, tx_round_index, tx_time, tx_turn_originator,
    weighted_permutation, AddTxsReport, OfflineValidators, OriginatedTxs, ThrottleConfig,
    TurnConfig, TurnContext, TurnDecision, TxsByPriceAndNonce,
};
pub use error::{EmitterError, Result};
pub use metrics::{Metrics, MetricsSnapshot};
pub use ports::{DagReader, EmitterApi, EmitterStatus, EventBroadcaster, EventSigner, TxPool};
pub use service::{Emitter, EmitterDeps};
