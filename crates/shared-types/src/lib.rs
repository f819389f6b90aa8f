//! # Shared Types Crate
//!
//! Domain entities shared by every Tessera gossip subsystem.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: all cross-crate types are defined here.
//! - **Immutable snapshots**: validator sets and rules are per-epoch values
//!   behind `Arc`, swapped wholesale and never mutated in place.
//! - **Integer time**: timestamps are nanoseconds in `u64`; nothing on a
//!   consensus-visible path uses floating point.

pub mod entities;
pub mod epoch;
pub mod errors;
pub mod event;
pub mod hashing;
pub mod metric;
pub mod rules;
pub mod time;
pub mod validators;

pub use entities::*;
pub use epoch::{EpochReader, EpochSnapshot, PrevEpochEvent, SnapshotCell};
pub use errors::*;
pub use event::{calc_payload_hash, Event, EventPayload, GasPowerKind, GasPowerLeft, GAS_POWER_KINDS};
pub use hashing::{keccak256, Keccak};
pub use metric::Metric;
pub use rules::{BlocksRules, DagRules, EconomyRules, GasPowerRules, GasRules, Rules, DEFAULT_EVENT_GAS};
pub use time::{FixedTimeSource, SystemTimeSource, TimeSource, Timestamp};
pub use validators::{ValidatorProfile, ValidatorSet, ValidatorSetError, Weight};
