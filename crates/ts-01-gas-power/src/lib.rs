//! # Gas Power Model (Subsystem 01)
//!
//! Computes a validator's gas power: a per-validator budget that refills
//! over time in proportion to stake and bounds how much transaction gas the
//! validator may originate.
//!
//! ## Architecture Role
//!
//! ```text
//!                   ┌───────────────────────────┐
//! [Event Check 02] →│ calc_gas_power(e, parent) │← [Emitter 03]
//!                   └─────────────┬─────────────┘
//!                                 │ per kind
//!                                 ↓
//!           calc_validator_gas_power(creator, eTime, prevTime, prevLeft)
//!                                 │
//!                                 ↓
//!           calc_validator_gas_power_per_sec(stake share, config)
//! ```
//!
//! ## Determinism
//!
//! Every computation is integer-only with 128-bit intermediates. Two nodes
//! given the same inputs compute the same allocation bit for bit; the
//! result is consensus-visible through the GasPower checker.

#![warn(missing_docs)]

pub mod allocation;
pub mod config;
pub mod context;
pub mod usage;

pub use allocation::{
    calc_gas_power, calc_validator_gas_power, calc_validator_gas_power_per_sec, ValidatorAllocation,
};
pub use config::GasPowerConfig;
pub use context::GasPowerContext;
pub use usage::calc_gas_power_used;
