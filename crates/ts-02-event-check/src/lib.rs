//! # Event Check (Subsystem 02)
//!
//! The single validation entry point for every event, local or remote.
//!
//! ## Architecture Role
//!
//! ```text
//! [Stream Leecher 05] ─┐
//! [Items Fetcher 06]  ─┼─→ Checkers::validate(event, parents)
//! [Emitter 03]        ─┘            │
//!                                   ↓  fail-fast, fixed order
//!        Basic → Epoch → Parents → GasPower → Heavy
//!        (cheap, stateless)        (integer)  (signature)
//! ```
//!
//! ## Contract
//!
//! - Checkers never mutate state; they read the epoch snapshot only.
//! - The first failure short-circuits the chain, so the expensive Heavy
//!   check is never spent on an event a cheap check already rejects.
//! - Errors carry the failing checker so callers can attribute penalties.
//! - No input, however malformed, can make a checker panic.

#![warn(missing_docs)]

pub mod batch;
pub mod config;
pub mod domain;
pub mod metrics;
pub mod pipeline;

pub use batch::{BatchError, HeavyCheckPool};
pub use config::HeavyCheckConfig;
pub use domain::basic::BasicChecker;
pub use domain::checker::{Checker, CheckerKind};
pub use domain::epoch::{check_txs, EpochChecker};
pub use domain::errors::{
    BasicError, CheckError, EpochError, GasPowerError, HeavyError, ParentsError,
};
pub use domain::gas_power::GasPowerChecker;
pub use domain::heavy::{sign_event, HeavyChecker};
pub use domain::parents::ParentsChecker;
pub use metrics::Metrics;
pub use pipeline::Checkers;
