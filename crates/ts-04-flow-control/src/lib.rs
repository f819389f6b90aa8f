//! # Flow Control (Subsystem 04)
//!
//! Dual-dimension admission control. A [`DataSemaphore`] bounds how many
//! items and how many bytes may be outstanding at once; every stream,
//! processor and message buffer of the node acquires from one before
//! buffering data. It is the node's primary backpressure valve.
//!
//! ## Architecture Role
//!
//! ```text
//! [Stream Leecher] ──acquire(chunk)──→ ┌──────────────────┐
//! [Stream Seeder]  ──acquire(resp)───→ │  DataSemaphore   │ ← release on apply/send
//! [Msg handlers]   ──acquire(msg)────→ │ (num, size) caps │
//!                                      └──────────────────┘
//! ```
//!
//! ## Guarantees
//!
//! - An acquire that would exceed either ceiling never succeeds.
//! - A failed acquire leaves the counters untouched.
//! - Count is checked before size, so a request exceeding both reports
//!   [`SemaphoreError::CountExceeded`].
//! - Releases must match acquisitions; an over-release is reported as
//!   [`SemaphoreError::ReleaseUnderflow`] instead of corrupting counters.

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod limits;
pub mod metrics;
pub mod semaphore;

pub use config::SemaphoreConfig;
pub use error::{Result, SemaphoreError};
pub use limits::{HARD_LIMIT_ITEMS, PROTOCOL_MAX_MSG_SIZE, SOFT_LIMIT_ITEMS};
pub use metrics::Metrics;
pub use semaphore::{DataSemaphore, SemaphorePermit};
