//! # Items Fetcher (Subsystem 06)
//!
//! Turns hash announcements from peers into batched item requests. One
//! instance fetches events, another transactions.
//!
//! ## Architecture Role
//!
//! ```text
//! [Peer announces] ──notify_announces──→ ┌─────────────────────┐
//!                                        │ FetcherState        │──request_items──→ [Peer]
//! [Item processed] ──notify_received───→ │ gather → fetch →    │
//!                                        │ timeout → forget    │
//!                                        └─────────────────────┘
//! ```
//!
//! ## Timing
//!
//! - **Gather slack**: announcements are collected for a short window so
//!   one request carries many hashes.
//! - **Arrive timeout**: an unanswered request fails and the hash is asked
//!   from another announcer.
//! - **Forget timeout**: a hash is dropped a fixed time after its first
//!   announcement, whatever happened.
//!
//! Requests per peer are capped by `max_batch`, outstanding requests by
//! `max_parallel_requests`, and pending hashes per peer by `hash_limit`.

#![warn(missing_docs)]

pub mod config;
pub mod domain;
pub mod error;
pub mod metrics;
pub mod ports;
pub mod service;

pub use config::FetcherConfig;
pub use domain::{AnnounceOutcome, BatchId, FetchRequest, FetcherState, PollOutcome};
pub use error::{FetcherError, Result};
pub use metrics::{Metrics, MetricsSnapshot};
pub use ports::{FetcherApi, ItemRequester, KnownItems};
pub use service::ItemsFetcher;
