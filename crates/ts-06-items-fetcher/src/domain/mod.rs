//! Domain layer for the items fetcher

pub mod state;

pub use state::{AnnounceOutcome, BatchId, FetchRequest, FetcherState, PollOutcome};
