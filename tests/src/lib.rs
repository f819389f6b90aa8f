//! # Tessera Test Suite
//!
//! Cross-subsystem flows that no single crate can test on its own.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! ├── fixtures.rs       # Devnet genesis, emitters over in-memory DAGs
//! └── integration/
//!     ├── pipeline.rs   # Emitter output through the checkers
//!     ├── stream_sync.rs# Leecher <-> seeder over the events stream
//!     ├── flow_control.rs # Shared semaphores under contention
//!     ├── fetching.rs   # Announce -> request -> delivery
//!     └── network.rs    # Several GossipNodes in one process
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p ts-tests
//! cargo test -p ts-tests integration::network
//! ```

#![allow(dead_code)]

#[cfg(test)]
mod fixtures;
#[cfg(test)]
mod integration;
