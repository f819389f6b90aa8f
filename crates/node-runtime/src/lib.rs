//! # Node Runtime Library
//!
//! Assembles the gossip subsystems into a runnable node. The binary in
//! `main.rs` starts a local network of such nodes.
//!
//! ## Modules
//!
//! - `config/` - `GossipConfig`, the node-wide configuration and its checks
//! - `adapters/` - in-memory DAG, transaction pool, peer set and item retrieval
//! - `genesis/` - first epoch and validator keys of a local network
//! - `node/` - `GossipNode`, the wiring of streams, checkers, fetchers and emitter
//!
//! ## Startup Sequence
//!
//! 1. Load and validate `GossipConfig` (refuse to start when inconsistent)
//! 2. Build the genesis epoch snapshot
//! 3. Build one `GossipNode` per identity and link the peers
//! 4. `GossipNode::run` every node until the shutdown signal

#![warn(missing_docs)]

pub mod adapters;
pub mod config;
pub mod error;
pub mod genesis;
pub mod metrics;
pub mod node;

pub use config::{CacheScale, ConfigError, GossipConfig, PeerConfig, PerStream};
pub use error::NodeError;
pub use genesis::{Genesis, GenesisConfig};
pub use metrics::{NodeMetrics, NodeMetricsSnapshot};
pub use node::{GossipNode, NodeDeps, StreamProtocol};
