//! # Node Configuration
//!
//! One [`GossipConfig`] holds the settings of every gossip subsystem. It is
//! read from a JSON file, missing fields falling back to the defaults, and
//! checked by [`GossipConfig::validate`] before anything starts.
//!
//! ## Startup Checks
//!
//! - A default chunk must stay below the protocol's hard item limit and
//!   within half the maximum message size.
//! - Each stream semaphore must hold at least two chunks of its stream, so
//!   one chunk in flight never starves the next.
//! - The events semaphore must hold two session buffers and two maximum
//!   messages; the message semaphore one maximum message.

use serde::{Deserialize, Serialize};
use shared_types::{Metric, ValidatorId};
use std::path::Path;
use thiserror::Error;
use ts_02_event_check::HeavyCheckConfig;
use ts_03_emitter::EmitterConfig;
use ts_04_flow_control::{SemaphoreConfig, HARD_LIMIT_ITEMS, PROTOCOL_MAX_MSG_SIZE};
use ts_05_stream_sync::{LeecherConfig, SeederConfig, StreamKind};
use ts_06_items_fetcher::FetcherConfig;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A chunk holds more items than one message may carry.
    #[error("{stream} chunk of {num} items exceeds {max}")]
    ChunkTooManyItems {
        /// Stream
        stream: StreamKind,
        /// Configured items per chunk
        num: u64,
        /// Largest allowed
        max: u64,
    },

    /// A chunk is larger than half a maximum message.
    #[error("{stream} chunk of {size} bytes exceeds {max}")]
    ChunkTooLarge {
        /// Stream
        stream: StreamKind,
        /// Configured bytes per chunk
        size: u64,
        /// Largest allowed
        max: u64,
    },

    /// A semaphore cannot hold two of something it must buffer.
    #[error("{semaphore} semaphore {limit} must be at least twice {what} {unit}")]
    SemaphoreTooSmall {
        /// Semaphore name
        semaphore: &'static str,
        /// Configured ceiling
        limit: Metric,
        /// What it must hold
        what: &'static str,
        /// Size of one of them
        unit: Metric,
    },

    /// A byte ceiling below the maximum message size.
    #[error("{what} of {size} bytes must be at least {min}")]
    BelowMessageSize {
        /// Offending limit
        what: &'static str,
        /// Configured bytes
        size: u64,
        /// Required minimum
        min: u64,
    },

    /// A subsystem rejected its own section.
    #[error("{section}: {reason}")]
    Section {
        /// Config section
        section: String,
        /// Subsystem's reason
        reason: String,
    },

    /// The config file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// File path
        path: String,
        /// Cause
        source: std::io::Error,
    },

    /// The config file is not valid JSON for this schema.
    #[error("failed to parse {path}: {source}")]
    Parse {
        /// File path
        path: String,
        /// Cause
        source: serde_json::Error,
    },
}

/// Ratio applied to count and size defaults, tracking the memory budget
/// the operator gives the node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheScale {
    /// Budget the defaults were tuned for
    pub base: u64,
    /// Budget of this node
    pub target: u64,
}

impl CacheScale {
    /// Defaults as tuned.
    pub const IDENTITY: CacheScale = CacheScale { base: 1, target: 1 };

    /// `target / base` scaling.
    pub const fn ratio(target: u64, base: u64) -> Self {
        Self { base, target }
    }

    /// Scale a count.
    pub fn u64(&self, v: u64) -> u64 {
        Metric::new(v, 0).scaled(self.target, self.base).num
    }

    /// Scale a metric.
    pub fn metric(&self, m: Metric) -> Metric {
        m.scaled(self.target, self.base)
    }
}

impl Default for CacheScale {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// One setting per replicated stream.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, bound(deserialize = "T: Deserialize<'de> + Default"))]
pub struct PerStream<T> {
    /// DAG events
    pub events: T,
    /// Block votes
    pub bvs: T,
    /// Block records
    pub brs: T,
    /// Epoch packs
    pub eps: T,
}

impl<T: Default> Default for PerStream<T> {
    fn default() -> Self {
        Self {
            events: T::default(),
            bvs: T::default(),
            brs: T::default(),
            eps: T::default(),
        }
    }
}

impl<T> PerStream<T> {
    /// Same value for every stream.
    pub fn uniform(value: T) -> Self
    where
        T: Clone,
    {
        Self {
            events: value.clone(),
            bvs: value.clone(),
            brs: value.clone(),
            eps: value,
        }
    }

    /// Setting of `kind`.
    pub fn get(&self, kind: StreamKind) -> &T {
        match kind {
            StreamKind::Events => &self.events,
            StreamKind::BlockVotes => &self.bvs,
            StreamKind::BlockRecords => &self.brs,
            StreamKind::EpochPacks => &self.eps,
        }
    }

    /// Mutable setting of `kind`.
    pub fn get_mut(&mut self, kind: StreamKind) -> &mut T {
        match kind {
            StreamKind::Events => &mut self.events,
            StreamKind::BlockVotes => &mut self.bvs,
            StreamKind::BlockRecords => &mut self.brs,
            StreamKind::EpochPacks => &mut self.eps,
        }
    }
}

/// Peer bookkeeping.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PeerConfig {
    /// Penalties after which a peer is dropped
    pub max_penalties: u32,
}

impl Default for PeerConfig {
    fn default() -> Self {
        Self { max_penalties: 3 }
    }
}

/// Complete gossip configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GossipConfig {
    /// Node-wide admission ceilings
    pub semaphores: SemaphoreConfig,
    /// Pull side of each stream
    pub leechers: PerStream<LeecherConfig>,
    /// Serving side of each stream
    pub seeders: PerStream<SeederConfig>,
    /// Announced event retrieval
    pub dag_fetcher: FetcherConfig,
    /// Announced transaction retrieval
    pub tx_fetcher: FetcherConfig,
    /// Local event creation
    pub emitter: EmitterConfig,
    /// Signature batch pool
    pub heavy_check: HeavyCheckConfig,
    /// Peer penalties
    pub peers: PeerConfig,
    /// Queued inbound item batches awaiting processing
    pub inbound_queue: usize,
}

impl Default for GossipConfig {
    fn default() -> Self {
        Self::default_scaled(CacheScale::IDENTITY)
    }
}

impl GossipConfig {
    /// Defaults sized for `scale`.
    pub fn default_scaled(scale: CacheScale) -> Self {
        let mut leechers = PerStream::uniform(LeecherConfig::default());
        leechers.events = LeecherConfig::for_dag();

        let seeder = SeederConfig {
            max_pending_responses: scale.metric(SeederConfig::default().max_pending_responses),
            ..SeederConfig::default()
        };

        Self {
            semaphores: SemaphoreConfig::default().scaled(scale.target, scale.base),
            leechers,
            seeders: PerStream::uniform(seeder),
            dag_fetcher: FetcherConfig::for_dag().scaled(scale.target, scale.base),
            tx_fetcher: FetcherConfig::for_txs().scaled(scale.target, scale.base),
            emitter: EmitterConfig::default(),
            heavy_check: HeavyCheckConfig::default(),
            peers: PeerConfig::default(),
            inbound_queue: scale.u64(256).max(1) as usize,
        }
    }

    /// Small, fast settings for tests and local networks.
    pub fn for_testing(validator: ValidatorId) -> Self {
        let mut semaphores = SemaphoreConfig::for_testing();
        semaphores.msgs_limit.size = PROTOCOL_MAX_MSG_SIZE;
        let mut leechers = PerStream::uniform(LeecherConfig::for_testing());
        leechers.events.session_buffer.size = PROTOCOL_MAX_MSG_SIZE;

        Self {
            semaphores,
            leechers,
            seeders: PerStream::uniform(SeederConfig::for_testing()),
            dag_fetcher: FetcherConfig::for_testing(),
            tx_fetcher: FetcherConfig::for_testing(),
            emitter: EmitterConfig::for_testing(validator),
            heavy_check: HeavyCheckConfig::for_testing(),
            peers: PeerConfig::default(),
            inbound_queue: 16,
        }
    }

    /// Read from a JSON file. Absent fields keep their defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let display = path.display().to_string();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: display.clone(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: display,
            source,
        })
    }

    /// Semaphore ceiling a stream's leecher draws from.
    pub fn stream_semaphore(&self, kind: StreamKind) -> Metric {
        match kind {
            StreamKind::Events => self.semaphores.events_limit,
            StreamKind::BlockVotes => self.semaphores.bvs_limit,
            StreamKind::BlockRecords | StreamKind::EpochPacks => self.semaphores.msgs_limit,
        }
    }

    /// Reject settings that break protocol limits or can deadlock.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for kind in StreamKind::ALL {
            let leecher = self.leechers.get(kind);
            let chunk = leecher.chunk_limit();
            if chunk.num > HARD_LIMIT_ITEMS - 1 {
                return Err(ConfigError::ChunkTooManyItems {
                    stream: kind,
                    num: chunk.num,
                    max: HARD_LIMIT_ITEMS - 1,
                });
            }
            if chunk.size > PROTOCOL_MAX_MSG_SIZE / 2 {
                return Err(ConfigError::ChunkTooLarge {
                    stream: kind,
                    size: chunk.size,
                    max: PROTOCOL_MAX_MSG_SIZE / 2,
                });
            }
            let limit = self.stream_semaphore(kind);
            if !chunk.saturating_mul(2).fits_in(&limit) {
                return Err(ConfigError::SemaphoreTooSmall {
                    semaphore: semaphore_name(kind),
                    limit,
                    what: "the default chunk",
                    unit: chunk,
                });
            }
            leecher.validate().map_err(|reason| ConfigError::Section {
                section: format!("leechers.{}", kind.as_str()),
                reason,
            })?;
        }

        let events = self.semaphores.events_limit;
        let buffer = self.leechers.events.session_buffer;
        if !buffer.saturating_mul(2).fits_in(&events) {
            return Err(ConfigError::SemaphoreTooSmall {
                semaphore: "events",
                limit: events,
                what: "the session buffer",
                unit: buffer,
            });
        }
        if events.size < 2 * PROTOCOL_MAX_MSG_SIZE {
            return Err(ConfigError::BelowMessageSize {
                what: "events semaphore",
                size: events.size,
                min: 2 * PROTOCOL_MAX_MSG_SIZE,
            });
        }
        if self.semaphores.msgs_limit.size < PROTOCOL_MAX_MSG_SIZE {
            return Err(ConfigError::BelowMessageSize {
                what: "msgs semaphore",
                size: self.semaphores.msgs_limit.size,
                min: PROTOCOL_MAX_MSG_SIZE,
            });
        }
        if buffer.size < PROTOCOL_MAX_MSG_SIZE {
            return Err(ConfigError::BelowMessageSize {
                what: "events session buffer",
                size: buffer.size,
                min: PROTOCOL_MAX_MSG_SIZE,
            });
        }

        for (section, fetcher) in [("dag_fetcher", &self.dag_fetcher), ("tx_fetcher", &self.tx_fetcher)] {
            fetcher.validate().map_err(|reason| ConfigError::Section {
                section: section.to_string(),
                reason,
            })?;
        }
        self.emitter.validate().map_err(|e| ConfigError::Section {
            section: "emitter".to_string(),
            reason: e.to_string(),
        })?;
        if self.inbound_queue == 0 {
            return Err(ConfigError::Section {
                section: "inbound_queue".to_string(),
                reason: "must be positive".to_string(),
            });
        }
        Ok(())
    }
}

fn semaphore_name(kind: StreamKind) -> &'static str {
    match kind {
        StreamKind::Events => "events",
        StreamKind::BlockVotes => "bvs",
        StreamKind::BlockRecords | StreamKind::EpochPacks => "msgs",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        GossipConfig::default().validate().unwrap();
        GossipConfig::default_scaled(CacheScale::ratio(4, 1)).validate().unwrap();
        GossipConfig::for_testing(ValidatorId(1)).validate().unwrap();
    }

    #[test]
    fn test_dag_stream_has_shorter_restart_ceiling() {
        let config = GossipConfig::default();
        assert_eq!(config.leechers.events.max_session_restart_ms, 240_000);
        assert_eq!(config.leechers.bvs.max_session_restart_ms, 300_000);
        assert_eq!(config.dag_fetcher.arrive_timeout_ms, 4_000);
        assert_eq!(config.dag_fetcher.hash_limit, 10_000);
        assert_eq!(config.tx_fetcher.max_parallel_requests, 64);
    }

    #[test]
    fn test_scale_applies_to_counts_and_sizes() {
        let config = GossipConfig::default_scaled(CacheScale::ratio(2, 1));
        assert_eq!(config.semaphores.events_limit, Metric::new(20_000, 60 * 1024 * 1024));
        assert_eq!(config.dag_fetcher.max_batch, 1024);
        assert_eq!(config.tx_fetcher.max_queued_batches, 64);
    }

    #[test]
    fn test_rejects_chunk_at_hard_limit() {
        let mut config = GossipConfig::default();
        config.leechers.bvs.chunk_num = HARD_LIMIT_ITEMS;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ChunkTooManyItems { stream: StreamKind::BlockVotes, .. })
        ));
    }

    #[test]
    fn test_rejects_chunk_over_half_message() {
        let mut config = GossipConfig::default();
        config.leechers.eps.chunk_size = PROTOCOL_MAX_MSG_SIZE / 2 + 1;
        assert!(matches!(config.validate(), Err(ConfigError::ChunkTooLarge { .. })));
    }

    #[test]
    fn test_rejects_semaphore_below_two_chunks() {
        let mut config = GossipConfig::default();
        config.semaphores.bvs_limit = Metric::new(999, 15 * 1024 * 1024);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::SemaphoreTooSmall { semaphore: "bvs", .. })
        ));
    }

    #[test]
    fn test_rejects_events_semaphore_below_two_buffers() {
        let mut config = GossipConfig::default();
        config.semaphores.events_limit.num = 2 * config.leechers.events.session_buffer.num - 1;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::SemaphoreTooSmall { what: "the session buffer", .. })
        ));
    }

    #[test]
    fn test_rejects_small_msgs_semaphore() {
        let mut config = GossipConfig::default();
        config.semaphores.msgs_limit.size = PROTOCOL_MAX_MSG_SIZE - 1;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::BelowMessageSize { what: "msgs semaphore", .. })
        ));
    }

    #[test]
    fn test_section_errors_name_the_section() {
        let mut config = GossipConfig::default();
        config.tx_fetcher.max_batch = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().starts_with("tx_fetcher:"));
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: GossipConfig = serde_json::from_str(
            r#"{"emitter": {"validator": 3}, "leechers": {"bvs": {"chunk_num": 100}}}"#,
        )
        .unwrap();
        assert_eq!(config.emitter.validator, ValidatorId(3));
        assert_eq!(config.leechers.bvs.chunk_num, 100);
        assert_eq!(config.leechers.events, LeecherConfig::default());
        config.validate().unwrap();
    }

    #[test]
    fn test_load_reports_path() {
        let err = GossipConfig::load(Path::new("/nonexistent/tessera.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
        assert!(err.to_string().contains("/nonexistent/tessera.json"));
    }
}
