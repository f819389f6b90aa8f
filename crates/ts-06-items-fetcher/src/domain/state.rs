//! Announcement tracking.
//!
//! Pure state: every method takes the current time, so the fetcher loop
//! and the tests drive it the same way. A hash moves through
//! `announced → fetching → (received | timed out → announced)` and is
//! forgotten a fixed time after its first announcement whatever happened.

use shared_types::{Hash, PeerId};
use std::collections::HashMap;
use tokio::time::Instant;

use crate::config::FetcherConfig;

/// Identifier of a batched request.
pub type BatchId = u64;

#[derive(Debug, Clone, Copy)]
struct InFlight {
    peer: PeerId,
    batch: BatchId,
    since: Instant,
}

#[derive(Debug)]
struct Tracked {
    first_seen: Instant,
    announcers: Vec<PeerId>,
    tried: Vec<PeerId>,
    fetching: Option<InFlight>,
}

impl Tracked {
    fn next_peer(&self) -> Option<PeerId> {
        self.announcers
            .iter()
            .find(|p| !self.tried.contains(p))
            .copied()
    }
}

/// A batched request to issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    /// Batch identifier, reported back on failure
    pub batch: BatchId,
    /// Peer to ask
    pub peer: PeerId,
    /// Requested hashes
    pub hashes: Vec<Hash>,
}

/// What happened to an announcement batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnnounceOutcome {
    /// Newly tracked (hash, peer) pairs
    pub accepted: usize,
    /// Hashes already held locally
    pub known: usize,
    /// Hashes this peer already announced
    pub duplicate: usize,
    /// Hashes dropped because the peer is at its limit
    pub over_limit: usize,
}

/// Result of one poll.
#[derive(Debug, Default)]
pub struct PollOutcome {
    /// Requests to send now
    pub requests: Vec<FetchRequest>,
    /// Requests that exceeded the arrive timeout
    pub timed_out: usize,
    /// Hashes dropped at the forget timeout
    pub forgotten: usize,
    /// Hashes that arrived through another path
    pub arrived_elsewhere: usize,
}

/// Tracked announcements and outstanding requests.
#[derive(Debug)]
pub struct FetcherState {
    config: FetcherConfig,
    tracked: HashMap<Hash, Tracked>,
    per_peer: HashMap<PeerId, usize>,
    batches: HashMap<BatchId, usize>,
    next_batch: BatchId,
}

impl FetcherState {
    /// Empty state.
    pub fn new(config: FetcherConfig) -> Self {
        Self {
            config,
            tracked: HashMap::new(),
            per_peer: HashMap::new(),
            batches: HashMap::new(),
            next_batch: 0,
        }
    }

    /// Hashes being tracked.
    pub fn tracked(&self) -> usize {
        self.tracked.len()
    }

    /// Whether `hash` is tracked.
    pub fn is_tracked(&self, hash: &Hash) -> bool {
        self.tracked.contains_key(hash)
    }

    /// Hashes with a request outstanding.
    pub fn fetching(&self) -> usize {
        self.tracked.values().filter(|t| t.fetching.is_some()).count()
    }

    /// Requests outstanding.
    pub fn in_flight(&self) -> usize {
        self.batches.len()
    }

    /// Hashes `peer` has pending.
    pub fn pending_of(&self, peer: &PeerId) -> usize {
        self.per_peer.get(peer).copied().unwrap_or(0)
    }

    /// Record that `peer` announced `hashes`.
    pub fn notify_announces(
        &mut self,
        peer: PeerId,
        hashes: &[Hash],
        now: Instant,
        is_known: impl Fn(&Hash) -> bool,
    ) -> AnnounceOutcome {
        let mut outcome = AnnounceOutcome::default();
        for hash in hashes {
            if is_known(hash) {
                outcome.known += 1;
                continue;
            }
            if self
                .tracked
                .get(hash)
                .is_some_and(|t| t.announcers.contains(&peer))
            {
                outcome.duplicate += 1;
                continue;
            }
            let pending = self.per_peer.entry(peer).or_insert(0);
            if *pending >= self.config.hash_limit {
                outcome.over_limit += 1;
                continue;
            }
            *pending += 1;
            outcome.accepted += 1;
            self.tracked
                .entry(*hash)
                .or_insert_with(|| Tracked {
                    first_seen: now,
                    announcers: Vec::new(),
                    tried: Vec::new(),
                    fetching: None,
                })
                .announcers
                .push(peer);
        }
        outcome
    }

    /// Stop tracking hashes that arrived. Returns how many were tracked.
    pub fn notify_received(&mut self, hashes: &[Hash]) -> usize {
        let mut removed = 0;
        for hash in hashes {
            if let Some(t) = self.tracked.remove(hash) {
                self.untrack(t);
                removed += 1;
            }
        }
        removed
    }

    /// Mark every hash of `batch` as failed with its peer.
    pub fn on_request_failed(&mut self, batch: BatchId) -> usize {
        let mut failed = 0;
        for t in self.tracked.values_mut() {
            if let Some(f) = t.fetching.filter(|f| f.batch == batch) {
                t.fetching = None;
                t.tried.push(f.peer);
                failed += 1;
            }
        }
        self.batches.remove(&batch);
        failed
    }

    /// Expire, time out and schedule. Returns the requests to send.
    pub fn poll(&mut self, now: Instant, is_known: impl Fn(&Hash) -> bool) -> PollOutcome {
        let mut outcome = PollOutcome::default();
        let forget = self.config.forget_timeout();
        let arrive = self.config.arrive_timeout();
        let slack = self.config.gather_slack();

        let stale: Vec<(Hash, bool)> = self
            .tracked
            .iter()
            .filter_map(|(hash, t)| {
                if now.saturating_duration_since(t.first_seen) >= forget {
                    Some((*hash, false))
                } else if is_known(hash) {
                    Some((*hash, true))
                } else {
                    None
                }
            })
            .collect();
        for (hash, arrived) in stale {
            if let Some(t) = self.tracked.remove(&hash) {
                self.untrack(t);
                if arrived {
                    outcome.arrived_elsewhere += 1;
                } else {
                    outcome.forgotten += 1;
                }
            }
        }

        let mut expired = Vec::new();
        for t in self.tracked.values_mut() {
            if let Some(f) = t.fetching {
                if now.saturating_duration_since(f.since) >= arrive {
                    t.fetching = None;
                    t.tried.push(f.peer);
                    expired.push(f.batch);
                    outcome.timed_out += 1;
                }
            }
        }
        for batch in expired {
            self.finish_batch(batch);
        }

        let mut ready: Vec<(Instant, Hash, PeerId)> = self
            .tracked
            .iter()
            .filter(|(_, t)| t.fetching.is_none() && now.saturating_duration_since(t.first_seen) >= slack)
            .filter_map(|(hash, t)| t.next_peer().map(|p| (t.first_seen, *hash, p)))
            .collect();
        ready.sort();

        let mut open: HashMap<PeerId, usize> = HashMap::new();
        for (_, hash, peer) in ready {
            let slot = match open.get(&peer) {
                Some(&i) if outcome.requests[i].hashes.len() < self.config.max_batch => i,
                _ => {
                    if self.batches.len() >= self.config.max_parallel_requests {
                        continue;
                    }
                    let batch = self.next_batch;
                    self.next_batch += 1;
                    self.batches.insert(batch, 0);
                    outcome.requests.push(FetchRequest {
                        batch,
                        peer,
                        hashes: Vec::new(),
                    });
                    let i = outcome.requests.len() - 1;
                    open.insert(peer, i);
                    i
                }
            };
            let request = &mut outcome.requests[slot];
            request.hashes.push(hash);
            *self.batches.entry(request.batch).or_insert(0) += 1;
            if let Some(t) = self.tracked.get_mut(&hash) {
                t.fetching = Some(InFlight {
                    peer,
                    batch: request.batch,
                    since: now,
                });
            }
        }
        outcome
    }

    fn untrack(&mut self, t: Tracked) {
        for peer in &t.announcers {
            if let Some(n) = self.per_peer.get_mut(peer) {
                *n = n.saturating_sub(1);
                if *n == 0 {
                    self.per_peer.remove(peer);
                }
            }
        }
        if let Some(f) = t.fetching {
            self.finish_batch(f.batch);
        }
    }

    fn finish_batch(&mut self, batch: BatchId) {
        if let Some(n) = self.batches.get_mut(&batch) {
            *n = n.saturating_sub(1);
            if *n == 0 {
                self.batches.remove(&batch);
            }
        }
    }
}
