//! In-memory DAG.
//!
//! Holds connected events in connection order, which is always a
//! topological order. That order doubles as the index space of the events
//! stream served to peers.

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use shared_types::{Epoch, Event, EventId, Hash, StoreError, ValidatorId};
use std::collections::{HashMap, HashSet};
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::debug;
use ts_03_emitter::{DagReader, EmitterError, EventBroadcaster};
use ts_05_stream_sync::{EventLookup, StreamStore};
use ts_06_items_fetcher::KnownItems;

use super::ItemSource;

/// Connection failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DagError {
    /// A parent is not connected yet.
    #[error("event {event} misses parent {}", hex::encode(&.parent[..8]))]
    MissingParent {
        /// Event being connected
        event: String,
        /// First unknown parent
        parent: EventId,
    },
}

#[derive(Default)]
struct DagInner {
    order: Vec<EventId>,
    events: HashMap<EventId, Event>,
    heads: HashSet<EventId>,
    last: HashMap<(Epoch, ValidatorId), EventId>,
    synced: u64,
}

/// Connected events, indexed by ID and by connection order.
pub struct MemoryDag {
    inner: RwLock<DagInner>,
    apply_lock: Mutex<()>,
    connected: broadcast::Sender<Event>,
}

impl MemoryDag {
    /// Empty DAG. Up to `feed_len` connected events are buffered for slow
    /// subscribers.
    pub fn new(feed_len: usize) -> Self {
        let (connected, _) = broadcast::channel(feed_len.max(1));
        Self {
            inner: RwLock::new(DagInner::default()),
            apply_lock: Mutex::new(()),
            connected,
        }
    }

    /// Feed of newly connected events.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.connected.subscribe()
    }

    /// Number of connected events.
    pub fn len(&self) -> usize {
        self.inner.read().order.len()
    }

    /// Whether nothing is connected.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `id` is connected.
    pub fn contains(&self, id: &EventId) -> bool {
        self.inner.read().events.contains_key(id)
    }

    /// Parents of `event` that are not connected yet.
    pub fn missing_parents(&self, event: &Event) -> Vec<EventId> {
        let inner = self.inner.read();
        event
            .parents()
            .iter()
            .filter(|p| !inner.events.contains_key(*p))
            .copied()
            .collect()
    }

    /// Connected parents of `event`, in the event's parent order. `None`
    /// if any is missing.
    pub fn parents_of(&self, event: &Event) -> Option<Vec<Event>> {
        let inner = self.inner.read();
        event
            .parents()
            .iter()
            .map(|p| inner.events.get(p).cloned())
            .collect()
    }

    /// Connect a validated event. `Ok(false)` if it is already connected.
    pub fn connect(&self, event: Event) -> Result<bool, DagError> {
        {
            let mut inner = self.inner.write();
            let id = event.id();
            if inner.events.contains_key(&id) {
                return Ok(false);
            }
            if let Some(parent) = event.parents().iter().find(|p| !inner.events.contains_key(*p)) {
                return Err(DagError::MissingParent {
                    event: event.to_string(),
                    parent: *parent,
                });
            }

            for parent in event.parents() {
                inner.heads.remove(parent);
            }
            inner.heads.insert(id);

            let key = (event.epoch(), event.creator());
            let newer = match inner.last.get(&key).and_then(|last| inner.events.get(last)) {
                Some(last) => event.seq() > last.seq(),
                None => true,
            };
            if newer {
                inner.last.insert(key, id);
            }

            inner.order.push(id);
            inner.events.insert(id, event.clone());
        }

        debug!(event = %event, creator = %event.creator(), "Event connected");
        // Nobody listening is fine.
        let _ = self.connected.send(event);
        Ok(true)
    }
}

impl DagReader for MemoryDag {
    fn heads(&self, epoch: Epoch) -> Vec<Event> {
        let inner = self.inner.read();
        inner
            .heads
            .iter()
            .filter_map(|id| inner.events.get(id))
            .filter(|e| e.epoch() == epoch)
            .cloned()
            .collect()
    }

    fn last_event(&self, epoch: Epoch, creator: ValidatorId) -> Option<Event> {
        let inner = self.inner.read();
        inner
            .last
            .get(&(epoch, creator))
            .and_then(|id| inner.events.get(id))
            .cloned()
    }
}

/// Own events are connected locally; peers learn about them from the
/// connection feed.
#[async_trait]
impl EventBroadcaster for MemoryDag {
    async fn broadcast(&self, event: Event) -> ts_03_emitter::Result<()> {
        self.connect(event)
            .map(|_| ())
            .map_err(|e| EmitterError::Broadcast(e.to_string()))
    }
}

impl EventLookup for MemoryDag {
    fn get_event(&self, id: &EventId) -> Option<Event> {
        self.inner.read().events.get(id).cloned()
    }

    fn has_event(&self, id: &EventId) -> bool {
        self.contains(id)
    }
}

impl KnownItems for MemoryDag {
    fn is_known(&self, hash: &Hash) -> bool {
        self.contains(hash)
    }
}

impl ItemSource<Event> for MemoryDag {
    fn get_items(&self, hashes: &[Hash]) -> Vec<Event> {
        let inner = self.inner.read();
        hashes
            .iter()
            .filter_map(|h| inner.events.get(h))
            .cloned()
            .collect()
    }
}

/// Serves the whole DAG in connection order. Applying tracks how far the
/// stream of the seeding peer has been consumed; events already connected
/// through gossip are skipped.
impl StreamStore<Event> for MemoryDag {
    fn next_index(&self) -> u64 {
        self.inner.read().synced
    }

    fn read_range(&self, from: u64, max_count: u64, max_size: u64) -> Vec<Event> {
        let inner = self.inner.read();
        let mut out = Vec::new();
        let mut size = 0u64;
        let from = usize::try_from(from).unwrap_or(usize::MAX);
        let take = usize::try_from(max_count).unwrap_or(usize::MAX);
        for id in inner.order.iter().skip(from).take(take) {
            let Some(event) = inner.events.get(id) else {
                continue;
            };
            size = size.saturating_add(event.size());
            if !out.is_empty() && size > max_size {
                break;
            }
            out.push(event.clone());
        }
        out
    }

    fn apply(&self, start: u64, items: Vec<Event>) -> Result<(), StoreError> {
        let _serial = self.apply_lock.lock();
        let synced = self.next_index();
        if start > synced {
            return Err(StoreError::Gap { start, next: synced });
        }
        let skip = usize::try_from(synced - start).unwrap_or(usize::MAX);
        let mut applied = 0u64;
        let mut result = Ok(());
        for event in items.into_iter().skip(skip) {
            if let Err(e) = self.connect(event) {
                result = Err(StoreError::DatabaseError(e.to_string()));
                break;
            }
            applied += 1;
        }
        self.inner.write().synced += applied;
        result
    }
}
