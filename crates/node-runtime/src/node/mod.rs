//! # Gossip Node
//!
//! One node of the gossip layer: local stores, the four stream protocols,
//! the validation pipeline, the announcement fetchers and the emitter,
//! wired together and driven by [`GossipNode::run`].
//!
//! ```text
//!            ┌──────────── stream sync (events, bvs, brs, eps) ───────────┐
//!            │                                                             │
//! peer ──► leecher ──► chunk validator ──► store          store ──► seeder ──► peer
//!            │
//! peer ──announce──► fetcher ──request──► peer store ──delivery──► light checks
//!                                                                     │
//!                                                         heavy batch ──► DAG
//!                                                                          │
//! emitter ──► self-check ──► DAG ──feed──► announce to peers ◄─────────────┘
//! ```

mod inbound;
mod streams;

pub use streams::StreamProtocol;

use parking_lot::{Mutex, RwLock};
use shared_types::{
    BlockRecord, BlockVotes, EpochPack, EpochReader, Event, Hash, PeerId, SnapshotCell,
    TimeSource, Transaction,
};
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use tessera_telemetry::{subsystem_span, MetricsHandle};
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinSet;
use tracing::{debug, info, warn, Instrument};
use ts_02_event_check::{check_txs, Checkers, HeavyCheckPool, HeavyChecker};
use ts_03_emitter::{Emitter, EmitterApi, EmitterDeps, LocalKeySigner, OfflineValidators};
use ts_04_flow_control::DataSemaphore;
use ts_05_stream_sync::{
    AcceptAll, EventChunkValidator, MemoryStreamStore, PeerPenalizer, PeerSource, StreamKind,
};
use ts_06_items_fetcher::{FetcherError, ItemsFetcher};

use crate::adapters::{Delivery, MemoryDag, MemoryTxPool, PeerItemRequester, PeerSet};
use crate::config::GossipConfig;
use crate::error::NodeError;
use crate::metrics::NodeMetrics;
use streams::ProtocolParts;

/// Connected events buffered for the announcement feed.
const CONNECTED_FEED_LEN: usize = 4096;

/// Transactions the local pool holds.
const TX_POOL_CAPACITY: usize = 16_384;

/// Connected events announced together.
const ANNOUNCE_BATCH: usize = 256;

/// What a node is built from besides its configuration.
pub struct NodeDeps {
    /// Network identity
    pub id: PeerId,
    /// Active epoch
    pub epochs: Arc<SnapshotCell>,
    /// Clock for event creation
    pub time: Arc<dyn TimeSource>,
    /// Validator signing secret; `None` for a node that only relays
    pub secret: Option<[u8; 32]>,
}

/// Where announcements to a peer go.
struct PeerLink {
    dag_fetcher: Arc<ItemsFetcher>,
    tx_fetcher: Arc<ItemsFetcher>,
}

type Inboxes = (
    mpsc::Receiver<Delivery<Event>>,
    mpsc::Receiver<Delivery<Transaction>>,
);

/// Stream-wide inbound budgets, shared by the leechers.
struct InboundSemaphores {
    events: Arc<DataSemaphore>,
    bvs: Arc<DataSemaphore>,
    msgs: Arc<DataSemaphore>,
}

/// A gossip node.
pub struct GossipNode {
    id: PeerId,
    config: GossipConfig,
    epochs: Arc<SnapshotCell>,
    dag: Arc<MemoryDag>,
    pool: Arc<MemoryTxPool>,
    block_votes: Arc<MemoryStreamStore<BlockVotes>>,
    block_records: Arc<MemoryStreamStore<BlockRecord>>,
    epoch_packs: Arc<MemoryStreamStore<EpochPack>>,
    peers: Arc<PeerSet>,
    checkers: Checkers,
    light: Checkers,
    heavy: Arc<HeavyCheckPool>,
    offline: OfflineValidators,
    emitter: Option<Arc<Emitter>>,
    events: StreamProtocol<Event>,
    bvs: StreamProtocol<BlockVotes>,
    brs: StreamProtocol<BlockRecord>,
    eps: StreamProtocol<EpochPack>,
    semaphores: InboundSemaphores,
    dag_fetcher: Arc<ItemsFetcher>,
    tx_fetcher: Arc<ItemsFetcher>,
    event_requester: Arc<PeerItemRequester<Event>>,
    tx_requester: Arc<PeerItemRequester<Transaction>>,
    inboxes: Mutex<Option<Inboxes>>,
    links: RwLock<HashMap<PeerId, PeerLink>>,
    metrics: NodeMetrics,
}

impl GossipNode {
    /// Build a node. Fails on an inconsistent configuration.
    pub fn new(config: GossipConfig, deps: NodeDeps) -> Result<Arc<Self>, NodeError> {
        config.validate()?;
        let NodeDeps {
            id,
            epochs,
            time,
            secret,
        } = deps;
        let reader: Arc<dyn EpochReader> = epochs.clone();

        let checkers = Checkers::new(reader.clone());
        let light = checkers.light();
        let heavy = Arc::new(HeavyCheckPool::new(
            &config.heavy_check,
            Arc::new(HeavyChecker::new(reader.clone())),
        )?);

        let dag = Arc::new(MemoryDag::new(CONNECTED_FEED_LEN));
        let pool = Arc::new(MemoryTxPool::new(TX_POOL_CAPACITY));
        let block_votes: Arc<MemoryStreamStore<BlockVotes>> = Arc::new(MemoryStreamStore::new(0));
        let block_records: Arc<MemoryStreamStore<BlockRecord>> = Arc::new(MemoryStreamStore::new(0));
        let epoch_packs: Arc<MemoryStreamStore<EpochPack>> = Arc::new(MemoryStreamStore::new(0));
        let peers = Arc::new(PeerSet::new(config.peers.max_penalties));
        let penalizer: Arc<dyn PeerPenalizer> = peers.clone();

        let semaphore = |kind: StreamKind, name: &str| {
            Arc::new(DataSemaphore::new(
                format!("{name}-inbound"),
                config.stream_semaphore(kind),
            ))
        };
        let semaphores = InboundSemaphores {
            events: semaphore(StreamKind::Events, "events"),
            bvs: semaphore(StreamKind::BlockVotes, "bvs"),
            msgs: semaphore(StreamKind::BlockRecords, "msgs"),
        };

        let events = StreamProtocol::<Event>::new(ProtocolParts {
            kind: StreamKind::Events,
            local: id,
            leecher: config.leechers.events.clone(),
            seeder: config.seeders.events.clone(),
            store: dag.clone(),
            validator: Arc::new(EventChunkValidator::new(checkers.clone(), dag.clone())),
            penalizer: penalizer.clone(),
            inbound: semaphores.events.clone(),
        });
        let bvs = StreamProtocol::<BlockVotes>::new(ProtocolParts {
            kind: StreamKind::BlockVotes,
            local: id,
            leecher: config.leechers.bvs.clone(),
            seeder: config.seeders.bvs.clone(),
            store: block_votes.clone(),
            validator: Arc::new(AcceptAll),
            penalizer: penalizer.clone(),
            inbound: semaphores.bvs.clone(),
        });
        let brs = StreamProtocol::<BlockRecord>::new(ProtocolParts {
            kind: StreamKind::BlockRecords,
            local: id,
            leecher: config.leechers.brs.clone(),
            seeder: config.seeders.brs.clone(),
            store: block_records.clone(),
            validator: Arc::new(AcceptAll),
            penalizer: penalizer.clone(),
            inbound: semaphores.msgs.clone(),
        });
        let eps = StreamProtocol::<EpochPack>::new(ProtocolParts {
            kind: StreamKind::EpochPacks,
            local: id,
            leecher: config.leechers.eps.clone(),
            seeder: config.seeders.eps.clone(),
            store: epoch_packs.clone(),
            validator: Arc::new(AcceptAll),
            penalizer,
            inbound: semaphores.msgs.clone(),
        });

        let (events_tx, events_rx) = mpsc::channel(config.inbound_queue);
        let (txs_tx, txs_rx) = mpsc::channel(config.inbound_queue);
        let event_requester = Arc::new(PeerItemRequester::new(events_tx));
        let tx_requester = Arc::new(PeerItemRequester::new(txs_tx));
        let dag_fetcher = Arc::new(ItemsFetcher::new(
            format!("{id}-events"),
            config.dag_fetcher.clone(),
            event_requester.clone(),
            dag.clone(),
        ));
        let tx_fetcher = Arc::new(ItemsFetcher::new(
            format!("{id}-txs"),
            config.tx_fetcher.clone(),
            tx_requester.clone(),
            pool.clone(),
        ));

        let offline = OfflineValidators::new();
        let emitter = match secret {
            Some(secret) => Some(Arc::new(Emitter::new(
                config.emitter.clone(),
                EmitterDeps {
                    epochs: reader,
                    dag: dag.clone(),
                    pool: pool.clone(),
                    signer: Arc::new(LocalKeySigner::from_secret(&secret)),
                    broadcaster: dag.clone(),
                    checkers: checkers.clone(),
                    offline: offline.clone(),
                    time,
                },
            )?)),
            None => None,
        };

        info!(
            node = %id,
            validator = emitter.is_some(),
            "Gossip node assembled"
        );

        Ok(Arc::new_cyclic(|weak: &Weak<GossipNode>| {
            let weak = weak.clone();
            peers.on_drop(move |peer| {
                if let Some(node) = weak.upgrade() {
                    node.peer_dropped(peer);
                }
            });
            Self {
                id,
                config,
                epochs,
                dag,
                pool,
                block_votes,
                block_records,
                epoch_packs,
                peers,
                checkers,
                light,
                heavy,
                offline,
                emitter,
                events,
                bvs,
                brs,
                eps,
                semaphores,
                dag_fetcher,
                tx_fetcher,
                event_requester,
                tx_requester,
                inboxes: Mutex::new(Some((events_rx, txs_rx))),
                links: RwLock::new(HashMap::new()),
                metrics: NodeMetrics::new(),
            }
        }))
    }

    /// Link two nodes in both directions.
    pub fn connect(a: &Arc<GossipNode>, b: &Arc<GossipNode>) {
        a.attach(b);
        b.attach(a);
    }

    /// Unlink two nodes, cancelling every session between them.
    pub fn disconnect(a: &Arc<GossipNode>, b: &Arc<GossipNode>) {
        a.peers.remove(b.id);
        b.peers.remove(a.id);
    }

    fn attach(&self, other: &GossipNode) {
        let peer = other.id;
        self.events.link(peer, &other.events);
        self.bvs.link(peer, &other.bvs);
        self.brs.link(peer, &other.brs);
        self.eps.link(peer, &other.eps);
        self.event_requester.connect(peer, other.dag.clone());
        self.tx_requester.connect(peer, other.pool.clone());
        self.links.write().insert(
            peer,
            PeerLink {
                dag_fetcher: other.dag_fetcher.clone(),
                tx_fetcher: other.tx_fetcher.clone(),
            },
        );
        self.peers.add(peer);
    }

    fn peer_dropped(&self, peer: PeerId) {
        self.events.unlink(peer);
        self.bvs.unlink(peer);
        self.brs.unlink(peer);
        self.eps.unlink(peer);
        self.event_requester.disconnect(peer);
        self.tx_requester.disconnect(peer);
        self.links.write().remove(&peer);
    }

    /// Start every loop of the node. The tasks end when `shutdown` fires.
    pub fn run(self: &Arc<Self>, shutdown: watch::Receiver<bool>) -> Result<JoinSet<()>, NodeError> {
        let (events_rx, txs_rx) = self.inboxes.lock().take().ok_or(NodeError::AlreadyRunning)?;
        let mut tasks = JoinSet::new();
        let peers: Arc<dyn PeerSource> = self.peers.clone();

        tasks.spawn(
            self.events
                .leecher
                .clone()
                .run(peers.clone(), shutdown.clone())
                .instrument(subsystem_span!("gossip", "leecher", stream = "events", node = %self.id)),
        );
        tasks.spawn(
            self.bvs
                .leecher
                .clone()
                .run(peers.clone(), shutdown.clone())
                .instrument(subsystem_span!("gossip", "leecher", stream = "bvs", node = %self.id)),
        );
        tasks.spawn(
            self.brs
                .leecher
                .clone()
                .run(peers.clone(), shutdown.clone())
                .instrument(subsystem_span!("gossip", "leecher", stream = "brs", node = %self.id)),
        );
        tasks.spawn(
            self.eps
                .leecher
                .clone()
                .run(peers, shutdown.clone())
                .instrument(subsystem_span!("gossip", "leecher", stream = "eps", node = %self.id)),
        );

        for fetcher in [self.dag_fetcher.clone(), self.tx_fetcher.clone()] {
            let stop = shutdown.clone();
            tasks.spawn(
                async move {
                    if let Err(err) = fetcher.run(stop).await {
                        warn!(error = %err, kind = err.kind(), "Fetcher did not start");
                    }
                }
                .instrument(subsystem_span!("gossip", "fetcher", node = %self.id)),
            );
        }

        if let Some(emitter) = &self.emitter {
            tasks.spawn(
                emitter
                    .clone()
                    .run(shutdown.clone())
                    .instrument(subsystem_span!("gossip", "emitter", node = %self.id)),
            );
        }

        let node = self.clone();
        tasks.spawn(
            node.process_inbound(events_rx, txs_rx, shutdown.clone())
                .instrument(subsystem_span!("gossip", "inbound", node = %self.id)),
        );
        let node = self.clone();
        let feed = self.dag.subscribe();
        tasks.spawn(
            node.relay_connected(feed, shutdown)
                .instrument(subsystem_span!("gossip", "relay", node = %self.id)),
        );

        info!(node = %self.id, tasks = tasks.len(), "Gossip node running");
        Ok(tasks)
    }

    async fn relay_connected(self: Arc<Self>, mut feed: broadcast::Receiver<Event>, mut shutdown: watch::Receiver<bool>) {
        loop {
            let first = tokio::select! {
                received = feed.recv() => match received {
                    Ok(event) => event,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Connection feed lagged, announcements lost");
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
                _ = shutdown.changed() => break,
            };
            let mut batch = vec![first];
            while batch.len() < ANNOUNCE_BATCH {
                match feed.try_recv() {
                    Ok(event) => batch.push(event),
                    Err(_) => break,
                }
            }
            self.on_connected(batch).await;
        }
    }

    async fn on_connected(&self, events: Vec<Event>) {
        if let Some(emitter) = &self.emitter {
            for event in &events {
                emitter.on_event_connected(event);
            }
        }
        let ids: Vec<Hash> = events.iter().map(Event::id).collect();
        self.announce_events(ids.clone());
        if let Err(err) = self.dag_fetcher.notify_received(ids).await {
            debug!(error = %err, "Event fetcher gone");
        }
    }

    fn announce_events(&self, hashes: Vec<Hash>) {
        self.announce(hashes, |link| &link.dag_fetcher);
    }

    fn announce_txs(&self, hashes: Vec<Hash>) {
        self.announce(hashes, |link| &link.tx_fetcher);
    }

    fn announce(&self, hashes: Vec<Hash>, fetcher: impl Fn(&PeerLink) -> &Arc<ItemsFetcher>) {
        if hashes.is_empty() {
            return;
        }
        for (peer, link) in self.links.read().iter() {
            match fetcher(link).notify_announces(self.id, hashes.clone()) {
                Ok(()) => {}
                Err(FetcherError::QueueFull) => {
                    NodeMetrics::add(&self.metrics.announces_dropped, 1);
                    debug!(peer = %peer, hashes = hashes.len(), "Peer fetcher busy, announcement dropped");
                }
                Err(err) => debug!(peer = %peer, error = %err, "Announcement not delivered"),
            }
        }
    }

    /// Add a local transaction and announce it. `false` if the pool or the
    /// epoch rules refuse it.
    pub fn submit_tx(&self, tx: Transaction) -> bool {
        let rules = self.epochs.snapshot().rules.clone();
        if let Err(err) = check_txs(std::slice::from_ref(&tx), &rules) {
            debug!(tx = %hex::encode(&tx.hash[..8]), error = %err, "Transaction refused");
            return false;
        }
        let hash = tx.hash;
        if !self.pool.add(tx) {
            return false;
        }
        self.announce_txs(vec![hash]);
        true
    }

    /// Forget what confirmed events carried.
    pub fn on_events_confirmed(&self, events: &[Event]) {
        let mut included = Vec::new();
        for event in events {
            if let Some(emitter) = &self.emitter {
                emitter.on_event_confirmed(event);
            }
            included.extend(event.txs().iter().map(|tx| tx.hash));
        }
        self.pool.remove(&included);
    }

    fn close(&self) {
        for semaphore in [
            &self.semaphores.events,
            &self.semaphores.bvs,
            &self.semaphores.msgs,
            &self.events.outbound,
            &self.bvs.outbound,
            &self.brs.outbound,
            &self.eps.outbound,
        ] {
            semaphore.close();
        }
        info!(node = %self.id, "Gossip node stopped");
    }

    /// Network identity.
    pub fn id(&self) -> PeerId {
        self.id
    }

    /// Configuration the node runs with.
    pub fn config(&self) -> &GossipConfig {
        &self.config
    }

    /// Local DAG.
    pub fn dag(&self) -> &Arc<MemoryDag> {
        &self.dag
    }

    /// Local transaction pool.
    pub fn pool(&self) -> &Arc<MemoryTxPool> {
        &self.pool
    }

    /// Block votes store.
    pub fn block_votes(&self) -> &Arc<MemoryStreamStore<BlockVotes>> {
        &self.block_votes
    }

    /// Block records store.
    pub fn block_records(&self) -> &Arc<MemoryStreamStore<BlockRecord>> {
        &self.block_records
    }

    /// Epoch packs store.
    pub fn epoch_packs(&self) -> &Arc<MemoryStreamStore<EpochPack>> {
        &self.epoch_packs
    }

    /// Connected peers.
    pub fn peers(&self) -> &Arc<PeerSet> {
        &self.peers
    }

    /// Validation pipeline.
    pub fn checkers(&self) -> &Checkers {
        &self.checkers
    }

    /// Liveness view used by turn scheduling.
    pub fn offline(&self) -> &OfflineValidators {
        &self.offline
    }

    /// Emitter, on validator nodes.
    pub fn emitter(&self) -> Option<&Arc<Emitter>> {
        self.emitter.as_ref()
    }

    /// Events stream.
    pub fn events_stream(&self) -> &StreamProtocol<Event> {
        &self.events
    }

    /// Block votes stream.
    pub fn bvs_stream(&self) -> &StreamProtocol<BlockVotes> {
        &self.bvs
    }

    /// Block records stream.
    pub fn brs_stream(&self) -> &StreamProtocol<BlockRecord> {
        &self.brs
    }

    /// Epoch packs stream.
    pub fn eps_stream(&self) -> &StreamProtocol<EpochPack> {
        &self.eps
    }

    /// Announced event retrieval.
    pub fn dag_fetcher(&self) -> &Arc<ItemsFetcher> {
        &self.dag_fetcher
    }

    /// Announced transaction retrieval.
    pub fn tx_fetcher(&self) -> &Arc<ItemsFetcher> {
        &self.tx_fetcher
    }

    /// Inbound processing counters.
    pub fn metrics(&self) -> &NodeMetrics {
        &self.metrics
    }

    /// Copy every subsystem's counters into `handle`.
    pub fn export_metrics(&self, handle: &MetricsHandle) {
        let m = self.metrics.snapshot();
        handle.export_totals(
            "node",
            &[
                ("events_received", m.events_received),
                ("events_connected", m.events_connected),
                ("events_duplicate", m.events_duplicate),
                ("events_rejected", m.events_rejected),
                ("events_orphaned", m.events_orphaned),
                ("heavy_queue_full", m.heavy_queue_full),
                ("txs_received", m.txs_received),
                ("txs_added", m.txs_added),
                ("announces_dropped", m.announces_dropped),
                ("deliveries_dropped", m.deliveries_dropped),
            ],
        );

        let c = self.checkers.metrics().snapshot();
        handle.export_totals(
            "checkers",
            &[
                ("accepted", c.accepted),
                ("rejected_basic", c.rejected_basic),
                ("rejected_epoch", c.rejected_epoch),
                ("rejected_parents", c.rejected_parents),
                ("rejected_gas_power", c.rejected_gas_power),
                ("rejected_heavy", c.rejected_heavy),
            ],
        );

        if let Some(emitter) = &self.emitter {
            let e = emitter.metrics().snapshot();
            handle.export_totals(
                "emitter",
                &[
                    ("events_emitted", e.events_emitted),
                    ("emit_throttled", e.emit_throttled),
                    ("emit_no_gas_power", e.emit_no_gas_power),
                    ("self_check_failures", e.self_check_failures),
                    ("txs_added", e.txs_added),
                    ("txs_skipped_epoch_rules", e.txs_skipped_epoch_rules),
                    ("txs_skipped_no_validator_gas", e.txs_skipped_no_validator_gas),
                    ("txs_skipped_conflicting_sender", e.txs_skipped_conflicting_sender),
                    ("txs_skipped_not_my_turn", e.txs_skipped_not_my_turn),
                    ("txs_skipped_outdated", e.txs_skipped_outdated),
                    ("offline_validators_skipped", e.offline_validators_skipped),
                ],
            );
        }

        for (name, fetcher) in [("dag_fetcher", &self.dag_fetcher), ("tx_fetcher", &self.tx_fetcher)] {
            let f = fetcher.metrics().snapshot();
            handle.export_totals(
                name,
                &[
                    ("announces_accepted", f.announces_accepted),
                    ("announces_known", f.announces_known),
                    ("announces_over_limit", f.announces_over_limit),
                    ("announces_overloaded", f.announces_overloaded),
                    ("requests_sent", f.requests_sent),
                    ("hashes_requested", f.hashes_requested),
                    ("request_failures", f.request_failures),
                    ("arrive_timeouts", f.arrive_timeouts),
                    ("forgotten", f.forgotten),
                    ("received", f.received),
                ],
            );
            handle.export_levels(name, &[("tracked", f.tracked), ("in_flight", f.in_flight)]);
        }

        self.export_stream(handle, StreamKind::Events);
        self.export_stream(handle, StreamKind::BlockVotes);
        self.export_stream(handle, StreamKind::BlockRecords);
        self.export_stream(handle, StreamKind::EpochPacks);

        for semaphore in [&self.semaphores.events, &self.semaphores.bvs, &self.semaphores.msgs] {
            let s = semaphore.metrics().snapshot();
            let name = format!("semaphore_{}", semaphore.name());
            handle.export_totals(
                &name,
                &[
                    ("acquired", s.acquired),
                    ("released", s.released),
                    ("count_rejections", s.count_rejections),
                    ("size_rejections", s.size_rejections),
                    ("oversized_rejections", s.oversized_rejections),
                    ("timeouts", s.timeouts),
                    ("release_underflows", s.release_underflows),
                ],
            );
            let processing = semaphore.processing();
            handle.export_levels(&name, &[("num", processing.num), ("size", processing.size)]);
        }

        handle.export_levels(
            "node",
            &[
                ("dag_events", self.dag.len() as u64),
                ("pool_txs", ts_03_emitter::TxPool::count(self.pool.as_ref()) as u64),
                ("peers", self.peers.peers().len() as u64),
            ],
        );
    }

    fn export_stream(&self, handle: &MetricsHandle, kind: StreamKind) {
        let (leecher, seeder, pending) = match kind {
            StreamKind::Events => (
                self.events.leecher.metrics().snapshot(),
                self.events.seeder.metrics().snapshot(),
                self.events.pending_responses(),
            ),
            StreamKind::BlockVotes => (
                self.bvs.leecher.metrics().snapshot(),
                self.bvs.seeder.metrics().snapshot(),
                self.bvs.pending_responses(),
            ),
            StreamKind::BlockRecords => (
                self.brs.leecher.metrics().snapshot(),
                self.brs.seeder.metrics().snapshot(),
                self.brs.pending_responses(),
            ),
            StreamKind::EpochPacks => (
                self.eps.leecher.metrics().snapshot(),
                self.eps.seeder.metrics().snapshot(),
                self.eps.pending_responses(),
            ),
        };
        handle.export_totals(
            &format!("leecher_{kind}"),
            &[
                ("sessions_started", leecher.sessions_started),
                ("sessions_completed", leecher.sessions_completed),
                ("sessions_abandoned", leecher.sessions_abandoned),
                ("sessions_cancelled", leecher.sessions_cancelled),
                ("restarts", leecher.restarts),
                ("chunks_requested", leecher.chunks_requested),
                ("chunks_applied", leecher.chunks_applied),
                ("items_applied", leecher.items_applied),
                ("request_failures", leecher.request_failures),
                ("invalid_chunks", leecher.invalid_chunks),
                ("stale_responses", leecher.stale_responses),
                ("permit_timeouts", leecher.permit_timeouts),
            ],
        );
        let name = format!("seeder_{kind}");
        handle.export_totals(
            &name,
            &[
                ("requests_served", seeder.requests_served),
                ("items_served", seeder.items_served),
                ("bytes_served", seeder.bytes_served),
                ("busy_rejections", seeder.busy_rejections),
                ("invalid_requests", seeder.invalid_requests),
            ],
        );
        handle.export_levels(&name, &[("pending_num", pending.num), ("pending_size", pending.size)]);
    }
}

#[cfg(test)]
mod tests;
