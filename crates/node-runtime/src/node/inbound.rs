//! Processing of items peers delivered in answer to fetch requests.

use shared_types::{EpochReader, Event, EventId, Hash, ItemSize, Metric, PeerId, Transaction};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, warn};
use ts_02_event_check::{check_txs, CheckError};
use ts_04_flow_control::{DataSemaphore, SemaphorePermit};
use ts_05_stream_sync::{EventLookup, PeerPenalizer};

use super::GossipNode;
use crate::adapters::Delivery;
use crate::metrics::NodeMetrics;

impl GossipNode {
    pub(super) async fn process_inbound(
        self: Arc<Self>,
        mut events: mpsc::Receiver<Delivery<Event>>,
        mut txs: mpsc::Receiver<Delivery<Transaction>>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        loop {
            tokio::select! {
                Some(delivery) = events.recv() => self.process_events(delivery).await,
                Some(delivery) = txs.recv() => self.process_txs(delivery).await,
                _ = shutdown.changed() => break,
                else => break,
            }
        }
        self.close();
    }

    /// Reserve room for a whole delivery, waiting up to the message timeout.
    async fn admit<I: ItemSize>(
        &self,
        semaphore: &Arc<DataSemaphore>,
        peer: PeerId,
        items: &[I],
    ) -> Option<SemaphorePermit> {
        let weight = items.iter().fold(Metric::new(items.len() as u64, 0), |w, i| {
            Metric::new(w.num, w.size.saturating_add(i.encoded_size()))
        });
        match semaphore
            .acquire_permit(weight, self.config.semaphores.msgs_timeout())
            .await
        {
            Ok(permit) => Some(permit),
            Err(err) => {
                NodeMetrics::add(&self.metrics.deliveries_dropped, 1);
                warn!(
                    peer = %peer,
                    semaphore = semaphore.name(),
                    %weight,
                    error = %err,
                    "Delivery dropped"
                );
                None
            }
        }
    }

    /// Light checks in parent order, then one heavy batch, then connect.
    /// The delivery holds its weight on the events semaphore throughout.
    pub(crate) async fn process_events(&self, delivery: Delivery<Event>) {
        let Delivery { peer, items } = delivery;
        NodeMetrics::add(&self.metrics.events_received, items.len());
        let Some(_permit) = self.admit(&self.semaphores.events, peer, &items).await else {
            return;
        };
        let received: Vec<Hash> = items.iter().map(Event::id).collect();

        let mut events = items;
        events.sort_by_key(|e| (e.epoch(), e.lamport()));

        let mut admitted: HashMap<EventId, Event> = HashMap::new();
        let mut tasks = Vec::new();
        for event in events {
            let id = event.id();
            if self.dag.contains(&id) || admitted.contains_key(&id) {
                NodeMetrics::add(&self.metrics.events_duplicate, 1);
                continue;
            }
            let parents: Option<Vec<Event>> = event
                .parents()
                .iter()
                .map(|p| self.dag.get_event(p).or_else(|| admitted.get(p).cloned()))
                .collect();
            let Some(parents) = parents else {
                NodeMetrics::add(&self.metrics.events_orphaned, 1);
                debug!(peer = %peer, event = %event, "Delivered event misses parents");
                continue;
            };
            if let Err(err) = self.light.validate(&event, &parents) {
                self.reject(peer, &err);
                continue;
            }
            admitted.insert(id, event.clone());
            tasks.push((event, parents));
        }

        if !tasks.is_empty() {
            let pool = self.heavy.clone();
            let checked = tokio::task::spawn_blocking(move || {
                let verdicts = pool.validate_batch(&tasks);
                (tasks, verdicts)
            })
            .await;
            match checked {
                Ok((tasks, Ok(verdicts))) => {
                    for ((event, _), verdict) in tasks.into_iter().zip(verdicts) {
                        match verdict {
                            Ok(()) => self.connect_delivered(peer, event),
                            Err(err) => self.reject(peer, &err),
                        }
                    }
                }
                Ok((tasks, Err(err))) => {
                    NodeMetrics::add(&self.metrics.heavy_queue_full, 1);
                    warn!(peer = %peer, events = tasks.len(), error = %err, "Delivered events dropped");
                }
                Err(err) => error!(error = %err, "Heavy check task failed"),
            }
        }

        if let Err(err) = self.dag_fetcher.notify_received(received).await {
            debug!(error = %err, "Event fetcher gone");
        }
    }

    fn connect_delivered(&self, peer: PeerId, event: Event) {
        match self.dag.connect(event) {
            Ok(true) => NodeMetrics::add(&self.metrics.events_connected, 1),
            Ok(false) => NodeMetrics::add(&self.metrics.events_duplicate, 1),
            Err(err) => {
                // a parent in the same delivery failed its heavy check
                NodeMetrics::add(&self.metrics.events_orphaned, 1);
                debug!(peer = %peer, error = %err, "Delivered event not connected");
            }
        }
    }

    fn reject(&self, peer: PeerId, err: &CheckError) {
        NodeMetrics::add(&self.metrics.events_rejected, 1);
        if err.penalizes_peer() {
            self.peers.penalize(peer, err.kind().as_str());
        } else {
            debug!(peer = %peer, error = %err, "Delivered event of another epoch ignored");
        }
    }

    pub(crate) async fn process_txs(&self, delivery: Delivery<Transaction>) {
        let Delivery { peer, items } = delivery;
        NodeMetrics::add(&self.metrics.txs_received, items.len());
        let Some(_permit) = self.admit(&self.semaphores.msgs, peer, &items).await else {
            return;
        };
        let rules = self.epochs.snapshot().rules.clone();
        let received: Vec<Hash> = items.iter().map(|tx| tx.hash).collect();

        let mut added = Vec::new();
        for tx in items {
            if let Err(err) = check_txs(std::slice::from_ref(&tx), &rules) {
                debug!(peer = %peer, error = %err, "Delivered transaction refused");
                continue;
            }
            let hash = tx.hash;
            if self.pool.add(tx) {
                added.push(hash);
            }
        }
        NodeMetrics::add(&self.metrics.txs_added, added.len());
        self.announce_txs(added);

        if let Err(err) = self.tx_fetcher.notify_received(received).await {
            debug!(error = %err, "Transaction fetcher gone");
        }
    }
}
