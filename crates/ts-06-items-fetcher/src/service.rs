//! Fetcher service: a single loop owning [`FetcherState`].

use async_trait::async_trait;
use parking_lot::Mutex;
use shared_types::{Hash, PeerId};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::FetcherConfig;
use crate::domain::{BatchId, FetcherState};
use crate::error::{FetcherError, Result};
use crate::metrics::Metrics;
use crate::ports::{FetcherApi, ItemRequester, KnownItems};

#[derive(Debug)]
enum Command {
    Announce {
        peer: PeerId,
        hashes: Vec<Hash>,
        at: Instant,
    },
    Received(Vec<Hash>),
}

/// Fetches announced items in batches.
pub struct ItemsFetcher {
    name: String,
    config: FetcherConfig,
    commands: mpsc::Sender<Command>,
    inbox: Mutex<Option<mpsc::Receiver<Command>>>,
    requester: Arc<dyn ItemRequester>,
    known: Arc<dyn KnownItems>,
    metrics: Metrics,
}

impl ItemsFetcher {
    /// Fetcher named `name` for logs.
    pub fn new(
        name: impl Into<String>,
        config: FetcherConfig,
        requester: Arc<dyn ItemRequester>,
        known: Arc<dyn KnownItems>,
    ) -> Self {
        let (commands, inbox) = mpsc::channel(config.max_queued_batches.max(1));
        Self {
            name: name.into(),
            config,
            commands,
            inbox: Mutex::new(Some(inbox)),
            requester,
            known,
            metrics: Metrics::new(),
        }
    }

    /// Counters.
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Queue an announcement. Dropped when the queue is full.
    pub fn notify_announces(&self, peer: PeerId, hashes: Vec<Hash>) -> Result<()> {
        if hashes.is_empty() {
            return Ok(());
        }
        let cmd = Command::Announce {
            peer,
            hashes,
            at: Instant::now(),
        };
        self.commands.try_send(cmd).map_err(|err| match err {
            mpsc::error::TrySendError::Full(_) => {
                self.metrics.record_overloaded();
                debug!(fetcher = %self.name, %peer, "Dropping announces, queue full");
                FetcherError::QueueFull
            }
            mpsc::error::TrySendError::Closed(_) => FetcherError::Stopped,
        })
    }

    /// Report arrived items.
    pub async fn notify_received(&self, hashes: Vec<Hash>) -> Result<()> {
        if hashes.is_empty() {
            return Ok(());
        }
        self.commands
            .send(Command::Received(hashes))
            .await
            .map_err(|_| FetcherError::Stopped)
    }

    /// Whether more than three quarters of the queue is used.
    pub fn overloaded(&self) -> bool {
        let queued = self.commands.max_capacity() - self.commands.capacity();
        queued > self.config.max_queued_batches * 3 / 4
    }

    /// Process notifications and issue requests until `shutdown` fires.
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        let mut inbox = self.inbox.lock().take().ok_or(FetcherError::AlreadyRunning)?;
        let mut state = FetcherState::new(self.config.clone());
        let mut requests: JoinSet<(BatchId, Result<()>)> = JoinSet::new();
        let mut tick = tokio::time::interval(self.config.gather_slack());
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(fetcher = %self.name, "Items fetcher started");

        loop {
            tokio::select! {
                cmd = inbox.recv() => match cmd {
                    Some(cmd) => self.apply(&mut state, cmd),
                    None => break,
                },
                _ = tick.tick() => self.dispatch(&mut state, &mut requests),
                Some(joined) = requests.join_next(), if !requests.is_empty() => {
                    if let Ok((batch, Err(err))) = joined {
                        self.metrics.record_request_failure();
                        let failed = state.on_request_failed(batch);
                        warn!(fetcher = %self.name, batch, hashes = failed, error = %err, "Item request failed");
                    }
                }
                _ = shutdown.changed() => {
                    info!(fetcher = %self.name, "Items fetcher shutting down");
                    break;
                }
            }
            self.metrics.set_gauges(state.tracked(), state.in_flight());
        }
        requests.shutdown().await;
        Ok(())
    }

    fn apply(&self, state: &mut FetcherState, cmd: Command) {
        match cmd {
            Command::Announce { peer, hashes, at } => {
                let outcome = state.notify_announces(peer, &hashes, at, |h| self.known.is_known(h));
                self.metrics.record_announce(&outcome);
                if outcome.over_limit > 0 {
                    debug!(fetcher = %self.name, %peer, dropped = outcome.over_limit, "Peer over hash limit");
                }
            }
            Command::Received(hashes) => {
                let removed = state.notify_received(&hashes);
                self.metrics.record_received(removed);
            }
        }
    }

    fn dispatch(&self, state: &mut FetcherState, requests: &mut JoinSet<(BatchId, Result<()>)>) {
        let outcome = state.poll(Instant::now(), |h| self.known.is_known(h));
        self.metrics.record_poll(&outcome);
        if outcome.timed_out > 0 || outcome.forgotten > 0 {
            debug!(
                fetcher = %self.name,
                timed_out = outcome.timed_out,
                forgotten = outcome.forgotten,
                "Expired item requests"
            );
        }
        for req in outcome.requests {
            debug!(
                fetcher = %self.name,
                peer = %req.peer,
                batch = req.batch,
                hashes = req.hashes.len(),
                "Requesting items"
            );
            let requester = self.requester.clone();
            requests.spawn(async move {
                let result = requester.request_items(req.peer, req.hashes).await;
                (req.batch, result)
            });
        }
    }
}

#[async_trait]
impl FetcherApi for ItemsFetcher {
    fn notify_announces(&self, peer: PeerId, hashes: Vec<Hash>) -> Result<()> {
        ItemsFetcher::notify_announces(self, peer, hashes)
    }

    async fn notify_received(&self, hashes: Vec<Hash>) -> Result<()> {
        ItemsFetcher::notify_received(self, hashes).await
    }

    fn overloaded(&self) -> bool {
        ItemsFetcher::overloaded(self)
    }
}
