//! Leecher: pulls a stream from peers in parallel chunks and applies it
//! to the local store in index order.

use async_trait::async_trait;
use parking_lot::Mutex;
use shared_types::{Metric, PeerId};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};
use ts_04_flow_control::{DataSemaphore, SemaphoreError, SemaphorePermit};

use crate::config::LeecherConfig;
use crate::domain::{ChunkResponse, Session, SessionInfo, StreamItem, StreamKind};
use crate::error::{LeecherError, SessionError, TransportError};
use crate::metrics::LeecherMetrics;
use crate::ports::{ChunkTransport, ItemValidator, PeerPenalizer, PeerSource, StreamStore, SyncApi};

/// Collaborators of a leecher.
pub struct LeecherDeps<I> {
    /// Network
    pub transport: Arc<dyn ChunkTransport<I>>,
    /// Local stream storage
    pub store: Arc<dyn StreamStore<I>>,
    /// Item admission
    pub validator: Arc<dyn ItemValidator<I>>,
    /// Peer punishment
    pub penalizer: Arc<dyn PeerPenalizer>,
    /// Stream-wide inbound budget
    pub semaphore: Arc<DataSemaphore>,
}

impl<I> Clone for LeecherDeps<I> {
    fn clone(&self) -> Self {
        Self {
            transport: self.transport.clone(),
            store: self.store.clone(),
            validator: self.validator.clone(),
            penalizer: self.penalizer.clone(),
            semaphore: self.semaphore.clone(),
        }
    }
}

/// Outcome of a finished session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SyncReport {
    /// Peer synced with
    pub peer: PeerId,
    /// Stream
    pub kind: StreamKind,
    /// Items applied during the session
    pub applied: u64,
    /// Next index after the session
    pub cursor: u64,
    /// Restarts performed
    pub restarts: u32,
}

struct SessionHandle {
    cancel: watch::Sender<bool>,
    info: Arc<Mutex<SessionInfo>>,
}

type Registry = Mutex<HashMap<PeerId, SessionHandle>>;

/// Unregisters a session however its future ends.
struct Registration<'a> {
    registry: &'a Registry,
    peer: PeerId,
}

impl Drop for Registration<'_> {
    fn drop(&mut self) {
        self.registry.lock().remove(&self.peer);
    }
}

/// Budget held by one outstanding chunk.
struct ChunkPermits {
    _session: SemaphorePermit,
    _stream: SemaphorePermit,
}

type Flight<I> = (u64, Result<ChunkResponse<I>, TransportError>);

/// Pull side of one stream.
pub struct StreamLeecher<I> {
    kind: StreamKind,
    config: LeecherConfig,
    deps: LeecherDeps<I>,
    sessions: Registry,
    metrics: LeecherMetrics,
}

impl<I: StreamItem> StreamLeecher<I> {
    /// Leecher of `kind`.
    pub fn new(kind: StreamKind, config: LeecherConfig, deps: LeecherDeps<I>) -> Self {
        Self {
            kind,
            config,
            deps,
            sessions: Mutex::new(HashMap::new()),
            metrics: LeecherMetrics::new(),
        }
    }

    /// Stream replicated.
    pub fn kind(&self) -> StreamKind {
        self.kind
    }

    /// Counters.
    pub fn metrics(&self) -> &LeecherMetrics {
        &self.metrics
    }

    /// Running sessions.
    pub fn sessions(&self) -> Vec<SessionInfo> {
        self.sessions
            .lock()
            .values()
            .map(|h| h.info.lock().clone())
            .collect()
    }

    /// Cancel the session with `peer`. Its in-flight requests are
    /// abandoned and its budget released.
    pub fn peer_disconnected(&self, peer: PeerId) {
        if let Some(handle) = self.sessions.lock().get(&peer) {
            let _ = handle.cancel.send(true);
        }
    }

    /// Sync with `peer` from the store's next index until the peer has
    /// nothing more.
    pub async fn sync(&self, peer: PeerId) -> Result<SyncReport, LeecherError> {
        let session = Session::new(peer, self.kind, self.deps.store.next_index(), Instant::now());
        let info = Arc::new(Mutex::new(session.info()));
        let (cancel, mut cancelled) = watch::channel(false);
        let _registration = {
            let mut sessions = self.sessions.lock();
            if sessions.contains_key(&peer) {
                return Err(LeecherError::AlreadySyncing {
                    peer,
                    kind: self.kind,
                });
            }
            sessions.insert(
                peer,
                SessionHandle {
                    cancel,
                    info: info.clone(),
                },
            );
            Registration {
                registry: &self.sessions,
                peer,
            }
        };

        self.metrics.record_session_started();
        info!(stream = %self.kind, %peer, from = session.cursor(), "Sync session started");

        let result = tokio::select! {
            result = self.drive(peer, session, &info) => result,
            _ = cancelled.changed() => Err(LeecherError::Cancelled),
        };

        match &result {
            Ok(report) => {
                self.metrics.record_session_completed();
                info!(
                    stream = %self.kind,
                    %peer,
                    applied = report.applied,
                    cursor = report.cursor,
                    restarts = report.restarts,
                    "Sync session completed"
                );
            }
            Err(LeecherError::Cancelled) => {
                self.metrics.record_session_cancelled();
                info!(stream = %self.kind, %peer, "Sync session cancelled");
            }
            Err(err @ LeecherError::Abandoned { .. }) => {
                self.metrics.record_session_abandoned();
                warn!(stream = %self.kind, %peer, error = %err, "Sync session abandoned");
            }
            Err(err) => {
                warn!(stream = %self.kind, %peer, error = %err, kind = err.kind(), "Sync session failed");
            }
        }
        result
    }

    async fn drive(
        &self,
        peer: PeerId,
        mut session: Session<I>,
        info: &Mutex<SessionInfo>,
    ) -> Result<SyncReport, LeecherError> {
        let plan = self.config.plan();
        let buffer = Arc::new(DataSemaphore::new(
            format!("{}-session-{}", self.kind, peer),
            self.config.session_buffer,
        ));
        let mut inflight: JoinSet<Flight<I>> = JoinSet::new();
        let mut permits: HashMap<u64, ChunkPermits> = HashMap::new();
        let mut restart_after = self.config.min_session_restart();
        let mut applied = 0u64;
        let mut retry_at = Instant::now();

        loop {
            let planned = if Instant::now() >= retry_at {
                session.plan_requests(&plan)
            } else {
                Vec::new()
            };
            if !planned.is_empty() {
                *info.lock() = session.info();
            }
            let mut requests = planned.into_iter();
            while let Some(req) = requests.next() {
                let held = match self.chunk_permits(&buffer, req.limit, inflight.is_empty()).await {
                    Ok(held) => held,
                    Err(err) => {
                        self.metrics.record_permit_timeout();
                        debug!(stream = %self.kind, %peer, start = req.start, error = %err, "Deferring chunk request");
                        session.requeue(req.start);
                        for rest in requests.by_ref() {
                            session.requeue(rest.start);
                        }
                        break;
                    }
                };
                permits.insert(req.start, held);
                self.metrics.record_chunk_requested();
                debug!(stream = %self.kind, %peer, start = req.start, limit = %req.limit, "Requesting chunk");

                let transport = self.deps.transport.clone();
                let timeout = self.config.request_timeout();
                inflight.spawn(async move {
                    let start = req.start;
                    let result = tokio::time::timeout(timeout, transport.request(peer, req))
                        .await
                        .unwrap_or(Err(TransportError::Timeout));
                    (start, result)
                });
            }
            session.requests_issued();
            *info.lock() = session.info();

            let now = Instant::now();
            let mut wake = session.last_progress() + restart_after;
            if retry_at > now {
                wake = wake.min(retry_at);
            } else if inflight.is_empty() {
                wake = wake.min(now + self.config.recheck_interval());
            }

            tokio::select! {
                joined = inflight.join_next(), if !inflight.is_empty() => match joined {
                    Some(Ok((start, Ok(response)))) => {
                        self.on_response(peer, &mut session, &mut permits, start, response)?;
                    }
                    Some(Ok((start, Err(err)))) => {
                        self.metrics.record_request_failure();
                        debug!(stream = %self.kind, %peer, start, error = %err, "Chunk request failed");
                        session.requeue(start);
                        permits.remove(&start);
                        retry_at = Instant::now() + self.config.recheck_interval();
                    }
                    Some(Err(err)) => {
                        self.metrics.record_request_failure();
                        error!(stream = %self.kind, %peer, error = %err, "Chunk request task failed");
                    }
                    None => {}
                },
                _ = tokio::time::sleep_until(wake) => {}
            }

            while let Some((start, items)) = session.take_ready() {
                let count = items.len() as u64;
                if let Err(rejection) = self.deps.validator.validate_chunk(start, &items) {
                    self.metrics.record_invalid_chunk();
                    if rejection.penalize {
                        self.deps.penalizer.penalize(peer, &rejection.reason);
                    }
                    return Err(LeecherError::InvalidChunk {
                        start,
                        index: rejection.index,
                        reason: rejection.reason,
                    });
                }
                self.deps.store.apply(start, items)?;
                session.confirm_applied(start, count, Instant::now());
                permits.remove(&start);
                restart_after = self.config.min_session_restart();
                applied += count;
                self.metrics.record_chunk_applied(count);
                debug!(stream = %self.kind, %peer, start, count, "Chunk applied");
            }

            if session.is_done() {
                return Ok(SyncReport {
                    peer,
                    kind: self.kind,
                    applied,
                    cursor: session.cursor(),
                    restarts: session.restarts(),
                });
            }

            let now = Instant::now();
            if session.is_stalled(now, restart_after) {
                if session.restarts() >= self.config.max_session_restarts {
                    return Err(LeecherError::Abandoned {
                        restarts: session.restarts(),
                    });
                }
                session.mark_stalled();
                *info.lock() = session.info();
                // Dropping the set aborts requests of the old incarnation.
                inflight = JoinSet::new();
                permits.clear();
                let from = session.cursor().max(self.deps.store.next_index());
                session.restart(from, now);
                retry_at = now;
                self.metrics.record_restart();
                warn!(
                    stream = %self.kind,
                    %peer,
                    from,
                    restarts = session.restarts(),
                    stalled_for = ?restart_after,
                    "Sync session stalled, restarting"
                );
                restart_after = (restart_after * 2).min(self.config.max_session_restart());
            }
        }
    }

    fn on_response(
        &self,
        peer: PeerId,
        session: &mut Session<I>,
        permits: &mut HashMap<u64, ChunkPermits>,
        start: u64,
        response: ChunkResponse<I>,
    ) -> Result<(), LeecherError> {
        match session.on_response(response) {
            Ok(()) => {
                if !session.is_buffered(start) {
                    permits.remove(&start);
                }
                Ok(())
            }
            Err(SessionError::StaleResponse) => {
                self.metrics.record_stale_response();
                debug!(stream = %self.kind, %peer, start, "Dropping stale response");
                Ok(())
            }
            Err(err) => {
                self.deps.penalizer.penalize(peer, &err.to_string());
                Err(err.into())
            }
        }
    }

    /// Reserve session and stream budget for a chunk. Waits only when
    /// nothing is in flight; otherwise responses may free capacity first.
    async fn chunk_permits(
        &self,
        buffer: &Arc<DataSemaphore>,
        weight: Metric,
        wait: bool,
    ) -> Result<ChunkPermits, SemaphoreError> {
        if wait {
            let timeout = self.config.permit_timeout();
            let session = buffer.acquire_permit(weight, timeout).await?;
            let stream = self.deps.semaphore.acquire_permit(weight, timeout).await?;
            return Ok(ChunkPermits {
                _session: session,
                _stream: stream,
            });
        }
        let session = buffer.try_acquire_permit(weight)?;
        let stream = self.deps.semaphore.try_acquire_permit(weight)?;
        Ok(ChunkPermits {
            _session: session,
            _stream: stream,
        })
    }

    /// Keep up to `max_sessions` sessions running against the peers of
    /// `peers`, rotating through them, until `shutdown` fires.
    pub async fn run(self: Arc<Self>, peers: Arc<dyn PeerSource>, mut shutdown: watch::Receiver<bool>) {
        let mut tick = tokio::time::interval(self.config.recheck_interval());
        let mut tasks = JoinSet::new();
        let mut rotation = 0usize;
        info!(stream = %self.kind, "Leecher started");

        loop {
            tokio::select! {
                _ = tick.tick() => {
                    let candidates = peers.peers();
                    let n = candidates.len();
                    let first = rotation;
                    for offset in 0..n {
                        if tasks.len() >= self.config.max_sessions {
                            break;
                        }
                        let peer = candidates[(first + offset) % n];
                        if self.sessions.lock().contains_key(&peer) {
                            continue;
                        }
                        rotation = (first + offset + 1) % n;
                        let this = self.clone();
                        tasks.spawn(async move {
                            let _ = this.sync(peer).await;
                        });
                    }
                }
                Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
                _ = shutdown.changed() => {
                    info!(stream = %self.kind, "Leecher shutting down");
                    break;
                }
            }
        }
        tasks.shutdown().await;
    }
}

#[async_trait]
impl<I: StreamItem> SyncApi for StreamLeecher<I> {
    fn kind(&self) -> StreamKind {
        self.kind
    }

    async fn sync(&self, peer: PeerId) -> Result<SyncReport, LeecherError> {
        StreamLeecher::sync(self, peer).await
    }

    fn sessions(&self) -> Vec<SessionInfo> {
        StreamLeecher::sessions(self)
    }

    fn peer_disconnected(&self, peer: PeerId) {
        StreamLeecher::peer_disconnected(self, peer)
    }
}
