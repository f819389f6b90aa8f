//! Seeder: answers chunk requests from the local store.

use async_trait::async_trait;
use shared_types::{Metric, PeerId};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, warn};
use ts_04_flow_control::{DataSemaphore, SemaphorePermit};

use crate::config::SeederConfig;
use crate::domain::{ChunkRequest, ChunkResponse, StreamItem, StreamKind};
use crate::error::SeederError;
use crate::metrics::SeederMetrics;
use crate::ports::{ServeApi, StreamStore};

/// A response together with its outbound budget. The budget is returned
/// when the response is consumed or dropped, i.e. once it is sent.
#[derive(Debug)]
pub struct ServedChunk<I> {
    response: ChunkResponse<I>,
    permit: SemaphorePermit,
}

impl<I> ServedChunk<I> {
    /// Response being sent.
    pub fn response(&self) -> &ChunkResponse<I> {
        &self.response
    }

    /// Outbound budget held.
    pub fn weight(&self) -> Metric {
        self.permit.weight()
    }

    /// Hand over the response, releasing the outbound budget.
    pub fn into_response(self) -> ChunkResponse<I> {
        self.response
    }
}

/// Serving side of one stream.
pub struct StreamSeeder<I> {
    kind: StreamKind,
    config: SeederConfig,
    store: Arc<dyn StreamStore<I>>,
    outbound: Arc<DataSemaphore>,
    senders: Semaphore,
    metrics: SeederMetrics,
}

impl<I: StreamItem> StreamSeeder<I> {
    /// Seeder of `kind` reading from `store`, never holding more unsent
    /// data than `outbound` allows.
    pub fn new(
        kind: StreamKind,
        config: SeederConfig,
        store: Arc<dyn StreamStore<I>>,
        outbound: Arc<DataSemaphore>,
    ) -> Self {
        let senders = Semaphore::new(config.max_senders);
        Self {
            kind,
            config,
            store,
            outbound,
            senders,
            metrics: SeederMetrics::new(),
        }
    }

    /// Stream served.
    pub fn kind(&self) -> StreamKind {
        self.kind
    }

    /// Counters.
    pub fn metrics(&self) -> &SeederMetrics {
        &self.metrics
    }

    /// Answer `req` with the items at `req.start..`, at most the requested
    /// count and size and never more than the response caps. Fewer items
    /// at the store's tail is not an error; an empty response tells the
    /// leecher there is nothing more.
    pub async fn serve(&self, peer: PeerId, req: ChunkRequest) -> Result<ServedChunk<I>, SeederError> {
        if req.kind != self.kind {
            self.metrics.record_invalid_request();
            return Err(SeederError::KindMismatch {
                expected: self.kind,
                got: req.kind,
            });
        }
        if req.limit.num == 0 || req.limit.size == 0 {
            self.metrics.record_invalid_request();
            return Err(SeederError::EmptyRequest);
        }

        let _sender = self.senders.try_acquire().map_err(|_| {
            self.metrics.record_busy();
            SeederError::TooManySenders
        })?;

        let cap = self.config.response_limit();
        let limit = Metric::new(req.limit.num.min(cap.num), req.limit.size.min(cap.size));
        let mut items = self.store.read_range(req.start, limit.num, limit.size);
        let size = truncate_to_size(&mut items, limit);
        let weight = Metric::new(items.len() as u64, size);

        let permit = self
            .outbound
            .acquire_permit(weight, self.config.permit_timeout())
            .await
            .map_err(|err| {
                self.metrics.record_busy();
                warn!(stream = %self.kind, %peer, %weight, error = %err, "Outbound budget exhausted");
                SeederError::Busy(err)
            })?;

        debug!(
            stream = %self.kind,
            %peer,
            start = req.start,
            items = weight.num,
            bytes = weight.size,
            "Serving chunk"
        );
        self.metrics.record_served(weight.num, weight.size);
        Ok(ServedChunk {
            response: ChunkResponse {
                session: req.session,
                kind: self.kind,
                start: req.start,
                items,
            },
            permit,
        })
    }
}

/// Cut `items` to `limit`, keeping at least one item so a single large
/// item never blocks the stream. Returns the total size kept.
fn truncate_to_size<I: StreamItem>(items: &mut Vec<I>, limit: Metric) -> u64 {
    items.truncate(limit.num as usize);
    let mut total = 0u64;
    let mut keep = 0usize;
    for item in items.iter() {
        let next = total.saturating_add(item.encoded_size());
        if keep > 0 && next > limit.size {
            break;
        }
        total = next;
        keep += 1;
    }
    items.truncate(keep);
    total
}

#[async_trait]
impl<I: StreamItem> ServeApi<I> for StreamSeeder<I> {
    async fn serve(&self, peer: PeerId, req: ChunkRequest) -> Result<ServedChunk<I>, SeederError> {
        StreamSeeder::serve(self, peer, req).await
    }
}
