//! Parallel batch validation on a bounded worker pool.

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use shared_types::Event;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

use crate::config::HeavyCheckConfig;
use crate::domain::checker::Checker;
use crate::domain::errors::CheckError;

/// Batch submission failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BatchError {
    /// Accepting the batch would exceed the queue bound.
    #[error("heavy check queue full: {queued} queued, {requested} requested, limit {limit}")]
    QueueFull {
        /// Tasks already queued
        queued: usize,
        /// Tasks in the rejected batch
        requested: usize,
        /// Queue bound
        limit: usize,
    },

    /// The worker pool could not be started.
    #[error("failed to build worker pool: {0}")]
    PoolInit(String),
}

/// One event with its parents.
pub type Task = (Event, Vec<Event>);

/// Runs one checker (normally Heavy) over batches of events in parallel.
pub struct HeavyCheckPool {
    pool: ThreadPool,
    checker: Arc<dyn Checker>,
    queued: AtomicUsize,
    max_queued: usize,
}

impl HeavyCheckPool {
    /// Start the pool.
    pub fn new(config: &HeavyCheckConfig, checker: Arc<dyn Checker>) -> Result<Self, BatchError> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(config.threads)
            .thread_name(|i| format!("heavy-check-{i}"))
            .build()
            .map_err(|e| BatchError::PoolInit(e.to_string()))?;
        Ok(Self {
            pool,
            checker,
            queued: AtomicUsize::new(0),
            max_queued: config.max_queued_tasks,
        })
    }

    /// Tasks currently queued or running.
    pub fn queued(&self) -> usize {
        self.queued.load(Ordering::Acquire)
    }

    /// Validate every task; results keep the input order. Blocks the
    /// calling thread until the batch completes.
    pub fn validate_batch(&self, tasks: &[Task]) -> Result<Vec<Result<(), CheckError>>, BatchError> {
        let requested = tasks.len();
        let reserved = self
            .queued
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |q| {
                (q + requested <= self.max_queued).then_some(q + requested)
            });
        if let Err(queued) = reserved {
            warn!(queued, requested, limit = self.max_queued, "Heavy check queue full");
            return Err(BatchError::QueueFull {
                queued,
                requested,
                limit: self.max_queued,
            });
        }

        let checker = &self.checker;
        let results = self.pool.install(|| {
            tasks
                .par_iter()
                .map(|(event, parents)| checker.validate(event, parents))
                .collect()
        });
        self.queued.fetch_sub(requested, Ordering::AcqRel);
        Ok(results)
    }
}
