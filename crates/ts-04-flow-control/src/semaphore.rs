//! Dual-limit semaphore.

use parking_lot::Mutex;
use shared_types::Metric;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;
use tracing::{debug, error};

use crate::error::{Result, SemaphoreError};
use crate::metrics::Metrics;

#[derive(Debug, Default)]
struct State {
    processing: Metric,
    closed: bool,
}

/// Counting gate over item count and byte size.
#[derive(Debug)]
pub struct DataSemaphore {
    name: String,
    limit: Metric,
    state: Mutex<State>,
    released: Notify,
    metrics: Metrics,
}

impl DataSemaphore {
    /// Create a semaphore with the given ceilings.
    pub fn new(name: impl Into<String>, limit: Metric) -> Self {
        Self {
            name: name.into(),
            limit,
            state: Mutex::new(State::default()),
            released: Notify::new(),
            metrics: Metrics::new(),
        }
    }

    /// Semaphore name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Ceilings.
    pub fn limit(&self) -> Metric {
        self.limit
    }

    /// Currently held weight.
    pub fn processing(&self) -> Metric {
        self.state.lock().processing
    }

    /// Remaining capacity.
    pub fn available(&self) -> Metric {
        self.limit - self.processing()
    }

    /// Counters.
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    fn check(&self, state: &State, weight: Metric) -> Result<()> {
        if state.closed {
            return Err(SemaphoreError::Closed {
                name: self.name.clone(),
            });
        }
        if !weight.fits_in(&self.limit) {
            return Err(SemaphoreError::WeightOverLimit {
                name: self.name.clone(),
                weight,
                limit: self.limit,
            });
        }
        if state.processing.num.saturating_add(weight.num) > self.limit.num {
            return Err(SemaphoreError::CountExceeded {
                name: self.name.clone(),
                requested: weight.num,
                processing: state.processing.num,
                limit: self.limit.num,
            });
        }
        if state.processing.size.saturating_add(weight.size) > self.limit.size {
            return Err(SemaphoreError::SizeExceeded {
                name: self.name.clone(),
                requested: weight.size,
                processing: state.processing.size,
                limit: self.limit.size,
            });
        }
        Ok(())
    }

    fn grant(&self, weight: Metric) -> Result<()> {
        let mut state = self.state.lock();
        self.check(&state, weight)?;
        state.processing += weight;
        Ok(())
    }

    /// Acquire `weight` without waiting.
    pub fn try_acquire(&self, weight: Metric) -> Result<()> {
        match self.grant(weight) {
            Ok(()) => {
                self.metrics.record_acquired();
                Ok(())
            }
            Err(err) => {
                self.metrics.record_error(&err);
                Err(err)
            }
        }
    }

    /// Acquire `weight`, waiting up to `timeout` for capacity.
    ///
    /// Requests that can never fit and closed semaphores fail immediately.
    pub async fn acquire(&self, weight: Metric, timeout: Duration) -> Result<()> {
        let started = Instant::now();
        let deadline = started + timeout;
        loop {
            // Registered before the check so a release in between is not missed.
            let notified = self.released.notified();
            match self.grant(weight) {
                Ok(()) => {
                    self.metrics.record_acquired();
                    return Ok(());
                }
                Err(err) if err.is_transient() => {
                    debug!(semaphore = %self.name, %weight, reason = err.kind(), "Waiting for capacity");
                }
                Err(err) => {
                    self.metrics.record_error(&err);
                    return Err(err);
                }
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                let err = SemaphoreError::Timeout {
                    name: self.name.clone(),
                    waited: started.elapsed(),
                };
                self.metrics.record_error(&err);
                return Err(err);
            }
        }
    }

    /// Return previously acquired `weight`.
    pub fn release(&self, weight: Metric) -> Result<()> {
        {
            let mut state = self.state.lock();
            match state.processing.checked_sub(weight) {
                Some(rest) => state.processing = rest,
                None => {
                    let err = SemaphoreError::ReleaseUnderflow {
                        name: self.name.clone(),
                        released: weight,
                        processing: state.processing,
                    };
                    drop(state);
                    error!(semaphore = %self.name, %weight, "Semaphore released more than acquired");
                    self.metrics.record_error(&err);
                    return Err(err);
                }
            }
        }
        self.metrics.record_released();
        self.released.notify_waiters();
        Ok(())
    }

    /// Fail all current and future acquisitions. Held weight may still be
    /// released.
    pub fn close(&self) {
        self.state.lock().closed = true;
        self.released.notify_waiters();
        debug!(semaphore = %self.name, "Semaphore closed");
    }

    /// Acquire without waiting and return a guard releasing on drop.
    pub fn try_acquire_permit(self: &Arc<Self>, weight: Metric) -> Result<SemaphorePermit> {
        self.try_acquire(weight)?;
        Ok(SemaphorePermit::new(self.clone(), weight))
    }

    /// Acquire with a bounded wait and return a guard releasing on drop.
    pub async fn acquire_permit(
        self: &Arc<Self>,
        weight: Metric,
        timeout: Duration,
    ) -> Result<SemaphorePermit> {
        self.acquire(weight, timeout).await?;
        Ok(SemaphorePermit::new(self.clone(), weight))
    }
}

/// Held weight that is released exactly once, on drop or via
/// [`SemaphorePermit::release`].
#[derive(Debug)]
pub struct SemaphorePermit {
    semaphore: Arc<DataSemaphore>,
    weight: Metric,
    released: bool,
}

impl SemaphorePermit {
    fn new(semaphore: Arc<DataSemaphore>, weight: Metric) -> Self {
        Self {
            semaphore,
            weight,
            released: false,
        }
    }

    /// Held weight.
    pub fn weight(&self) -> Metric {
        self.weight
    }

    /// Release now and report accounting errors.
    pub fn release(mut self) -> Result<()> {
        self.released = true;
        self.semaphore.release(self.weight)
    }
}

impl Drop for SemaphorePermit {
    fn drop(&mut self) {
        if !self.released {
            // Failures are already logged and counted by the semaphore.
            let _ = self.semaphore.release(self.weight);
        }
    }
}
