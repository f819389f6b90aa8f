//! Nanosecond timestamps and injectable clocks.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Unix time in nanoseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub struct Timestamp(pub u64);

impl Timestamp {
    /// Construct from nanoseconds.
    pub const fn from_nanos(nanos: u64) -> Self {
        Self(nanos)
    }

    /// Construct from milliseconds.
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis.saturating_mul(1_000_000))
    }

    /// Construct from seconds.
    pub const fn from_secs(secs: u64) -> Self {
        Self(secs.saturating_mul(1_000_000_000))
    }

    /// Nanoseconds since the Unix epoch.
    pub const fn as_nanos(&self) -> u64 {
        self.0
    }

    /// Whole seconds since the Unix epoch.
    pub const fn as_secs(&self) -> u64 {
        self.0 / 1_000_000_000
    }

    /// Time elapsed since `earlier`, zero if `earlier` is later.
    pub fn saturating_duration_since(&self, earlier: Timestamp) -> Duration {
        Duration::from_nanos(self.0.saturating_sub(earlier.0))
    }

    /// Add a duration, saturating at the maximum representable time.
    pub fn saturating_add(&self, d: Duration) -> Timestamp {
        let nanos = u64::try_from(d.as_nanos()).unwrap_or(u64::MAX);
        Timestamp(self.0.saturating_add(nanos))
    }

    /// Subtract a duration, saturating at zero.
    pub fn saturating_sub(&self, d: Duration) -> Timestamp {
        let nanos = u64::try_from(d.as_nanos()).unwrap_or(u64::MAX);
        Timestamp(self.0.saturating_sub(nanos))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:09}", self.0 / 1_000_000_000, self.0 % 1_000_000_000)
    }
}

/// Abstraction over the wall clock so time-dependent logic stays testable.
pub trait TimeSource: Send + Sync {
    /// Current time.
    fn now(&self) -> Timestamp;
}

/// Time source backed by the system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&self) -> Timestamp {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| u64::try_from(d.as_nanos()).unwrap_or(u64::MAX))
            .unwrap_or(0);
        Timestamp(nanos)
    }
}

/// A time source that returns a settable timestamp.
///
/// # Example
///
/// ```rust
/// use shared_types::{FixedTimeSource, TimeSource, Timestamp};
///
/// let time = FixedTimeSource::new(Timestamp::from_secs(12345));
/// assert_eq!(time.now().as_secs(), 12345);
/// ```
#[derive(Debug, Default)]
pub struct FixedTimeSource {
    nanos: std::sync::atomic::AtomicU64,
}

impl FixedTimeSource {
    /// Create a time source frozen at `at`.
    pub fn new(at: Timestamp) -> Self {
        Self {
            nanos: std::sync::atomic::AtomicU64::new(at.0),
        }
    }

    /// Move the clock to `at`.
    pub fn set(&self, at: Timestamp) {
        self.nanos
            .store(at.0, std::sync::atomic::Ordering::SeqCst);
    }

    /// Move the clock forward.
    pub fn advance(&self, d: Duration) {
        let next = self.now().saturating_add(d);
        self.set(next);
    }
}

impl TimeSource for FixedTimeSource {
    fn now(&self) -> Timestamp {
        Timestamp(self.nanos.load(std::sync::atomic::Ordering::SeqCst))
    }
}
