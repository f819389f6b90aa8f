//! Two-dimensional (count, byte size) quantities used by flow control.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Sub};

/// An amount of buffered data: number of items and their total byte size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct Metric {
    /// Item count.
    pub num: u64,
    /// Total size in bytes.
    pub size: u64,
}

impl Metric {
    /// Zero items, zero bytes.
    pub const ZERO: Metric = Metric { num: 0, size: 0 };

    /// Construct a metric.
    pub const fn new(num: u64, size: u64) -> Self {
        Self { num, size }
    }

    /// Whether both dimensions are within `limit`.
    pub fn fits_in(&self, limit: &Metric) -> bool {
        self.num <= limit.num && self.size <= limit.size
    }

    /// Both dimensions multiplied by `factor`, saturating.
    pub fn saturating_mul(&self, factor: u64) -> Metric {
        Metric::new(
            self.num.saturating_mul(factor),
            self.size.saturating_mul(factor),
        )
    }

    /// Dimension-wise subtraction, `None` on underflow of either dimension.
    pub fn checked_sub(&self, rhs: Metric) -> Option<Metric> {
        Some(Metric::new(
            self.num.checked_sub(rhs.num)?,
            self.size.checked_sub(rhs.size)?,
        ))
    }

    /// Scale both dimensions by `target / base`, as done when sizing
    /// defaults to the configured cache budget.
    pub fn scaled(&self, target: u64, base: u64) -> Metric {
        if base == 0 {
            return *self;
        }
        let scale = |v: u64| -> u64 {
            u64::try_from(u128::from(v) * u128::from(target) / u128::from(base))
                .unwrap_or(u64::MAX)
        };
        Metric::new(scale(self.num), scale(self.size))
    }
}

impl Add for Metric {
    type Output = Metric;

    fn add(self, rhs: Metric) -> Metric {
        Metric::new(
            self.num.saturating_add(rhs.num),
            self.size.saturating_add(rhs.size),
        )
    }
}

impl AddAssign for Metric {
    fn add_assign(&mut self, rhs: Metric) {
        *self = *self + rhs;
    }
}

impl Sub for Metric {
    type Output = Metric;

    fn sub(self, rhs: Metric) -> Metric {
        Metric::new(
            self.num.saturating_sub(rhs.num),
            self.size.saturating_sub(rhs.size),
        )
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{num={}, size={}}}", self.num, self.size)
    }
}
