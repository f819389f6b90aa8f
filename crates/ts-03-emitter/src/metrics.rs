//! Metrics collection for event emission

use std::sync::atomic::{AtomicU64, Ordering};

use crate::domain::AddTxsReport;

/// Emitter counters.
#[derive(Debug, Default)]
pub struct Metrics {
    /// Events emitted
    pub events_emitted: AtomicU64,

    /// Ticks that did not emit because of interval throttling
    pub emit_throttled: AtomicU64,

    /// Ticks that did not emit for lack of gas power
    pub emit_no_gas_power: AtomicU64,

    /// Own events that failed validation
    pub self_check_failures: AtomicU64,

    /// Transactions included
    pub txs_added: AtomicU64,

    /// Skipped: failed epoch rules
    pub txs_skipped_epoch_rules: AtomicU64,

    /// Skipped: gas ceiling
    pub txs_skipped_no_validator_gas: AtomicU64,

    /// Skipped: sender has unconfirmed transactions
    pub txs_skipped_conflicting_sender: AtomicU64,

    /// Skipped: another validator's turn
    pub txs_skipped_not_my_turn: AtomicU64,

    /// Skipped: no longer in the pool
    pub txs_skipped_outdated: AtomicU64,

    /// Offline validators passed over in turn checks
    pub offline_validators_skipped: AtomicU64,
}

/// Point-in-time copy of [`Metrics`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetricsSnapshot {
    /// Events emitted
    pub events_emitted: u64,
    /// Throttled ticks
    pub emit_throttled: u64,
    /// Ticks without gas power
    pub emit_no_gas_power: u64,
    /// Self-check failures
    pub self_check_failures: u64,
    /// Included transactions
    pub txs_added: u64,
    /// Skipped on epoch rules
    pub txs_skipped_epoch_rules: u64,
    /// Skipped on gas ceiling
    pub txs_skipped_no_validator_gas: u64,
    /// Skipped on conflicting sender
    pub txs_skipped_conflicting_sender: u64,
    /// Skipped on turn
    pub txs_skipped_not_my_turn: u64,
    /// Skipped as stale
    pub txs_skipped_outdated: u64,
    /// Offline validators passed over
    pub offline_validators_skipped: u64,
}

impl Metrics {
    /// Create new metrics collector
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an emitted event
    pub fn record_emitted(&self) {
        self.events_emitted.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a throttled tick
    pub fn record_throttled(&self) {
        self.emit_throttled.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a tick without gas power
    pub fn record_no_gas_power(&self) {
        self.emit_no_gas_power.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a self-check failure
    pub fn record_self_check_failure(&self) {
        self.self_check_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Fold in the outcome of one inclusion pass
    pub fn record_add_txs(&self, report: &AddTxsReport) {
        let pairs = [
            (&self.txs_added, report.added),
            (&self.txs_skipped_epoch_rules, report.skipped_epoch_rules),
            (&self.txs_skipped_no_validator_gas, report.skipped_no_validator_gas),
            (&self.txs_skipped_conflicting_sender, report.skipped_conflicting_sender),
            (&self.txs_skipped_not_my_turn, report.skipped_not_my_turn),
            (&self.txs_skipped_outdated, report.skipped_outdated),
            (&self.offline_validators_skipped, report.skipped_offline_validators),
        ];
        for (counter, n) in pairs {
            if n > 0 {
                counter.fetch_add(n, Ordering::Relaxed);
            }
        }
    }

    /// Copy all counters
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            events_emitted: self.events_emitted.load(Ordering::Relaxed),
            emit_throttled: self.emit_throttled.load(Ordering::Relaxed),
            emit_no_gas_power: self.emit_no_gas_power.load(Ordering::Relaxed),
            self_check_failures: self.self_check_failures.load(Ordering::Relaxed),
            txs_added: self.txs_added.load(Ordering::Relaxed),
            txs_skipped_epoch_rules: self.txs_skipped_epoch_rules.load(Ordering::Relaxed),
            txs_skipped_no_validator_gas: self.txs_skipped_no_validator_gas.load(Ordering::Relaxed),
            txs_skipped_conflicting_sender: self
                .txs_skipped_conflicting_sender
                .load(Ordering::Relaxed),
            txs_skipped_not_my_turn: self.txs_skipped_not_my_turn.load(Ordering::Relaxed),
            txs_skipped_outdated: self.txs_skipped_outdated.load(Ordering::Relaxed),
            offline_validators_skipped: self.offline_validators_skipped.load(Ordering::Relaxed),
        }
    }
}
