//! Transactions and gas originated by events that are not yet confirmed.

use shared_types::{Address, Event};
use std::collections::HashMap;

/// Bookkeeping of unconfirmed events known to this node.
///
/// A sender with transactions in an unconfirmed event is not scheduled
/// again until that event is confirmed, so two concurrently built events
/// never race on the same nonce.
#[derive(Debug, Default, Clone)]
pub struct OriginatedTxs {
    senders: HashMap<Address, u32>,
    pending_gas: u64,
}

impl OriginatedTxs {
    /// Empty bookkeeping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a newly connected event.
    pub fn on_event_connected(&mut self, event: &Event) {
        for tx in event.txs() {
            *self.senders.entry(tx.sender).or_insert(0) += 1;
        }
        self.pending_gas = self.pending_gas.saturating_add(event.gas_power_used());
    }

    /// Stop tracking an event that consensus confirmed.
    pub fn on_event_confirmed(&mut self, event: &Event) {
        for tx in event.txs() {
            if let Some(count) = self.senders.get_mut(&tx.sender) {
                *count -= 1;
                if *count == 0 {
                    self.senders.remove(&tx.sender);
                }
            }
        }
        self.pending_gas = self.pending_gas.saturating_sub(event.gas_power_used());
    }

    /// Unconfirmed transactions of `sender`.
    pub fn total_of(&self, sender: &Address) -> u32 {
        self.senders.get(sender).copied().unwrap_or(0)
    }

    /// Gas used by unconfirmed events.
    pub fn pending_gas(&self) -> u64 {
        self.pending_gas
    }

    /// Forget everything, e.g. on epoch change.
    pub fn clear(&mut self) {
        self.senders.clear();
        self.pending_gas = 0;
    }
}
