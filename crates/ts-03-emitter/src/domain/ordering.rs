//! Pending transactions ordered by price across senders and by nonce within
//! a sender.

use shared_types::{Address, Transaction};
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, VecDeque};

struct Head(Transaction);

impl PartialEq for Head {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Head {}

impl PartialOrd for Head {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Head {
    // Highest price first; equal prices by lowest hash.
    fn cmp(&self, other: &Self) -> Ordering {
        self.0
            .gas_price
            .cmp(&other.0.gas_price)
            .then_with(|| other.0.hash.cmp(&self.0.hash))
    }
}

/// Cursor over pending transactions.
///
/// Only the lowest-nonce transaction of each sender is a candidate, so a
/// sender's transactions are always visited in nonce order.
pub struct TxsByPriceAndNonce {
    heads: BinaryHeap<Head>,
    rest: HashMap<Address, VecDeque<Transaction>>,
}

impl TxsByPriceAndNonce {
    /// Build from per-sender transaction lists in any order.
    pub fn new(pending: HashMap<Address, Vec<Transaction>>) -> Self {
        let mut heads = BinaryHeap::with_capacity(pending.len());
        let mut rest = HashMap::with_capacity(pending.len());
        for (sender, mut txs) in pending {
            txs.sort_by_key(|tx| tx.nonce);
            let mut queue: VecDeque<Transaction> = txs.into();
            if let Some(first) = queue.pop_front() {
                heads.push(Head(first));
                rest.insert(sender, queue);
            }
        }
        Self { heads, rest }
    }

    /// Best remaining candidate.
    pub fn peek(&self) -> Option<&Transaction> {
        self.heads.peek().map(|h| &h.0)
    }

    /// Accept the current candidate and move on to the sender's next nonce.
    pub fn shift(&mut self) {
        if let Some(Head(tx)) = self.heads.pop() {
            if let Some(next) = self.rest.get_mut(&tx.sender).and_then(VecDeque::pop_front) {
                self.heads.push(Head(next));
            }
        }
    }

    /// Drop the current candidate together with the rest of its sender's
    /// transactions, which could not execute without it.
    pub fn pop(&mut self) {
        if let Some(Head(tx)) = self.heads.pop() {
            self.rest.remove(&tx.sender);
        }
    }

    /// Whether no candidates remain.
    pub fn is_empty(&self) -> bool {
        self.heads.is_empty()
    }
}
