//! In-memory transaction pool.

use parking_lot::RwLock;
use shared_types::{Address, Hash, Transaction};
use std::collections::{BTreeMap, HashMap};
use ts_03_emitter::TxPool;
use ts_06_items_fetcher::KnownItems;

use super::ItemSource;

#[derive(Default)]
struct PoolInner {
    by_hash: HashMap<Hash, Transaction>,
    by_sender: HashMap<Address, BTreeMap<u64, Hash>>,
}

/// Pending transactions keyed by hash and by (sender, nonce).
pub struct MemoryTxPool {
    inner: RwLock<PoolInner>,
    capacity: usize,
}

impl MemoryTxPool {
    /// Pool holding at most `capacity` transactions.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: RwLock::new(PoolInner::default()),
            capacity,
        }
    }

    /// Add a transaction. `false` if it is known, full, or replaces a
    /// pending nonce of its sender.
    pub fn add(&self, tx: Transaction) -> bool {
        let mut inner = self.inner.write();
        if inner.by_hash.contains_key(&tx.hash) || inner.by_hash.len() >= self.capacity {
            return false;
        }
        let nonces = inner.by_sender.entry(tx.sender).or_default();
        if nonces.contains_key(&tx.nonce) {
            return false;
        }
        nonces.insert(tx.nonce, tx.hash);
        inner.by_hash.insert(tx.hash, tx);
        true
    }

    /// Drop transactions, e.g. once they are included in a confirmed event.
    pub fn remove(&self, hashes: &[Hash]) {
        let mut inner = self.inner.write();
        for hash in hashes {
            let Some(tx) = inner.by_hash.remove(hash) else {
                continue;
            };
            if let Some(nonces) = inner.by_sender.get_mut(&tx.sender) {
                nonces.remove(&tx.nonce);
                if nonces.is_empty() {
                    inner.by_sender.remove(&tx.sender);
                }
            }
        }
    }
}

impl TxPool for MemoryTxPool {
    fn pending(&self) -> HashMap<Address, Vec<Transaction>> {
        let inner = self.inner.read();
        inner
            .by_sender
            .iter()
            .map(|(sender, nonces)| {
                let txs = nonces
                    .values()
                    .filter_map(|h| inner.by_hash.get(h))
                    .cloned()
                    .collect();
                (*sender, txs)
            })
            .collect()
    }

    fn has(&self, hash: &Hash) -> bool {
        self.inner.read().by_hash.contains_key(hash)
    }

    fn count(&self) -> usize {
        self.inner.read().by_hash.len()
    }
}

impl KnownItems for MemoryTxPool {
    fn is_known(&self, hash: &Hash) -> bool {
        self.has(hash)
    }
}

impl ItemSource<Transaction> for MemoryTxPool {
    fn get_items(&self, hashes: &[Hash]) -> Vec<Transaction> {
        let inner = self.inner.read();
        hashes
            .iter()
            .filter_map(|h| inner.by_hash.get(h))
            .cloned()
            .collect()
    }
}
