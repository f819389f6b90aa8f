//! # Announce -> request -> delivery
//!
//! The transaction fetcher asks announcing peers for unknown hashes and
//! moves on to the next announcer when a peer does not deliver in time.

use std::sync::Arc;
use std::time::Duration;

use node_runtime::adapters::{Delivery, MemoryTxPool, PeerItemRequester};
use shared_types::{Hash, NodeId, Transaction, U256};
use tokio::sync::{mpsc, watch};
use ts_03_emitter::TxPool;
use ts_06_items_fetcher::{FetcherConfig, ItemsFetcher};

const SILENT: NodeId = NodeId([3; 32]);
const HONEST: NodeId = NodeId([4; 32]);

fn tx(nonce: u64) -> Transaction {
    Transaction::new([1; 20], Some([2; 20]), nonce, 21_000, U256::from(1u64), vec![])
}

struct Harness {
    fetcher: Arc<ItemsFetcher>,
    local: Arc<MemoryTxPool>,
    deliveries: mpsc::Receiver<Delivery<Transaction>>,
    shutdown: watch::Sender<bool>,
}

/// `HONEST` holds `txs`; `SILENT` is linked but holds nothing.
fn harness(txs: &[Transaction]) -> Harness {
    let honest = Arc::new(MemoryTxPool::new(64));
    for tx in txs {
        honest.add(tx.clone());
    }
    let (deliver, deliveries) = mpsc::channel(16);
    let requester = Arc::new(PeerItemRequester::new(deliver));
    requester.connect(HONEST, honest);
    requester.connect(SILENT, Arc::new(MemoryTxPool::new(64)));

    let local = Arc::new(MemoryTxPool::new(64));
    let fetcher = Arc::new(ItemsFetcher::new(
        "txs",
        FetcherConfig::for_testing(),
        requester,
        local.clone(),
    ));
    let (shutdown, rx) = watch::channel(false);
    tokio::spawn(fetcher.clone().run(rx));
    Harness {
        fetcher,
        local,
        deliveries,
        shutdown,
    }
}

impl Harness {
    /// Take one delivery into the local pool, as inbound processing does.
    async fn accept_delivery(&mut self) -> Delivery<Transaction> {
        let delivery = tokio::time::timeout(Duration::from_secs(5), self.deliveries.recv())
            .await
            .expect("delivery in time")
            .expect("requester alive");
        let hashes: Vec<Hash> = delivery.items.iter().map(|tx| tx.hash).collect();
        for tx in &delivery.items {
            self.local.add(tx.clone());
        }
        self.fetcher.notify_received(hashes).await.unwrap();
        delivery
    }
}

#[tokio::test]
async fn test_announced_txs_are_fetched() {
    let txs: Vec<_> = (0..3).map(tx).collect();
    let mut h = harness(&txs);

    h.fetcher
        .notify_announces(HONEST, txs.iter().map(|t| t.hash).collect())
        .unwrap();

    let mut got = Vec::new();
    while got.len() < txs.len() {
        let delivery = h.accept_delivery().await;
        assert_eq!(delivery.peer, HONEST);
        got.extend(delivery.items);
    }
    for t in &txs {
        assert!(h.local.has(&t.hash));
    }
    let m = h.fetcher.metrics().snapshot();
    assert_eq!(m.announces_accepted, 3);
    assert_eq!(m.hashes_requested, 3);
    h.shutdown.send(true).unwrap();
}

#[tokio::test]
async fn test_known_hashes_are_not_requested() {
    let txs: Vec<_> = (0..2).map(tx).collect();
    let mut h = harness(&txs);
    h.local.add(txs[0].clone());

    h.fetcher
        .notify_announces(HONEST, txs.iter().map(|t| t.hash).collect())
        .unwrap();

    let delivery = h.accept_delivery().await;
    assert_eq!(delivery.items, vec![txs[1].clone()]);
    let m = h.fetcher.metrics().snapshot();
    assert_eq!(m.announces_known, 1);
    assert_eq!(m.hashes_requested, 1);
    h.shutdown.send(true).unwrap();
}

#[tokio::test]
async fn test_silent_announcer_is_replaced_by_the_next() {
    let wanted = tx(9);
    let mut h = harness(std::slice::from_ref(&wanted));

    h.fetcher.notify_announces(SILENT, vec![wanted.hash]).unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    h.fetcher.notify_announces(HONEST, vec![wanted.hash]).unwrap();

    let delivery = h.accept_delivery().await;
    assert_eq!(delivery.peer, HONEST);
    assert_eq!(delivery.items, vec![wanted.clone()]);
    let m = h.fetcher.metrics().snapshot();
    assert!(m.arrive_timeouts >= 1);
    assert!(m.requests_sent >= 2);
    h.shutdown.send(true).unwrap();
}
