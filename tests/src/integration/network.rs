//! # Several nodes in one process
//!
//! Events and transactions cross nodes that are not directly linked,
//! relayed hop by hop through announcements and fetching.

use std::sync::Arc;

use node_runtime::{GossipConfig, GossipNode, NodeDeps};
use shared_types::{NodeId, Transaction, ValidatorId, U256};
use tokio::sync::watch;
use tokio::task::JoinSet;
use ts_03_emitter::{DagReader, TxPool};

use crate::fixtures::{wait_until, Devnet};

fn node(net: &Devnet, tag: u8, validator: Option<u32>) -> Arc<GossipNode> {
    GossipNode::new(
        GossipConfig::for_testing(ValidatorId(validator.unwrap_or(0))),
        NodeDeps {
            id: NodeId([tag; 32]),
            epochs: net.epochs.clone(),
            time: net.clock.clone(),
            secret: validator.map(|id| net.secret(id)),
        },
    )
    .unwrap()
}

async fn stop(shutdown: watch::Sender<bool>, sets: Vec<JoinSet<()>>) {
    shutdown.send(true).unwrap();
    for mut set in sets {
        while set.join_next().await.is_some() {}
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_events_cross_a_relay() {
    let net = Devnet::new(2);
    let a = node(&net, 1, Some(1));
    let b = node(&net, 2, None);
    let c = node(&net, 3, Some(2));
    // a - b - c
    GossipNode::connect(&a, &b);
    GossipNode::connect(&b, &c);

    let (shutdown, rx) = watch::channel(false);
    let sets = vec![
        a.run(rx.clone()).unwrap(),
        b.run(rx.clone()).unwrap(),
        c.run(rx).unwrap(),
    ];

    wait_until("every DAG holds both validators", || {
        [&a, &b, &c].iter().all(|n| {
            let epoch = net.genesis.snapshot.epoch;
            n.dag().last_event(epoch, ValidatorId(1)).is_some()
                && n.dag().last_event(epoch, ValidatorId(2)).is_some()
        })
    })
    .await;

    assert!(!a.peers().contains(c.id()));
    for n in [&a, &b, &c] {
        assert_eq!(n.metrics().snapshot().events_rejected, 0);
    }
    stop(shutdown, sets).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_tx_crosses_two_hops() {
    let net = Devnet::new(1);
    let a = node(&net, 1, None);
    let b = node(&net, 2, None);
    let c = node(&net, 3, None);
    GossipNode::connect(&a, &b);
    GossipNode::connect(&b, &c);

    let (shutdown, rx) = watch::channel(false);
    let sets = vec![
        a.run(rx.clone()).unwrap(),
        b.run(rx.clone()).unwrap(),
        c.run(rx).unwrap(),
    ];

    let tx = Transaction::new([5; 20], Some([6; 20]), 0, 21_000, U256::from(2u64), vec![]);
    assert!(c.submit_tx(tx.clone()));

    wait_until("tx in a's pool", || a.pool().has(&tx.hash)).await;
    assert!(b.pool().has(&tx.hash));
    assert_eq!(a.metrics().snapshot().txs_added, 1);
    stop(shutdown, sets).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_rejoining_node_catches_up_over_streams() {
    let net = Devnet::new(1);
    let a = node(&net, 1, Some(1));
    let (shutdown, rx) = watch::channel(false);
    let mut sets = vec![a.run(rx.clone()).unwrap()];

    wait_until("first own event", || a.dag().len() == 1).await;
    net.clock.advance(std::time::Duration::from_secs(2));
    wait_until("second own event", || a.dag().len() == 2).await;

    let late = node(&net, 9, None);
    GossipNode::connect(&a, &late);
    sets.push(late.run(rx).unwrap());

    let target = a.dag().len();
    wait_until("late node holds a's DAG", || late.dag().len() >= target).await;
    assert_eq!(late.metrics().snapshot().events_rejected, 0);
    stop(shutdown, sets).await;
}
