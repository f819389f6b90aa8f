use super::*;
use crate::genesis::{Genesis, GenesisConfig};
use shared_types::{
    Epoch, EventPayload, FixedTimeSource, Metric, NodeId, Timestamp, ValidatorId, U256,
};
use std::time::Duration;
use ts_03_emitter::{DagReader, TxPool};
use ts_05_stream_sync::StreamStore;

const EPOCH_START_SECS: u64 = 1_000;

fn epoch() -> Epoch {
    GenesisConfig::default().epoch
}

struct Net {
    genesis: Genesis,
    epochs: Arc<SnapshotCell>,
    clock: Arc<FixedTimeSource>,
}

fn net(validators: u32) -> Net {
    let genesis = GenesisConfig::with_validators(validators)
        .build(Timestamp::from_secs(EPOCH_START_SECS))
        .unwrap();
    Net {
        epochs: Arc::new(SnapshotCell::new(genesis.snapshot.clone())),
        genesis,
        clock: Arc::new(FixedTimeSource::new(Timestamp::from_secs(EPOCH_START_SECS + 10))),
    }
}

impl Net {
    fn validator(&self, id: u32) -> Arc<GossipNode> {
        let secret = self
            .genesis
            .secrets
            .iter()
            .find(|(v, _)| v.0 == id)
            .map(|(_, s)| *s);
        self.node(id as u8, ValidatorId(id), secret)
    }

    fn relay(&self, tag: u8) -> Arc<GossipNode> {
        self.node(tag, ValidatorId(0), None)
    }

    fn node(&self, tag: u8, validator: ValidatorId, secret: Option<[u8; 32]>) -> Arc<GossipNode> {
        GossipNode::new(
            GossipConfig::for_testing(validator),
            NodeDeps {
                id: NodeId([tag; 32]),
                epochs: self.epochs.clone(),
                time: self.clock.clone(),
                secret,
            },
        )
        .unwrap()
    }
}

async fn wait_until(what: &str, cond: impl Fn() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    while !cond() {
        assert!(tokio::time::Instant::now() < deadline, "timed out waiting for {what}");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

async fn stop(shutdown: watch::Sender<bool>, sets: Vec<JoinSet<()>>) {
    shutdown.send(true).unwrap();
    for mut set in sets {
        while set.join_next().await.is_some() {}
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_validators_exchange_first_events() {
    let net = net(2);
    let a = net.validator(1);
    let b = net.validator(2);
    GossipNode::connect(&a, &b);

    let (shutdown, rx) = watch::channel(false);
    let sets = vec![a.run(rx.clone()).unwrap(), b.run(rx).unwrap()];

    wait_until("both DAGs hold both events", || a.dag().len() == 2 && b.dag().len() == 2).await;
    for node in [&a, &b] {
        assert!(node.dag().last_event(epoch(), ValidatorId(1)).is_some());
        assert!(node.dag().last_event(epoch(), ValidatorId(2)).is_some());
        assert_eq!(node.metrics().snapshot().events_rejected, 0);
    }
    assert_eq!(a.peers().penalties(b.id()), 0);
    assert_eq!(b.peers().penalties(a.id()), 0);
    stop(shutdown, sets).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_late_relay_catches_up() {
    let net = net(1);
    let a = net.validator(1);
    let (shutdown, rx) = watch::channel(false);
    let mut sets = vec![a.run(rx.clone()).unwrap()];
    wait_until("own event", || a.dag().len() == 1).await;

    let c = net.relay(9);
    GossipNode::connect(&a, &c);
    sets.push(c.run(rx).unwrap());

    wait_until("relay DAG", || c.dag().len() == 1).await;
    assert!(c.emitter().is_none());
    stop(shutdown, sets).await;
}

fn votes(n: u64) -> Vec<BlockVotes> {
    (0..n)
        .map(|i| BlockVotes {
            epoch: epoch(),
            creator: ValidatorId(1),
            start: i,
            votes: vec![[i as u8; 32]],
            signature: [0u8; 64],
        })
        .collect()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_block_votes_stream_replicates() {
    let net = net(1);
    let a = net.relay(1);
    let b = net.relay(2);
    a.block_votes().apply(0, votes(5)).unwrap();
    GossipNode::connect(&a, &b);

    let (shutdown, rx) = watch::channel(false);
    let sets = vec![a.run(rx.clone()).unwrap(), b.run(rx).unwrap()];

    wait_until("votes replicated", || b.block_votes().len() == 5).await;
    assert_eq!(b.block_votes().items(), votes(5));
    assert!(a.bvs_stream().seeder.metrics().snapshot().items_served >= 5);
    stop(shutdown, sets).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_submitted_tx_reaches_peer_pool() {
    let net = net(1);
    let a = net.relay(1);
    let b = net.relay(2);
    GossipNode::connect(&a, &b);
    let (shutdown, rx) = watch::channel(false);
    let sets = vec![a.run(rx.clone()).unwrap(), b.run(rx).unwrap()];

    let tx = Transaction::new([1; 20], Some([2; 20]), 0, 21_000, U256::from(1u64), vec![]);
    assert!(a.submit_tx(tx.clone()));
    assert!(!a.submit_tx(tx.clone()), "duplicate refused");

    wait_until("peer pool", || b.pool().has(&tx.hash)).await;
    assert_eq!(b.metrics().snapshot().txs_added, 1);
    stop(shutdown, sets).await;
}

#[tokio::test]
async fn test_invalid_deliveries_drop_peer() {
    let net = net(1);
    let a = net.relay(1);
    let bad_peer = NodeId([7; 32]);
    a.peers().add(bad_peer);

    // seq 0 fails the basic check
    let bogus = EventPayload::default().build();
    for _ in 0..a.config().peers.max_penalties {
        a.process_events(Delivery {
            peer: bad_peer,
            items: vec![bogus.clone()],
        })
        .await;
    }

    assert!(!a.peers().contains(bad_peer));
    let m = a.metrics().snapshot();
    assert_eq!(m.events_rejected, u64::from(a.config().peers.max_penalties));
    assert_eq!(a.checkers().metrics().snapshot().rejected_basic, m.events_rejected);
    assert!(a.dag().is_empty());
}

#[tokio::test]
async fn test_delivered_chain_connects_in_parent_order() {
    let net = net(1);
    let a = net.validator(1);
    let b = net.relay(2);
    let emitter = a.emitter().unwrap();

    let first = emitter.emit().await.unwrap().unwrap();
    net.clock.advance(Duration::from_secs(2));
    let second = emitter.emit().await.unwrap().unwrap();
    assert_eq!(second.self_parent(), Some(&first.id()));

    // child first: sorting by Lamport time puts the parent ahead
    b.process_events(Delivery {
        peer: a.id(),
        items: vec![second.clone(), first.clone()],
    })
    .await;

    assert!(b.dag().contains(&first.id()));
    assert!(b.dag().contains(&second.id()));
    assert_eq!(b.metrics().snapshot().events_connected, 2);

    b.process_events(Delivery {
        peer: a.id(),
        items: vec![first],
    })
    .await;
    assert_eq!(b.metrics().snapshot().events_duplicate, 1);
}

#[tokio::test]
async fn test_delivery_needs_room_on_events_semaphore() {
    let net = net(1);
    let a = net.validator(1);
    let b = net.relay(2);
    let event = a.emitter().unwrap().emit().await.unwrap().unwrap();
    let delivery = || Delivery {
        peer: a.id(),
        items: vec![event.clone()],
    };

    let full = b.semaphores.events.limit();
    let held = b.semaphores.events.try_acquire_permit(full).unwrap();
    b.process_events(delivery()).await;
    assert!(b.dag().is_empty());
    let m = b.metrics().snapshot();
    assert_eq!(m.deliveries_dropped, 1);
    assert_eq!(m.events_rejected, 0);
    assert_eq!(b.peers().penalties(a.id()), 0);

    // a delivery waits for room freed within the message timeout
    let waiting = {
        let b = b.clone();
        let delivery = delivery();
        tokio::spawn(async move { b.process_events(delivery).await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!waiting.is_finished());
    drop(held);
    waiting.await.unwrap();

    assert!(b.dag().contains(&event.id()));
    assert_eq!(b.metrics().snapshot().deliveries_dropped, 1);
    assert_eq!(b.semaphores.events.processing(), Metric::ZERO);
}

#[tokio::test]
async fn test_tx_delivery_needs_room_on_msgs_semaphore() {
    let net = net(1);
    let a = net.relay(1);
    let b = net.relay(2);
    let tx = Transaction::new([1; 20], Some([2; 20]), 0, 21_000, U256::from(1u64), vec![]);

    let held = b
        .semaphores
        .msgs
        .try_acquire_permit(b.semaphores.msgs.limit())
        .unwrap();
    b.process_txs(Delivery {
        peer: a.id(),
        items: vec![tx.clone()],
    })
    .await;
    assert!(!b.pool().has(&tx.hash));
    assert_eq!(b.metrics().snapshot().deliveries_dropped, 1);

    drop(held);
    b.process_txs(Delivery {
        peer: a.id(),
        items: vec![tx.clone()],
    })
    .await;
    assert!(b.pool().has(&tx.hash));
    assert_eq!(b.semaphores.msgs.processing(), Metric::ZERO);
}

#[tokio::test]
async fn test_orphan_is_held_back() {
    let net = net(1);
    let a = net.validator(1);
    let b = net.relay(2);
    let emitter = a.emitter().unwrap();
    emitter.emit().await.unwrap().unwrap();
    net.clock.advance(Duration::from_secs(2));
    let second = emitter.emit().await.unwrap().unwrap();

    b.process_events(Delivery {
        peer: a.id(),
        items: vec![second],
    })
    .await;
    assert!(b.dag().is_empty());
    assert_eq!(b.metrics().snapshot().events_orphaned, 1);
    assert_eq!(b.metrics().snapshot().events_rejected, 0);
}

#[tokio::test]
async fn test_disconnect_unlinks_everything() {
    let net = net(1);
    let a = net.relay(1);
    let b = net.relay(2);
    GossipNode::connect(&a, &b);
    assert!(a.events_stream().transport.is_connected(b.id()));
    assert!(b.eps_stream().transport.is_connected(a.id()));

    GossipNode::disconnect(&a, &b);
    assert!(!a.peers().contains(b.id()));
    assert!(!a.events_stream().transport.is_connected(b.id()));
    assert!(!b.eps_stream().transport.is_connected(a.id()));
    assert!(a.links.read().is_empty());
}

#[tokio::test]
async fn test_run_only_once() {
    let net = net(1);
    let a = net.relay(1);
    let (shutdown, rx) = watch::channel(false);
    let set = a.run(rx.clone()).unwrap();
    assert!(matches!(a.run(rx), Err(NodeError::AlreadyRunning)));
    stop(shutdown, vec![set]).await;
}

#[test]
fn test_invalid_config_is_refused() {
    let net = net(1);
    let mut config = GossipConfig::for_testing(ValidatorId(1));
    config.inbound_queue = 0;
    let err = GossipNode::new(
        config,
        NodeDeps {
            id: NodeId([1; 32]),
            epochs: net.epochs.clone(),
            time: net.clock.clone(),
            secret: None,
        },
    )
    .err()
    .unwrap();
    assert_eq!(err.kind(), "config");
}

#[tokio::test]
async fn test_export_metrics_reports_every_subsystem() {
    let net = net(1);
    let a = net.validator(1);
    a.emitter().unwrap().emit().await.unwrap().unwrap();
    let handle = MetricsHandle::with_registry(prometheus::Registry::new()).unwrap();

    a.export_metrics(&handle);
    assert_eq!(handle.total("emitter", "events_emitted"), 1);
    assert_eq!(handle.total("checkers", "accepted"), 1);
    assert_eq!(handle.level("node", "dag_events"), 1);
    assert_eq!(handle.total("leecher_events", "sessions_started"), 0);

    // exporting again adds nothing
    a.export_metrics(&handle);
    assert_eq!(handle.total("emitter", "events_emitted"), 1);
}
