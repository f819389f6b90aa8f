//! # Events stream: seeder -> leecher
//!
//! A fresh node pulls a validator's DAG over the events stream, with every
//! chunk running through the full checkers before it is connected.

use std::sync::Arc;

use parking_lot::Mutex;
use shared_types::{Event, Metric, NodeId, PeerId};
use ts_04_flow_control::DataSemaphore;
use ts_05_stream_sync::{
    EventChunkValidator, LeecherConfig, LeecherDeps, LeecherError, LoopbackTransport,
    MemoryStreamStore, PeerPenalizer, SeederConfig, StreamKind, StreamLeecher, StreamSeeder,
    StreamStore,
};

use node_runtime::adapters::MemoryDag;

use crate::fixtures::{dag, forged, Devnet};

const LOCAL: NodeId = NodeId([1; 32]);
const SEEDER: NodeId = NodeId([2; 32]);

#[derive(Default)]
struct Penalties(Mutex<Vec<(PeerId, String)>>);

impl PeerPenalizer for Penalties {
    fn penalize(&self, peer: PeerId, reason: &str) {
        self.0.lock().push((peer, reason.to_string()));
    }
}

struct Harness {
    leecher: StreamLeecher<Event>,
    target: Arc<MemoryDag>,
    penalties: Arc<Penalties>,
    inbound: Arc<DataSemaphore>,
}

fn harness(net: &Devnet, source: Arc<dyn StreamStore<Event>>) -> Harness {
    let seeder = StreamSeeder::new(
        StreamKind::Events,
        SeederConfig::for_testing(),
        source,
        Arc::new(DataSemaphore::new("events-outbound", Metric::new(1000, 1 << 24))),
    );
    let transport = Arc::new(LoopbackTransport::new(LOCAL));
    transport.connect(SEEDER, Arc::new(seeder));

    let target = dag();
    let penalties = Arc::new(Penalties::default());
    let inbound = Arc::new(DataSemaphore::new("events", Metric::new(1000, 1 << 24)));
    let leecher = StreamLeecher::new(
        StreamKind::Events,
        LeecherConfig::for_testing(),
        LeecherDeps {
            transport,
            store: target.clone(),
            validator: Arc::new(EventChunkValidator::new(net.checkers(), target.clone())),
            penalizer: penalties.clone(),
            semaphore: inbound.clone(),
        },
    );
    Harness {
        leecher,
        target,
        penalties,
        inbound,
    }
}

#[tokio::test]
async fn test_fresh_node_pulls_whole_dag() {
    let net = Devnet::new(2);
    let source = dag();
    let mut events = net.chain(1, &source, 3).await;
    events.extend(net.chain(2, &source, 2).await);

    let h = harness(&net, source.clone());
    let report = h.leecher.sync(SEEDER).await.unwrap();

    assert_eq!(report.applied, 5);
    assert_eq!(report.cursor, 5);
    assert_eq!(h.target.len(), 5);
    for event in &events {
        assert!(h.target.contains(&event.id()));
    }
    assert!(h.penalties.0.lock().is_empty());
    assert_eq!(h.inbound.processing(), Metric::ZERO);
}

#[tokio::test]
async fn test_second_session_follows_the_tail() {
    let net = Devnet::new(1);
    let source = dag();
    net.chain(1, &source, 2).await;

    let h = harness(&net, source.clone());
    assert_eq!(h.leecher.sync(SEEDER).await.unwrap().applied, 2);

    // the same emitter state lives in the source DAG
    net.chain(1, &source, 2).await;
    let report = h.leecher.sync(SEEDER).await.unwrap();
    assert_eq!(report.applied, 2);
    assert_eq!(report.cursor, 4);
    assert_eq!(h.target.len(), 4);
    assert_eq!(h.leecher.metrics().snapshot().sessions_completed, 2);
}

#[tokio::test]
async fn test_forged_event_fails_chunk_and_penalizes() {
    let net = Devnet::new(1);
    let origin = dag();
    let events = net.chain(1, &origin, 3).await;

    let tampered = vec![events[0].clone(), forged(&events[1]), events[2].clone()];
    let source = Arc::new(MemoryStreamStore::with_items(0, tampered));
    let h = harness(&net, source);

    let err = h.leecher.sync(SEEDER).await.unwrap_err();
    assert!(matches!(err, LeecherError::InvalidChunk { index: 1, .. }));
    assert!(h.target.is_empty(), "nothing of a rejected chunk is applied");

    let penalties = h.penalties.0.lock();
    assert_eq!(penalties.len(), 1);
    assert_eq!(penalties[0].0, SEEDER);
    drop(penalties);
    assert_eq!(h.inbound.processing(), Metric::ZERO);
}
