//! # Shared flow-control budgets
//!
//! The block records and epoch packs leechers of a node draw from one
//! message semaphore; a seeder's unsent responses are capped by its own.

use std::sync::Arc;
use std::time::Duration;

use shared_types::{BlockRecord, Epoch, EpochPack, Metric, NodeId, Timestamp};
use ts_04_flow_control::{DataSemaphore, SemaphoreError};
use ts_05_stream_sync::{
    AcceptAll, ChunkRequest, LeecherConfig, LeecherDeps, LoopbackTransport, MemoryStreamStore,
    PeerPenalizer, SeederConfig, SeederError, StreamItem, StreamKind, StreamLeecher,
    StreamSeeder,
};
use uuid::Uuid;

const LOCAL: NodeId = NodeId([1; 32]);
const REMOTE: NodeId = NodeId([2; 32]);

struct NoPenalties;

impl PeerPenalizer for NoPenalties {
    fn penalize(&self, peer: shared_types::PeerId, reason: &str) {
        panic!("unexpected penalty for {peer}: {reason}");
    }
}

fn records(n: u64) -> Vec<BlockRecord> {
    (0..n)
        .map(|index| BlockRecord {
            index,
            atropos: [index as u8; 32],
            time: Timestamp::from_secs(index),
            txs: vec![[7; 32]; 4],
            gas_used: 21_000,
        })
        .collect()
}

fn packs(n: u64) -> Vec<EpochPack> {
    (0..n)
        .map(|i| EpochPack {
            epoch: Epoch(i as u32 + 1),
            start_block: i * 10,
            end_block: i * 10 + 9,
            next_validators: [i as u8; 32],
            votes: vec![],
        })
        .collect()
}

fn leecher<I: StreamItem + PartialEq>(
    kind: StreamKind,
    remote: Vec<I>,
    semaphore: Arc<DataSemaphore>,
) -> (StreamLeecher<I>, Arc<MemoryStreamStore<I>>) {
    let seeder = StreamSeeder::new(
        kind,
        SeederConfig::for_testing(),
        Arc::new(MemoryStreamStore::with_items(0, remote)),
        Arc::new(DataSemaphore::new(format!("{kind}-outbound"), Metric::new(1000, 1 << 24))),
    );
    let transport = Arc::new(LoopbackTransport::new(LOCAL));
    transport.connect(REMOTE, Arc::new(seeder));
    let store = Arc::new(MemoryStreamStore::new(0));
    let leecher = StreamLeecher::new(
        kind,
        LeecherConfig::for_testing(),
        LeecherDeps {
            transport,
            store: store.clone(),
            validator: Arc::new(AcceptAll),
            penalizer: Arc::new(NoPenalties),
            semaphore,
        },
    );
    (leecher, store)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_two_streams_share_one_message_budget() {
    // room for three chunks; each leecher keeps up to two in flight
    let msgs = Arc::new(DataSemaphore::new("msgs", Metric::new(150, 1 << 24)));
    let (brs, brs_store) = leecher(StreamKind::BlockRecords, records(400), msgs.clone());
    let (eps, eps_store) = leecher(StreamKind::EpochPacks, packs(300), msgs.clone());

    let (brs_report, eps_report) = tokio::join!(brs.sync(REMOTE), eps.sync(REMOTE));

    assert_eq!(brs_report.unwrap().applied, 400);
    assert_eq!(eps_report.unwrap().applied, 300);
    assert_eq!(brs_store.items(), records(400));
    assert_eq!(eps_store.items(), packs(300));
    assert_eq!(msgs.processing(), Metric::ZERO);
    let m = msgs.metrics().snapshot();
    assert_eq!(m.acquired, m.released);
    assert_eq!(m.release_underflows, 0);
}

#[tokio::test]
async fn test_seeder_busy_until_responses_are_sent() {
    let outbound = Arc::new(DataSemaphore::new("brs-outbound", Metric::new(10, 1 << 24)));
    let seeder = StreamSeeder::new(
        StreamKind::BlockRecords,
        SeederConfig::for_testing(),
        Arc::new(MemoryStreamStore::with_items(0, records(30))),
        outbound.clone(),
    );
    let request = |start| ChunkRequest {
        session: Uuid::new_v4(),
        kind: StreamKind::BlockRecords,
        start,
        limit: Metric::new(10, 1 << 20),
    };

    let first = seeder.serve(REMOTE, request(0)).await.unwrap();
    assert_eq!(first.weight().num, 10);
    assert_eq!(outbound.processing().num, 10);

    // the unsent first response holds the whole budget
    let err = seeder.serve(REMOTE, request(10)).await.err().unwrap();
    assert!(matches!(err, SeederError::Busy(SemaphoreError::Timeout { .. })));
    assert_eq!(seeder.metrics().snapshot().busy_rejections, 1);

    let response = first.into_response();
    assert_eq!(response.items, records(10));
    assert_eq!(outbound.processing(), Metric::ZERO);

    let second = seeder.serve(REMOTE, request(10)).await.unwrap();
    assert_eq!(second.response().items, records(30)[10..20].to_vec());
}

#[tokio::test]
async fn test_closed_budget_fails_waiters() {
    let msgs = Arc::new(DataSemaphore::new("msgs", Metric::new(10, 1 << 20)));
    let held = msgs.try_acquire_permit(Metric::new(10, 100)).unwrap();

    let waiter = {
        let msgs = msgs.clone();
        tokio::spawn(async move { msgs.acquire(Metric::new(1, 1), Duration::from_secs(30)).await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!waiter.is_finished());

    msgs.close();
    let err = waiter.await.unwrap().unwrap_err();
    assert_eq!(err.kind(), "closed");
    assert!(!err.is_transient());

    // held weight still returns after close
    held.release().unwrap();
    assert_eq!(msgs.processing(), Metric::ZERO);
}
