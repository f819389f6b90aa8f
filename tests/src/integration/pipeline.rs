//! # Emitter -> Checkers
//!
//! Events built by one validator's emitter must pass another node's full
//! pipeline, and tampering must be caught by the cheapest checker able to
//! see it.

use std::sync::Arc;

use shared_types::{Epoch, EpochReader, Event};
use ts_02_event_check::{
    CheckError, CheckerKind, HeavyCheckConfig, HeavyCheckPool, HeavyChecker, HeavyError,
};

use crate::fixtures::{dag, forged, Devnet};

fn with_parents(dag: &node_runtime::adapters::MemoryDag, event: &Event) -> (Event, Vec<Event>) {
    (event.clone(), dag.parents_of(event).unwrap())
}

#[tokio::test]
async fn test_emitted_chain_passes_remote_pipeline() {
    let net = Devnet::new(2);
    let local = dag();
    let events = net.chain(1, &local, 3).await;

    let remote = net.checkers();
    for event in &events {
        let (_, parents) = with_parents(&local, event);
        remote.validate(event, &parents).unwrap();
    }
    let m = remote.metrics().snapshot();
    assert_eq!(m.accepted, 3);
    assert_eq!(m.rejected_heavy, 0);
}

#[tokio::test]
async fn test_forged_signature_caught_by_heavy_only() {
    let net = Devnet::new(1);
    let local = dag();
    let event = net.chain(1, &local, 1).await.remove(0);
    let forged = forged(&event);

    // light chain cannot see signatures
    let checkers = net.checkers();
    checkers.light().validate(&forged, &[]).unwrap();

    let err = checkers.validate(&forged, &[]).unwrap_err();
    assert_eq!(err, CheckError::Heavy(HeavyError::WrongSignature));
    assert!(err.penalizes_peer());
    assert_eq!(checkers.metrics().snapshot().rejected_heavy, 1);
}

#[tokio::test]
async fn test_cheapest_failure_wins() {
    let net = Devnet::new(1);
    let local = dag();
    let event = net.chain(1, &local, 1).await.remove(0);

    let mut payload = forged(&event).to_payload();
    payload.seq = 0;
    let broken = payload.build();

    let checkers = net.checkers();
    let err = checkers.validate(&broken, &[]).unwrap_err();
    assert_eq!(err.kind(), CheckerKind::Basic);
    let m = checkers.metrics().snapshot();
    assert_eq!(m.rejected_basic, 1);
    assert_eq!(m.rejected_heavy, 0);
}

#[tokio::test]
async fn test_heavy_pool_judges_each_task() {
    let net = Devnet::new(1);
    let local = dag();
    let events = net.chain(1, &local, 2).await;

    let pool = HeavyCheckPool::new(
        &HeavyCheckConfig::for_testing(),
        Arc::new(HeavyChecker::new(net.epochs.clone())),
    )
    .unwrap();
    let tasks = vec![
        with_parents(&local, &events[0]),
        (forged(&events[1]), local.parents_of(&events[1]).unwrap()),
        with_parents(&local, &events[1]),
    ];
    let verdicts = pool.validate_batch(&tasks).unwrap();

    assert_eq!(verdicts.len(), 3);
    assert!(verdicts[0].is_ok());
    assert_eq!(
        verdicts[1],
        Err(CheckError::Heavy(HeavyError::WrongSignature))
    );
    assert!(verdicts[2].is_ok());
}

#[tokio::test]
async fn test_event_of_past_epoch_dropped_without_penalty() {
    let net = Devnet::new(1);
    let local = dag();
    let event = net.chain(1, &local, 1).await.remove(0);

    let mut next = (*net.epochs.snapshot()).clone();
    next.epoch = Epoch(next.epoch.0 + 1);
    net.epochs.replace(next);

    let err = net.checkers().validate(&event, &[]).unwrap_err();
    assert_eq!(err.kind(), CheckerKind::Epoch);
    assert!(!err.penalizes_peer());
}
