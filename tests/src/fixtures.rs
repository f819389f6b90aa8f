//! Shared setup: a genesis epoch, a controllable clock and emitters that
//! build valid signed events over in-memory DAGs.

use node_runtime::adapters::{MemoryDag, MemoryTxPool};
use node_runtime::{Genesis, GenesisConfig};
use shared_types::{Event, FixedTimeSource, SnapshotCell, Timestamp, ValidatorId};
use std::sync::Arc;
use std::time::Duration;
use ts_02_event_check::Checkers;
use ts_03_emitter::{
    Emitter, EmitterApi, EmitterConfig, EmitterDeps, LocalKeySigner, OfflineValidators,
};

pub const EPOCH_START_SECS: u64 = 1_000;

/// Wait between two own events of one validator.
pub const EMIT_STEP: Duration = Duration::from_secs(2);

pub struct Devnet {
    pub genesis: Genesis,
    pub epochs: Arc<SnapshotCell>,
    pub clock: Arc<FixedTimeSource>,
}

impl Devnet {
    pub fn new(validators: u32) -> Self {
        let genesis = GenesisConfig::with_validators(validators)
            .build(Timestamp::from_secs(EPOCH_START_SECS))
            .unwrap();
        Self {
            epochs: Arc::new(SnapshotCell::new(genesis.snapshot.clone())),
            genesis,
            clock: Arc::new(FixedTimeSource::new(Timestamp::from_secs(
                EPOCH_START_SECS + 10,
            ))),
        }
    }

    pub fn secret(&self, id: u32) -> [u8; 32] {
        self.genesis
            .secrets
            .iter()
            .find(|(v, _)| v.0 == id)
            .map(|(_, s)| *s)
            .unwrap()
    }

    pub fn checkers(&self) -> Checkers {
        Checkers::new(self.epochs.clone())
    }

    /// Emitter of validator `id` building on and connecting into `dag`.
    pub fn emitter(&self, id: u32, dag: &Arc<MemoryDag>) -> Arc<Emitter> {
        let emitter = Emitter::new(
            EmitterConfig::for_testing(ValidatorId(id)),
            EmitterDeps {
                epochs: self.epochs.clone(),
                dag: dag.clone(),
                pool: Arc::new(MemoryTxPool::new(64)),
                signer: Arc::new(LocalKeySigner::from_secret(&self.secret(id))),
                broadcaster: dag.clone(),
                checkers: self.checkers(),
                offline: OfflineValidators::new(),
                time: self.clock.clone(),
            },
        )
        .unwrap();
        Arc::new(emitter)
    }

    /// `len` consecutive events of validator `id`, connected into `dag`.
    pub async fn chain(&self, id: u32, dag: &Arc<MemoryDag>, len: usize) -> Vec<Event> {
        let emitter = self.emitter(id, dag);
        let mut events = Vec::with_capacity(len);
        for _ in 0..len {
            let event = emitter.emit().await.unwrap().expect("emission due");
            events.push(event);
            self.clock.advance(EMIT_STEP);
        }
        events
    }
}

pub fn dag() -> Arc<MemoryDag> {
    Arc::new(MemoryDag::new(1024))
}

/// Copy of `event` with its signature replaced.
pub fn forged(event: &Event) -> Event {
    let mut payload = event.to_payload();
    payload.signature = [0xAB; 64];
    payload.build()
}

pub async fn wait_until(what: &str, cond: impl Fn() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    while !cond() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "timed out waiting for {what}"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
