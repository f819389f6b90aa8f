//! Emitter service: assembles, self-checks and broadcasts own events.

use async_trait::async_trait;
use parking_lot::Mutex;
use shared_types::{
    calc_payload_hash, Epoch, EpochReader, Event, EventPayload, TimeSource, Timestamp,
};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use ts_01_gas_power::{calc_gas_power, calc_gas_power_used, GasPowerContext};
use ts_02_event_check::Checkers;

use crate::config::EmitterConfig;
use crate::domain::{
    add_txs, choose_parents, max_gas_power_to_use, median_time, AddTxsContext, OfflineValidators,
    OriginatedTxs, TurnContext, TxsByPriceAndNonce,
};
use crate::error::{EmitterError, Result};
use crate::metrics::Metrics;
use crate::ports::{DagReader, EmitterApi, EmitterStatus, EventBroadcaster, EventSigner, TxPool};

/// Collaborators of the emitter.
#[derive(Clone)]
pub struct EmitterDeps {
    /// Active epoch snapshot
    pub epochs: Arc<dyn EpochReader>,
    /// Local DAG
    pub dag: Arc<dyn DagReader>,
    /// Transaction pool
    pub pool: Arc<dyn TxPool>,
    /// Validator key
    pub signer: Arc<dyn EventSigner>,
    /// Gossip layer
    pub broadcaster: Arc<dyn EventBroadcaster>,
    /// Validation pipeline shared with inbound events
    pub checkers: Checkers,
    /// Liveness view
    pub offline: OfflineValidators,
    /// Clock
    pub time: Arc<dyn TimeSource>,
}

#[derive(Default)]
struct EmitState {
    epoch: Epoch,
    last_emitted: Option<Event>,
}

/// Local event emitter.
pub struct Emitter {
    config: EmitterConfig,
    deps: EmitterDeps,
    originated: Mutex<OriginatedTxs>,
    state: Mutex<EmitState>,
    metrics: Arc<Metrics>,
}

impl Emitter {
    /// Create an emitter. Fails on an invalid config.
    pub fn new(config: EmitterConfig, deps: EmitterDeps) -> Result<Self> {
        config.validate()?;
        info!(
            validator = %config.validator,
            min_interval_ms = config.min_emit_interval_ms,
            max_interval_ms = config.max_emit_interval_ms,
            "Emitter initialized"
        );
        Ok(Self {
            config,
            deps,
            originated: Mutex::new(OriginatedTxs::new()),
            state: Mutex::new(EmitState::default()),
            metrics: Arc::new(Metrics::new()),
        })
    }

    /// Counters.
    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    /// Configuration.
    pub fn config(&self) -> &EmitterConfig {
        &self.config
    }

    /// Build and self-check the next own event at `now` without
    /// broadcasting it. `None` when emission is not due or not affordable.
    pub fn create_event(&self, now: Timestamp) -> Result<Option<Event>> {
        let snapshot = self.deps.epochs.snapshot();
        let me = self.config.validator;
        if !snapshot.validators.exists(me) {
            return Err(EmitterError::NotValidator {
                validator: me,
                epoch: snapshot.epoch,
            });
        }

        let last_emitted = {
            let mut state = self.state.lock();
            if state.epoch != snapshot.epoch {
                debug!(from = %state.epoch, to = %snapshot.epoch, "Epoch changed, resetting emitter");
                state.epoch = snapshot.epoch;
                state.last_emitted = None;
                self.originated.lock().clear();
            }
            state.last_emitted.clone()
        };

        let self_parent = self.deps.dag.last_event(snapshot.epoch, me);
        if let Some(last) = &last_emitted {
            // Building on anything but our own last event would fork.
            if self_parent.as_ref().map(Event::id) != Some(last.id()) {
                debug!(last = %last, "Waiting for own event to connect");
                self.metrics.record_throttled();
                return Ok(None);
            }
        }
        if let Some(sp) = &self_parent {
            if now.saturating_duration_since(sp.creation_time()) < self.config.min_emit_interval() {
                self.metrics.record_throttled();
                return Ok(None);
            }
        }

        let rules = &snapshot.rules;
        let max_parents = match self.config.max_parents {
            0 => rules.dag.max_parents,
            n => n.min(rules.dag.max_parents),
        } as usize;
        let heads = self.deps.dag.heads(snapshot.epoch);
        let parents = choose_parents(self_parent.as_ref(), &heads, me, max_parents);

        let mut payload = EventPayload {
            epoch: snapshot.epoch,
            seq: self_parent.as_ref().map_or(1, |sp| sp.seq() + 1),
            creator: me,
            lamport: parents.iter().map(Event::lamport).max().unwrap_or(0) + 1,
            parents: parents.iter().map(Event::id).collect(),
            ..EventPayload::default()
        };
        payload.creation_time = match &self_parent {
            Some(sp) if sp.creation_time() >= now => Timestamp(sp.creation_time().0 + 1),
            _ => now,
        };
        let mut median = median_time(&parents, &snapshot.validators, snapshot.epoch_start);
        if let Some(sp) = &self_parent {
            median = median.max(sp.median_time());
        }
        payload.median_time = median.max(Timestamp(1));

        payload.gas_power_used = calc_gas_power_used(&payload, rules);
        let ctx = GasPowerContext::from_snapshot(snapshot.clone());
        let available = calc_gas_power(&payload, self_parent.as_ref(), &ctx);
        if payload.gas_power_used > available.min() {
            debug!(
                used = payload.gas_power_used,
                available = %available,
                "Not enough gas power to emit"
            );
            self.metrics.record_no_gas_power();
            return Ok(None);
        }
        payload.gas_power_left = available.saturating_sub(payload.gas_power_used);

        {
            let originated = self.originated.lock();
            let max_gas_used = max_gas_power_to_use(
                &payload,
                &snapshot.validators,
                rules,
                &self.config.throttle,
                originated.pending_gas(),
            );
            let mut sorted = TxsByPriceAndNonce::new(self.deps.pool.pending());
            let ctx = AddTxsContext {
                me,
                now,
                rules,
                turn: TurnContext {
                    validators: &snapshot.validators,
                    epoch: snapshot.epoch,
                    offline: &self.deps.offline,
                    config: &self.config.turn,
                },
                originated: &originated,
                pool: self.deps.pool.as_ref(),
                max_gas_used,
            };
            let report = add_txs(&mut payload, &mut sorted, &ctx);
            self.metrics.record_add_txs(&report);
        }

        if payload.txs.is_empty() {
            if let Some(sp) = &self_parent {
                if now.saturating_duration_since(sp.creation_time()) < self.config.max_emit_interval() {
                    self.metrics.record_throttled();
                    return Ok(None);
                }
            }
        }

        payload.payload_hash = calc_payload_hash(&payload.txs);
        self.deps.signer.sign(&mut payload)?;
        let event = payload.build();

        if let Err(err) = self.deps.checkers.validate(&event, &parents) {
            warn!(event = %event, error = %err, "Own event failed self-check");
            self.metrics.record_self_check_failure();
            return Err(err.into());
        }

        self.state.lock().last_emitted = Some(event.clone());
        self.metrics.record_emitted();
        info!(
            event = %event,
            seq = event.seq(),
            txs = event.txs().len(),
            gas_used = event.gas_power_used(),
            "Emitted event"
        );
        Ok(Some(event))
    }

    /// Emit on every tick until `shutdown` changes.
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.config.min_emit_interval());
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        info!(validator = %self.config.validator, "Emitter started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(err) = self.emit().await {
                        if err.is_transient() {
                            debug!(error = %err, kind = err.kind(), "Emission skipped");
                        } else {
                            warn!(error = %err, kind = err.kind(), "Emission failed");
                        }
                    }
                }
                _ = shutdown.changed() => {
                    break;
                }
            }
        }
        info!(validator = %self.config.validator, "Emitter stopped");
    }
}

#[async_trait]
impl EmitterApi for Emitter {
    async fn emit(&self) -> Result<Option<Event>> {
        let now = self.deps.time.now();
        let Some(event) = self.create_event(now)? else {
            return Ok(None);
        };
        self.deps.broadcaster.broadcast(event.clone()).await?;
        Ok(Some(event))
    }

    fn on_event_connected(&self, event: &Event) {
        self.originated.lock().on_event_connected(event);
    }

    fn on_event_confirmed(&self, event: &Event) {
        self.originated.lock().on_event_confirmed(event);
    }

    fn status(&self) -> EmitterStatus {
        let state = self.state.lock();
        EmitterStatus {
            validator: self.config.validator,
            last_event: state.last_emitted.as_ref().map(Event::id),
            last_emitted_at: state.last_emitted.as_ref().map(Event::creation_time),
            pending_gas: self.originated.lock().pending_gas(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::LocalKeySigner;
    use shared_types::{
        Address, EpochSnapshot, FixedTimeSource, Hash, Rules, SnapshotCell, Transaction,
        ValidatorId, ValidatorProfile, ValidatorSet, U256,
    };
    use std::collections::HashMap;
    use std::time::Duration;

    #[derive(Default)]
    struct MemoryDag {
        events: Mutex<Vec<Event>>,
    }

    impl DagReader for MemoryDag {
        fn heads(&self, epoch: Epoch) -> Vec<Event> {
            let events = self.events.lock();
            events
                .iter()
                .filter(|e| e.epoch() == epoch)
                .filter(|e| !events.iter().any(|c| c.parents().contains(&e.id())))
                .cloned()
                .collect()
        }

        fn last_event(&self, epoch: Epoch, creator: ValidatorId) -> Option<Event> {
            self.events
                .lock()
                .iter()
                .filter(|e| e.epoch() == epoch && e.creator() == creator)
                .max_by_key(|e| e.seq())
                .cloned()
        }
    }

    #[async_trait]
    impl EventBroadcaster for MemoryDag {
        async fn broadcast(&self, event: Event) -> Result<()> {
            self.events.lock().push(event);
            Ok(())
        }
    }

    #[derive(Default)]
    struct MemoryPool {
        txs: Mutex<HashMap<Hash, Transaction>>,
    }

    impl MemoryPool {
        fn add(&self, tx: Transaction) {
            self.txs.lock().insert(tx.hash, tx);
        }
    }

    impl TxPool for MemoryPool {
        fn pending(&self) -> HashMap<Address, Vec<Transaction>> {
            let mut out: HashMap<Address, Vec<Transaction>> = HashMap::new();
            for tx in self.txs.lock().values() {
                out.entry(tx.sender).or_default().push(tx.clone());
            }
            out
        }

        fn has(&self, hash: &Hash) -> bool {
            self.txs.lock().contains_key(hash)
        }

        fn count(&self) -> usize {
            self.txs.lock().len()
        }
    }

    struct Harness {
        emitter: Arc<Emitter>,
        dag: Arc<MemoryDag>,
        pool: Arc<MemoryPool>,
        clock: Arc<FixedTimeSource>,
    }

    const EPOCH_START_SECS: u64 = 1_000;

    fn harness(me: ValidatorId) -> Harness {
        let signer = LocalKeySigner::from_secret(&[7u8; 32]);
        let validators = ValidatorSet::new(vec![(
            ValidatorId(1),
            ValidatorProfile {
                weight: 1,
                pubkey: signer.public_key(),
            },
        )])
        .unwrap();
        let epochs: Arc<SnapshotCell> = Arc::new(SnapshotCell::new(EpochSnapshot::new(
            Epoch(1),
            validators,
            Rules::for_testing(),
            Timestamp::from_secs(EPOCH_START_SECS),
        )));
        let dag = Arc::new(MemoryDag::default());
        let pool = Arc::new(MemoryPool::default());
        let clock = Arc::new(FixedTimeSource::new(Timestamp::from_secs(EPOCH_START_SECS + 10)));
        let deps = EmitterDeps {
            epochs: epochs.clone(),
            dag: dag.clone(),
            pool: pool.clone(),
            signer: Arc::new(signer),
            broadcaster: dag.clone(),
            checkers: Checkers::new(epochs),
            offline: OfflineValidators::new(),
            time: clock.clone(),
        };
        let emitter = Arc::new(Emitter::new(EmitterConfig::for_testing(me), deps).unwrap());
        Harness {
            emitter,
            dag,
            pool,
            clock,
        }
    }

    fn transfer(sender: u8, nonce: u64) -> Transaction {
        Transaction::new([sender; 20], Some([0; 20]), nonce, 21_000, U256::from(5u64), vec![])
    }

    #[tokio::test]
    async fn test_first_event_passes_checkers() {
        let h = harness(ValidatorId(1));
        h.pool.add(transfer(1, 0));

        let event = h.emitter.emit().await.unwrap().expect("first event is always due");
        assert_eq!(event.seq(), 1);
        assert_eq!(event.lamport(), 1);
        assert_eq!(event.txs().len(), 1);
        assert_eq!(event.gas_power_used(), Rules::for_testing().economy.gas.event_gas + 21_000);
        assert_eq!(h.dag.events.lock().len(), 1);
        assert_eq!(h.emitter.metrics().snapshot().events_emitted, 1);
    }

    #[tokio::test]
    async fn test_empty_events_wait_for_max_interval() {
        let h = harness(ValidatorId(1));
        let first = h.emitter.emit().await.unwrap().unwrap();
        assert!(first.txs().is_empty());

        h.clock.advance(Duration::from_millis(50));
        assert!(h.emitter.emit().await.unwrap().is_none());

        h.clock.advance(Duration::from_millis(1_000));
        let second = h.emitter.emit().await.unwrap().unwrap();
        assert_eq!(second.seq(), 2);
        assert_eq!(second.self_parent(), Some(&first.id()));
        assert_eq!(second.lamport(), 2);
    }

    #[tokio::test]
    async fn test_pending_txs_trigger_early_emission() {
        let h = harness(ValidatorId(1));
        h.emitter.emit().await.unwrap().unwrap();

        h.clock.advance(Duration::from_millis(50));
        h.pool.add(transfer(2, 0));
        let event = h.emitter.emit().await.unwrap().unwrap();
        assert_eq!(event.txs().len(), 1);
    }

    #[tokio::test]
    async fn test_waits_for_own_event_to_connect() {
        let h = harness(ValidatorId(1));
        let now = h.clock.now();
        assert!(h.emitter.create_event(now).unwrap().is_some());

        // Not broadcast, so the DAG still lacks it.
        h.clock.advance(Duration::from_secs(5));
        assert!(h.emitter.create_event(h.clock.now()).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unconfirmed_sender_is_not_reused() {
        let h = harness(ValidatorId(1));
        h.pool.add(transfer(3, 0));
        let first = h.emitter.emit().await.unwrap().unwrap();
        h.emitter.on_event_connected(&first);
        assert_eq!(h.emitter.status().pending_gas, first.gas_power_used());

        // The pool has not pruned nonce 0 yet and nonce 1 arrived.
        h.pool.add(transfer(3, 1));
        h.clock.advance(Duration::from_millis(50));
        assert!(h.emitter.emit().await.unwrap().is_none());
        assert_eq!(h.emitter.metrics().snapshot().txs_skipped_conflicting_sender, 1);

        h.emitter.on_event_confirmed(&first);
        assert_eq!(h.emitter.status().pending_gas, 0);
    }

    #[tokio::test]
    async fn test_non_validator_is_rejected() {
        let h = harness(ValidatorId(9));
        let err = h.emitter.emit().await.unwrap_err();
        assert!(matches!(err, EmitterError::NotValidator { .. }));
        assert!(err.is_transient());
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_stops_on_shutdown() {
        let h = harness(ValidatorId(1));
        let (tx, rx) = watch::channel(false);
        let task = tokio::spawn(h.emitter.clone().run(rx));

        tokio::time::sleep(Duration::from_millis(35)).await;
        tx.send(true).unwrap();
        task.await.unwrap();
        assert!(h.emitter.metrics().snapshot().events_emitted >= 1);
    }
}
