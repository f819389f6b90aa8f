//! The ordered checker pipeline.

use shared_types::{EpochReader, Event};
use std::sync::Arc;
use tracing::debug;

use crate::domain::basic::BasicChecker;
use crate::domain::checker::Checker;
use crate::domain::epoch::EpochChecker;
use crate::domain::errors::CheckError;
use crate::domain::gas_power::GasPowerChecker;
use crate::domain::heavy::HeavyChecker;
use crate::domain::parents::ParentsChecker;
use crate::metrics::Metrics;

/// Fail-fast chain of checkers.
#[derive(Clone)]
pub struct Checkers {
    chain: Vec<Arc<dyn Checker>>,
    metrics: Arc<Metrics>,
}

impl Checkers {
    /// Standard chain: Basic, Epoch, Parents, GasPower, Heavy.
    pub fn new(reader: Arc<dyn EpochReader>) -> Self {
        Self::from_chain(vec![
            Arc::new(BasicChecker::new()),
            Arc::new(EpochChecker::new(reader.clone())),
            Arc::new(ParentsChecker::new()),
            Arc::new(GasPowerChecker::new(reader.clone())),
            Arc::new(HeavyChecker::new(reader)),
        ])
    }

    /// Custom chain, run in the given order.
    pub fn from_chain(chain: Vec<Arc<dyn Checker>>) -> Self {
        Self {
            chain,
            metrics: Arc::new(Metrics::new()),
        }
    }

    /// Chain without the Heavy stage, for events whose signature is checked
    /// separately in a batch.
    pub fn light(&self) -> Self {
        Self {
            chain: self
                .chain
                .iter()
                .filter(|c| c.kind() != crate::CheckerKind::Heavy)
                .cloned()
                .collect(),
            metrics: self.metrics.clone(),
        }
    }

    /// Counters.
    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    /// Validate `event` against every stage in order, stopping at the
    /// first failure.
    pub fn validate(&self, event: &Event, parents: &[Event]) -> Result<(), CheckError> {
        for checker in &self.chain {
            if let Err(err) = checker.validate(event, parents) {
                debug!(
                    event = %event,
                    creator = %event.creator(),
                    checker = %checker.kind(),
                    error = %err,
                    "Event rejected"
                );
                self.metrics.record_rejected(&err);
                return Err(err);
            }
        }
        self.metrics.record_accepted();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::checker::CheckerKind;
    use crate::domain::errors::{BasicError, ParentsError};
    use crate::domain::errors::HeavyError;
    use crate::domain::heavy::sign_event;
    use ed25519_dalek::SigningKey;
    use parking_lot::Mutex;
    use proptest::prelude::*;
    use shared_types::{
        Epoch, EpochSnapshot, EventPayload, Rules, SnapshotCell, Timestamp, ValidatorId,
        ValidatorProfile, ValidatorSet,
    };
    use ts_01_gas_power::{calc_gas_power, calc_gas_power_used, GasPowerContext};

    struct Recording {
        kind: CheckerKind,
        fail: Option<CheckError>,
        log: Arc<Mutex<Vec<CheckerKind>>>,
    }

    impl Checker for Recording {
        fn kind(&self) -> CheckerKind {
            self.kind
        }

        fn validate(&self, _: &Event, _: &[Event]) -> Result<(), CheckError> {
            self.log.lock().push(self.kind);
            match &self.fail {
                Some(err) => Err(err.clone()),
                None => Ok(()),
            }
        }
    }

    fn chain(failing: CheckerKind, err: CheckError) -> (Checkers, Arc<Mutex<Vec<CheckerKind>>>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let stages = CheckerKind::ORDER
            .iter()
            .map(|kind| {
                Arc::new(Recording {
                    kind: *kind,
                    fail: (*kind == failing).then(|| err.clone()),
                    log: log.clone(),
                }) as Arc<dyn Checker>
            })
            .collect();
        (Checkers::from_chain(stages), log)
    }

    #[test]
    fn test_parents_failure_stops_before_gas_power_and_heavy() {
        let (checkers, log) = chain(
            CheckerKind::Parents,
            ParentsError::DuplicateParentCreator(ValidatorId(2)).into(),
        );
        let err = checkers
            .validate(&EventPayload::default().build(), &[])
            .unwrap_err();

        assert_eq!(err.kind(), CheckerKind::Parents);
        assert_eq!(
            *log.lock(),
            vec![CheckerKind::Basic, CheckerKind::Epoch, CheckerKind::Parents]
        );
        assert_eq!(checkers.metrics().snapshot().rejected_parents, 1);
    }

    #[test]
    fn test_cheap_error_wins_over_expensive() {
        let (checkers, log) = chain(
            CheckerKind::Basic,
            BasicError::NotInited { field: "seq" }.into(),
        );
        let err = checkers
            .validate(&EventPayload::default().build(), &[])
            .unwrap_err();
        assert_eq!(err.kind(), CheckerKind::Basic);
        assert_eq!(*log.lock(), vec![CheckerKind::Basic]);
    }

    #[test]
    fn test_light_chain_skips_heavy() {
        let (checkers, log) = chain(
            CheckerKind::Heavy,
            crate::HeavyError::WrongSignature.into(),
        );
        assert!(checkers.light().validate(&EventPayload::default().build(), &[]).is_ok());
        assert!(!log.lock().contains(&CheckerKind::Heavy));
    }

    const EPOCH_START_SECS: u64 = 100;

    fn epoch_of(weights: &[u32], key: &SigningKey) -> Arc<SnapshotCell> {
        let validators = ValidatorSet::new(weights.iter().enumerate().map(|(i, w)| {
            let pubkey = if i == 0 { key.verifying_key().to_bytes() } else { [i as u8; 32] };
            (ValidatorId(i as u32 + 1), ValidatorProfile { weight: *w, pubkey })
        }))
        .unwrap();
        Arc::new(SnapshotCell::new(EpochSnapshot::new(
            Epoch(1),
            validators,
            Rules::default(),
            Timestamp::from_secs(EPOCH_START_SECS),
        )))
    }

    /// First event of validator 1 with honest accounting, before signing.
    fn first_event(cell: &SnapshotCell, delay_secs: u64) -> EventPayload {
        let snapshot = cell.snapshot();
        let time = Timestamp::from_secs(EPOCH_START_SECS + delay_secs);
        let mut p = EventPayload {
            epoch: Epoch(1),
            seq: 1,
            creator: ValidatorId(1),
            lamport: 1,
            creation_time: time,
            median_time: time,
            ..EventPayload::default()
        };
        p.gas_power_used = calc_gas_power_used(&p, &snapshot.rules);
        let available = calc_gas_power(&p, None, &GasPowerContext::from_snapshot(snapshot));
        p.gas_power_left = available.saturating_sub(p.gas_power_used);
        p
    }

    fn corrupt(p: &mut EventPayload, how: u8, amount: u32) {
        match how {
            0 => {}
            1 => p.seq = 0,
            2 => p.lamport += amount,
            3 => p.gas_power_left.gas[0] += u64::from(amount),
            4 => p.extra = vec![0xEE; amount as usize],
            5 => p.signature[amount as usize % 64] ^= 0x01,
            6 => p.parents.push([amount as u8; 32]),
            _ => p.epoch = Epoch(1 + amount),
        }
    }

    proptest! {
        #[test]
        fn prop_verdicts_identical_across_runs_and_instances(
            others in proptest::collection::vec(1u32..1_000, 0..4),
            delay_secs in 1u64..600,
            how in 0u8..8,
            amount in 1u32..200,
        ) {
            let key = SigningKey::from_bytes(&[7u8; 32]);
            let mut weights = vec![1_000u32];
            weights.extend(others);
            let cell = epoch_of(&weights, &key);

            let mut p = first_event(&cell, delay_secs);
            let affordable = p.gas_power_left.min() > 0;
            sign_event(&mut p, &key);
            corrupt(&mut p, how, amount);
            let event = p.build();

            let a = Checkers::new(cell.clone());
            let b = Checkers::new(epoch_of(&weights, &key));
            let first = a.validate(&event, &[]);
            prop_assert_eq!(&first, &a.validate(&event, &[]));
            prop_assert_eq!(&first, &b.validate(&event, &[]));
            prop_assert_eq!(a.metrics().snapshot().accepted, b.metrics().snapshot().accepted * 2);

            if how == 0 && affordable {
                prop_assert_eq!(first, Ok::<(), CheckError>(()));
            } else if how == 5 {
                let forged: Result<(), CheckError> = Err(HeavyError::WrongSignature.into());
                prop_assert_eq!(first, forged);
            } else if how != 0 {
                prop_assert!(first.is_err());
            }
        }
    }
}
