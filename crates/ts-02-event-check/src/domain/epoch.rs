//! Epoch rules check.

use shared_types::{EpochReader, Event, Rules, Transaction};
use std::sync::Arc;
use ts_01_gas_power::calc_gas_power_used;

use super::checker::{Checker, CheckerKind};
use super::errors::{CheckError, EpochError};

/// Transaction rules of an epoch: supported envelope type and minimum gas
/// price. Also used on its own to pre-filter transactions before emission.
pub fn check_txs(txs: &[Transaction], rules: &Rules) -> Result<(), EpochError> {
    for tx in txs {
        if !rules.supports_tx_type(tx.tx_type) {
            return Err(EpochError::UnsupportedTxType {
                tx: tx.hash,
                tx_type: tx.tx_type,
            });
        }
        if tx.gas_price < rules.economy.min_gas_price {
            return Err(EpochError::Underpriced { tx: tx.hash });
        }
    }
    Ok(())
}

/// Checks an event against the active epoch's validators and rules.
pub struct EpochChecker {
    reader: Arc<dyn EpochReader>,
}

impl EpochChecker {
    /// Create the checker over an epoch source.
    pub fn new(reader: Arc<dyn EpochReader>) -> Self {
        Self { reader }
    }
}

impl Checker for EpochChecker {
    fn kind(&self) -> CheckerKind {
        CheckerKind::Epoch
    }

    fn validate(&self, event: &Event, _parents: &[Event]) -> Result<(), CheckError> {
        let snapshot = self.reader.snapshot();
        if event.epoch() != snapshot.epoch {
            return Err(EpochError::NotRelevant {
                event: event.epoch(),
                active: snapshot.epoch,
            }
            .into());
        }
        if !snapshot.validators.exists(event.creator()) {
            return Err(EpochError::UnknownCreator(event.creator()).into());
        }

        let rules = &snapshot.rules;
        if event.parents().len() > rules.dag.max_parents as usize {
            return Err(EpochError::TooManyParents {
                count: event.parents().len(),
                max: rules.dag.max_parents,
            }
            .into());
        }
        if event.extra().len() > rules.dag.max_extra_data as usize {
            return Err(EpochError::TooBigExtra {
                size: event.extra().len(),
                max: rules.dag.max_extra_data,
            }
            .into());
        }

        let max = rules.economy.gas.max_event_gas;
        if event.gas_power_used() > max {
            return Err(EpochError::TooBigGasUsed {
                used: event.gas_power_used(),
                max,
            }
            .into());
        }
        let expected = calc_gas_power_used(event.payload(), rules);
        if event.gas_power_used() != expected {
            return Err(EpochError::WrongGasUsed {
                expected,
                got: event.gas_power_used(),
            }
            .into());
        }

        check_txs(event.txs(), rules)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::{
        Epoch, EpochSnapshot, EventPayload, SnapshotCell, Timestamp, ValidatorId, ValidatorProfile,
        ValidatorSet, U256,
    };

    fn reader(rules: Rules) -> Arc<dyn EpochReader> {
        let validators = ValidatorSet::new(vec![(
            ValidatorId(1),
            ValidatorProfile {
                weight: 1,
                pubkey: [0u8; 32],
            },
        )])
        .unwrap();
        Arc::new(SnapshotCell::new(EpochSnapshot::new(
            Epoch(5),
            validators,
            rules,
            Timestamp(1),
        )))
    }

    fn payload(rules: &Rules) -> EventPayload {
        let mut p = EventPayload {
            epoch: Epoch(5),
            seq: 1,
            creator: ValidatorId(1),
            lamport: 1,
            ..EventPayload::default()
        };
        p.gas_power_used = calc_gas_power_used(&p, rules);
        p
    }

    #[test]
    fn test_valid_event_passes() {
        let rules = Rules::for_testing();
        let checker = EpochChecker::new(reader(rules.clone()));
        assert_eq!(checker.validate(&payload(&rules).build(), &[]), Ok(()));
    }

    #[test]
    fn test_other_epoch_not_relevant() {
        let rules = Rules::for_testing();
        let mut p = payload(&rules);
        p.epoch = Epoch(4);
        let err = EpochChecker::new(reader(rules)).validate(&p.build(), &[]).unwrap_err();
        assert!(matches!(err, CheckError::Epoch(EpochError::NotRelevant { .. })));
    }

    #[test]
    fn test_unknown_creator_rejected() {
        let rules = Rules::for_testing();
        let mut p = payload(&rules);
        p.creator = ValidatorId(2);
        let err = EpochChecker::new(reader(rules)).validate(&p.build(), &[]).unwrap_err();
        assert_eq!(err, EpochError::UnknownCreator(ValidatorId(2)).into());
    }

    #[test]
    fn test_wrong_gas_used_rejected() {
        let rules = Rules::for_testing();
        let mut p = payload(&rules);
        p.gas_power_used += 1;
        let err = EpochChecker::new(reader(rules)).validate(&p.build(), &[]).unwrap_err();
        assert!(matches!(err, CheckError::Epoch(EpochError::WrongGasUsed { .. })));
    }

    #[test]
    fn test_too_many_parents_rejected() {
        let rules = Rules::for_testing();
        let mut p = payload(&rules);
        p.parents = (0..11u8).map(|i| [i; 32]).collect();
        let err = EpochChecker::new(reader(rules)).validate(&p.build(), &[]).unwrap_err();
        assert!(matches!(err, CheckError::Epoch(EpochError::TooManyParents { count: 11, .. })));
    }

    #[test]
    fn test_check_txs_standalone() {
        let mut rules = Rules::default();
        rules.economy.min_gas_price = U256::from(10u64);
        let cheap = Transaction::new([1; 20], Some([2; 20]), 0, 21_000, U256::from(9u64), vec![]);
        let fine = Transaction::new([1; 20], Some([2; 20]), 1, 21_000, U256::from(10u64), vec![]);
        let exotic = fine.clone().with_type(9);

        assert_eq!(check_txs(&[fine.clone()], &rules), Ok(()));
        assert_eq!(
            check_txs(&[fine, cheap.clone()], &rules),
            Err(EpochError::Underpriced { tx: cheap.hash })
        );
        assert!(matches!(
            check_txs(&[exotic], &rules),
            Err(EpochError::UnsupportedTxType { tx_type: 9, .. })
        ));
    }
}
