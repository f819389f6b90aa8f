//! Structural checks independent of chain state.

use shared_types::Event;
use std::collections::HashSet;

use super::checker::{Checker, CheckerKind};
use super::errors::{BasicError, CheckError};

/// Values above this are rejected as nonsensical.
const HUGE_U32: u32 = i32::MAX as u32 / 2;
/// Gas values above this are rejected as nonsensical.
const HUGE_GAS: u64 = i64::MAX as u64 / 2;
/// Extra data cap regardless of epoch rules.
pub const MAX_EXTRA_HARD_CAP: usize = 64 * 1024;

/// Well-formedness check: initialised counters, sane magnitudes, non-zero
/// times, distinct parents and executable transactions.
#[derive(Debug, Default, Clone)]
pub struct BasicChecker;

impl BasicChecker {
    /// Create the checker.
    pub fn new() -> Self {
        Self
    }

    fn check_inited(e: &Event) -> Result<(), BasicError> {
        if e.seq() == 0 {
            return Err(BasicError::NotInited { field: "seq" });
        }
        if e.epoch().0 == 0 {
            return Err(BasicError::NotInited { field: "epoch" });
        }
        if e.lamport() == 0 {
            return Err(BasicError::NotInited { field: "lamport" });
        }
        if e.seq() > 1 && e.parents().is_empty() {
            return Err(BasicError::NoParents { seq: e.seq() });
        }
        Ok(())
    }

    fn check_limits(e: &Event) -> Result<(), BasicError> {
        if e.seq() >= HUGE_U32 {
            return Err(BasicError::HugeValue { field: "seq" });
        }
        if e.epoch().0 >= HUGE_U32 {
            return Err(BasicError::HugeValue { field: "epoch" });
        }
        if e.lamport() >= HUGE_U32 {
            return Err(BasicError::HugeValue { field: "lamport" });
        }
        if e.gas_power_used() >= HUGE_GAS {
            return Err(BasicError::HugeValue {
                field: "gas_power_used",
            });
        }
        if e.gas_power_left().max() >= HUGE_GAS {
            return Err(BasicError::HugeValue {
                field: "gas_power_left",
            });
        }
        if e.creation_time().as_nanos() == 0 {
            return Err(BasicError::ZeroTime {
                field: "creation_time",
            });
        }
        if e.median_time().as_nanos() == 0 {
            return Err(BasicError::ZeroTime {
                field: "median_time",
            });
        }
        if e.extra().len() > MAX_EXTRA_HARD_CAP {
            return Err(BasicError::ExtraTooLarge {
                size: e.extra().len(),
                cap: MAX_EXTRA_HARD_CAP,
            });
        }
        Ok(())
    }

    fn check_parents(e: &Event) -> Result<(), BasicError> {
        let mut seen = HashSet::with_capacity(e.parents().len());
        for parent in e.parents() {
            if !seen.insert(parent) {
                return Err(BasicError::DoubleParents(*parent));
            }
        }
        Ok(())
    }

    fn check_txs(e: &Event) -> Result<(), BasicError> {
        for tx in e.txs() {
            if tx.gas >= HUGE_GAS {
                return Err(BasicError::HugeValue { field: "tx.gas" });
            }
            let intrinsic = tx.intrinsic_gas();
            if tx.gas < intrinsic {
                return Err(BasicError::IntrinsicGas {
                    tx: tx.hash,
                    gas: tx.gas,
                    intrinsic,
                });
            }
        }
        Ok(())
    }
}

impl Checker for BasicChecker {
    fn kind(&self) -> CheckerKind {
        CheckerKind::Basic
    }

    fn validate(&self, event: &Event, _parents: &[Event]) -> Result<(), CheckError> {
        Self::check_inited(event)?;
        Self::check_limits(event)?;
        Self::check_parents(event)?;
        Self::check_txs(event)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::{Epoch, EventPayload, Timestamp, Transaction, ValidatorId, U256};

    fn valid() -> EventPayload {
        EventPayload {
            epoch: Epoch(1),
            seq: 1,
            creator: ValidatorId(1),
            lamport: 1,
            creation_time: Timestamp::from_secs(1),
            median_time: Timestamp::from_secs(1),
            ..EventPayload::default()
        }
    }

    fn check(p: EventPayload) -> Result<(), CheckError> {
        BasicChecker::new().validate(&p.build(), &[])
    }

    #[test]
    fn test_valid_first_event_passes() {
        assert_eq!(check(valid()), Ok(()));
    }

    #[test]
    fn test_uninitialised_counters_rejected() {
        let mut p = valid();
        p.lamport = 0;
        assert_eq!(
            check(p),
            Err(BasicError::NotInited { field: "lamport" }.into())
        );
    }

    #[test]
    fn test_later_event_needs_parents() {
        let mut p = valid();
        p.seq = 2;
        assert_eq!(check(p), Err(BasicError::NoParents { seq: 2 }.into()));
    }

    #[test]
    fn test_zero_time_rejected() {
        let mut p = valid();
        p.median_time = Timestamp(0);
        assert!(matches!(check(p), Err(CheckError::Basic(BasicError::ZeroTime { .. }))));
    }

    #[test]
    fn test_double_parents_rejected() {
        let mut p = valid();
        p.parents = vec![[5u8; 32], [6u8; 32], [5u8; 32]];
        assert_eq!(check(p), Err(BasicError::DoubleParents([5u8; 32]).into()));
    }

    #[test]
    fn test_intrinsic_gas_enforced() {
        let mut p = valid();
        p.txs = vec![Transaction::new([1; 20], Some([2; 20]), 0, 20_999, U256::one(), vec![])];
        assert!(matches!(check(p), Err(CheckError::Basic(BasicError::IntrinsicGas { .. }))));
    }

    #[test]
    fn test_huge_values_rejected() {
        let mut p = valid();
        p.gas_power_used = u64::MAX;
        assert!(matches!(check(p), Err(CheckError::Basic(BasicError::HugeValue { .. }))));
    }
}
