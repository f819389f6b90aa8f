//! Gas power accounting check.

use shared_types::{EpochReader, Event, GasPowerKind};
use std::sync::Arc;
use ts_01_gas_power::{calc_gas_power, GasPowerContext};

use super::checker::{Checker, CheckerKind};
use super::errors::{CheckError, GasPowerError};

/// Recomputes the creator's available gas power from the self-parent (or
/// the epoch baseline) and rejects events that overspend or misreport what
/// is left.
pub struct GasPowerChecker {
    reader: Arc<dyn EpochReader>,
}

impl GasPowerChecker {
    /// Create the checker over an epoch source.
    pub fn new(reader: Arc<dyn EpochReader>) -> Self {
        Self { reader }
    }
}

impl Checker for GasPowerChecker {
    fn kind(&self) -> CheckerKind {
        CheckerKind::GasPower
    }

    fn validate(&self, event: &Event, parents: &[Event]) -> Result<(), CheckError> {
        let snapshot = self.reader.snapshot();
        if event.epoch() != snapshot.epoch {
            return Err(GasPowerError::EpochChanged {
                event: event.epoch(),
                active: snapshot.epoch,
            }
            .into());
        }

        let self_parent = match event.self_parent() {
            Some(id) => match parents.first() {
                Some(p) if p.id() == *id => Some(p),
                _ => return Err(GasPowerError::MissingSelfParent.into()),
            },
            None => None,
        };

        let ctx = GasPowerContext::from_snapshot(snapshot);
        let available = calc_gas_power(event.payload(), self_parent, &ctx);
        let used = event.gas_power_used();
        let left = event.gas_power_left();

        for kind in GasPowerKind::ALL {
            let have = available.get(kind);
            if used > have {
                return Err(GasPowerError::ExceedsAvailable {
                    kind,
                    used,
                    available: have,
                }
                .into());
            }
            if left.get(kind) != have - used {
                return Err(GasPowerError::WrongGasPowerLeft {
                    kind,
                    expected: have - used,
                    got: left.get(kind),
                }
                .into());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::{
        Epoch, EpochSnapshot, EventPayload, GasPowerLeft, Rules, SnapshotCell, Timestamp,
        ValidatorId, ValidatorProfile, ValidatorSet,
    };

    fn setup() -> (Arc<SnapshotCell>, GasPowerContext) {
        let validators = ValidatorSet::new(vec![
            (ValidatorId(1), ValidatorProfile { weight: 1, pubkey: [0; 32] }),
            (ValidatorId(2), ValidatorProfile { weight: 3, pubkey: [0; 32] }),
        ])
        .unwrap();
        let snapshot = EpochSnapshot::new(Epoch(1), validators, Rules::default(), Timestamp::from_secs(100));
        let cell = Arc::new(SnapshotCell::new(snapshot));
        let ctx = GasPowerContext::from_snapshot(cell.snapshot());
        (cell, ctx)
    }

    fn honest(p: &mut EventPayload, self_parent: Option<&Event>, ctx: &GasPowerContext, used: u64) {
        let available = calc_gas_power(p, self_parent, ctx);
        p.gas_power_used = used;
        p.gas_power_left = available.saturating_sub(used);
    }

    fn first_event(ctx: &GasPowerContext) -> Event {
        let mut p = EventPayload {
            epoch: Epoch(1),
            seq: 1,
            creator: ValidatorId(1),
            lamport: 1,
            creation_time: Timestamp::from_secs(101),
            median_time: Timestamp::from_secs(101),
            ..EventPayload::default()
        };
        honest(&mut p, None, ctx, 28_000);
        p.build()
    }

    #[test]
    fn test_honest_events_pass() {
        let (cell, ctx) = setup();
        let checker = GasPowerChecker::new(cell);
        let e1 = first_event(&ctx);
        assert_eq!(checker.validate(&e1, &[]), Ok(()));

        let mut p = EventPayload {
            seq: 2,
            lamport: 2,
            parents: vec![e1.id()],
            creation_time: Timestamp::from_secs(102),
            median_time: Timestamp::from_secs(102),
            ..e1.to_payload()
        };
        honest(&mut p, Some(&e1), &ctx, 50_000);
        assert_eq!(checker.validate(&p.build(), &[e1]), Ok(()));
    }

    #[test]
    fn test_misreported_left_rejected() {
        let (cell, ctx) = setup();
        let mut p = first_event(&ctx).to_payload();
        p.gas_power_left = GasPowerLeft::new(p.gas_power_left.gas[0] + 1, p.gas_power_left.gas[1]);
        let err = GasPowerChecker::new(cell).validate(&p.build(), &[]).unwrap_err();
        assert!(matches!(
            err,
            CheckError::GasPower(GasPowerError::WrongGasPowerLeft { kind: GasPowerKind::ShortTerm, .. })
        ));
    }

    #[test]
    fn test_overspending_rejected() {
        let (cell, ctx) = setup();
        let mut p = first_event(&ctx).to_payload();
        p.gas_power_used = u64::MAX / 4;
        p.gas_power_left = GasPowerLeft::default();
        let err = GasPowerChecker::new(cell).validate(&p.build(), &[]).unwrap_err();
        assert!(matches!(err, CheckError::GasPower(GasPowerError::ExceedsAvailable { .. })));
    }

    #[test]
    fn test_missing_self_parent_rejected() {
        let (cell, ctx) = setup();
        let e1 = first_event(&ctx);
        let p = EventPayload {
            seq: 2,
            lamport: 2,
            parents: vec![e1.id()],
            ..e1.to_payload()
        };
        let err = GasPowerChecker::new(cell).validate(&p.build(), &[]).unwrap_err();
        assert_eq!(err, GasPowerError::MissingSelfParent.into());
    }

    #[test]
    fn test_recomputation_is_deterministic() {
        let (cell, ctx) = setup();
        let e1 = first_event(&ctx);
        let checker = GasPowerChecker::new(cell);
        for _ in 0..3 {
            assert_eq!(checker.validate(&e1, &[]), Ok(()));
        }
    }
}
