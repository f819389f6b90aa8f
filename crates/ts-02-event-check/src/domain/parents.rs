//! Parent consistency check.

use shared_types::Event;
use std::collections::HashSet;

use super::checker::{Checker, CheckerKind};
use super::errors::{CheckError, ParentsError};

/// Checks an event against its supplied parents: creators are distinct, the
/// self-parent is the creator's previous event, and seq, Lamport time,
/// creation time and epoch follow from the parents.
#[derive(Debug, Default, Clone)]
pub struct ParentsChecker;

impl ParentsChecker {
    /// Create the checker.
    pub fn new() -> Self {
        Self
    }
}

impl Checker for ParentsChecker {
    fn kind(&self) -> CheckerKind {
        CheckerKind::Parents
    }

    fn validate(&self, event: &Event, parents: &[Event]) -> Result<(), CheckError> {
        let ids = event.parents();
        if ids.len() != parents.len() || ids.iter().zip(parents).any(|(id, p)| *id != p.id()) {
            return Err(ParentsError::ParentsMismatch {
                expected: ids.len(),
            }
            .into());
        }

        let mut creators = HashSet::with_capacity(parents.len());
        for p in parents {
            if !creators.insert(p.creator()) {
                return Err(ParentsError::DuplicateParentCreator(p.creator()).into());
            }
            if p.epoch() > event.epoch() {
                return Err(ParentsError::FutureEpochParent {
                    parent: p.epoch(),
                    event: event.epoch(),
                }
                .into());
            }
        }

        // Only the first parent may be the self-parent, and only if it is
        // the creator's own event.
        for (i, p) in parents.iter().enumerate() {
            let own = p.creator() == event.creator();
            let declared = i == 0 && event.payload().is_self_parent(&p.id());
            if own != declared {
                return Err(ParentsError::WrongSelfParent.into());
            }
        }

        let max_lamport = parents.iter().map(|p| p.lamport()).max().unwrap_or(0);
        let expected_lamport = max_lamport.saturating_add(1);
        if event.lamport() != expected_lamport {
            return Err(ParentsError::WrongLamport {
                expected: expected_lamport,
                got: event.lamport(),
            }
            .into());
        }

        match event.self_parent().and(parents.first()) {
            Some(self_parent) => {
                let expected = self_parent.seq().saturating_add(1);
                if event.seq() != expected {
                    return Err(ParentsError::WrongSeq {
                        expected,
                        got: event.seq(),
                    }
                    .into());
                }
                if event.creation_time() <= self_parent.creation_time() {
                    return Err(ParentsError::PastTime.into());
                }
            }
            None if event.seq() != 1 => {
                return Err(ParentsError::WrongSeq {
                    expected: 1,
                    got: event.seq(),
                }
                .into());
            }
            None => {}
        }

        Ok(())
    }
}
