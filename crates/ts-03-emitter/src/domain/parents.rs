//! Parent selection and derived header fields.

use shared_types::{Event, Timestamp, ValidatorId, ValidatorSet};
use std::collections::HashMap;

/// Parents of the next own event: the self-parent first, then at most one
/// head per other creator, most recent Lamport time first.
pub fn choose_parents(
    self_parent: Option<&Event>,
    heads: &[Event],
    me: ValidatorId,
    max_parents: usize,
) -> Vec<Event> {
    let mut best: HashMap<ValidatorId, &Event> = HashMap::new();
    for head in heads.iter().filter(|h| h.creator() != me) {
        let slot = best.entry(head.creator()).or_insert(head);
        if (head.lamport(), head.id()) > (slot.lamport(), slot.id()) {
            *slot = head;
        }
    }

    let mut others: Vec<&Event> = best.into_values().collect();
    others.sort_by(|a, b| b.lamport().cmp(&a.lamport()).then(a.id().cmp(&b.id())));

    let mut parents: Vec<Event> = Vec::with_capacity(max_parents);
    if let Some(sp) = self_parent {
        parents.push(sp.clone());
    }
    let room = max_parents.saturating_sub(parents.len());
    parents.extend(others.into_iter().take(room).cloned());
    parents
}

/// Stake-weighted median of the creation times visible through `parents`.
///
/// Validators not referenced by a parent count with `fallback`.
pub fn median_time(parents: &[Event], validators: &ValidatorSet, fallback: Timestamp) -> Timestamp {
    let mut latest: HashMap<ValidatorId, Timestamp> = HashMap::new();
    for p in parents {
        let t = latest.entry(p.creator()).or_insert(p.creation_time());
        *t = (*t).max(p.creation_time());
    }

    let mut times: Vec<(Timestamp, u64)> = validators
        .sorted_ids()
        .iter()
        .map(|id| {
            let t = latest.get(id).copied().unwrap_or(fallback);
            (t, u64::from(validators.get(*id)))
        })
        .collect();
    times.sort_by_key(|(t, _)| *t);

    let total = u64::from(validators.total_weight());
    let mut acc = 0u64;
    for (t, w) in times {
        acc += w;
        if acc * 2 >= total {
            return t;
        }
    }
    fallback
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::{Epoch, EventPayload, ValidatorProfile};

    fn ev(creator: u32, lamport: u32, secs: u64) -> Event {
        EventPayload {
            epoch: Epoch(1),
            seq: 1,
            creator: ValidatorId(creator),
            lamport,
            creation_time: Timestamp::from_secs(secs),
            median_time: Timestamp::from_secs(secs),
            ..EventPayload::default()
        }
        .build()
    }

    fn set(weights: &[u32]) -> ValidatorSet {
        ValidatorSet::new(weights.iter().enumerate().map(|(i, w)| {
            (
                ValidatorId(i as u32 + 1),
                ValidatorProfile {
                    weight: *w,
                    pubkey: [0u8; 32],
                },
            )
        }))
        .unwrap()
    }

    #[test]
    fn test_self_parent_first_and_one_head_per_creator() {
        let sp = ev(1, 4, 10);
        let heads = vec![ev(2, 3, 9), ev(2, 5, 11), ev(3, 2, 8), ev(1, 4, 10)];
        let parents = choose_parents(Some(&sp), &heads, ValidatorId(1), 10);

        let creators: Vec<u32> = parents.iter().map(|p| p.creator().0).collect();
        assert_eq!(creators, vec![1, 2, 3]);
        assert_eq!(parents[1].lamport(), 5);
    }

    #[test]
    fn test_parent_limit() {
        let heads = vec![ev(2, 1, 1), ev(3, 2, 1), ev(4, 3, 1)];
        let parents = choose_parents(None, &heads, ValidatorId(1), 2);
        let creators: Vec<u32> = parents.iter().map(|p| p.creator().0).collect();
        assert_eq!(creators, vec![4, 3]);
    }

    #[test]
    fn test_median_is_stake_weighted() {
        let validators = set(&[1, 1, 5]);
        let parents = vec![ev(1, 1, 10), ev(2, 1, 20), ev(3, 1, 30)];
        assert_eq!(
            median_time(&parents, &validators, Timestamp::from_secs(1)),
            Timestamp::from_secs(30)
        );
    }

    #[test]
    fn test_unreferenced_validators_use_fallback() {
        let validators = set(&[1, 1, 1]);
        let parents = vec![ev(1, 1, 10)];
        assert_eq!(
            median_time(&parents, &validators, Timestamp::from_secs(2)),
            Timestamp::from_secs(2)
        );
    }
}
