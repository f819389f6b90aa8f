//! Stake-weighted validator sets.
//!
//! A `ValidatorSet` is an immutable per-epoch snapshot. Its canonical order
//! (weight descending, then ID ascending) is consensus-visible: the turn
//! permutation indexes into it, so two nodes with the same registry must
//! derive the same order.

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, Bytes};
use std::collections::HashMap;
use thiserror::Error;

use crate::entities::{PublicKey, ValidatorId};
use crate::hashing::Keccak;

/// Stake weight of a validator.
pub type Weight = u32;

/// Errors raised while building a validator set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidatorSetError {
    /// The same validator was listed twice.
    #[error("duplicate validator {0}")]
    Duplicate(ValidatorId),

    /// A validator with zero weight cannot participate.
    #[error("validator {0} has zero weight")]
    ZeroWeight(ValidatorId),

    /// Total stake does not fit in the weight type.
    #[error("total weight overflows")]
    TotalWeightOverflow,
}

/// A validator's registry entry.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorProfile {
    /// Stake weight.
    pub weight: Weight,
    /// Ed25519 key used to sign events.
    #[serde_as(as = "Bytes")]
    pub pubkey: PublicKey,
}

/// Immutable, canonically ordered validator set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorSet {
    ids: Vec<ValidatorId>,
    profiles: Vec<ValidatorProfile>,
    #[serde(skip)]
    index: HashMap<ValidatorId, usize>,
    total_weight: Weight,
}

impl ValidatorSet {
    /// Build a set from `(id, profile)` pairs in any order.
    pub fn new(
        entries: impl IntoIterator<Item = (ValidatorId, ValidatorProfile)>,
    ) -> Result<Self, ValidatorSetError> {
        let mut entries: Vec<(ValidatorId, ValidatorProfile)> = entries.into_iter().collect();
        entries.sort_by(|(a_id, a), (b_id, b)| b.weight.cmp(&a.weight).then(a_id.cmp(b_id)));

        let mut index = HashMap::with_capacity(entries.len());
        let mut total: Weight = 0;
        for (pos, (id, profile)) in entries.iter().enumerate() {
            if profile.weight == 0 {
                return Err(ValidatorSetError::ZeroWeight(*id));
            }
            if index.insert(*id, pos).is_some() {
                return Err(ValidatorSetError::Duplicate(*id));
            }
            total = total
                .checked_add(profile.weight)
                .ok_or(ValidatorSetError::TotalWeightOverflow)?;
        }

        let (ids, profiles) = entries.into_iter().unzip();
        Ok(Self {
            ids,
            profiles,
            index,
            total_weight: total,
        })
    }

    /// Number of validators.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Sum of all weights.
    pub fn total_weight(&self) -> Weight {
        self.total_weight
    }

    /// Whether `id` is a member.
    pub fn exists(&self, id: ValidatorId) -> bool {
        self.position(id).is_some()
    }

    /// Weight of `id`, zero for non-members.
    pub fn get(&self, id: ValidatorId) -> Weight {
        self.profile(id).map(|p| p.weight).unwrap_or(0)
    }

    /// Registry entry of `id`.
    pub fn profile(&self, id: ValidatorId) -> Option<&ValidatorProfile> {
        self.position(id).map(|i| &self.profiles[i])
    }

    /// Position of `id` in canonical order.
    pub fn position(&self, id: ValidatorId) -> Option<usize> {
        if self.index.len() == self.ids.len() {
            return self.index.get(&id).copied();
        }
        // Deserialized sets skip the lookup map.
        self.ids.iter().position(|v| *v == id)
    }

    /// Validator at canonical position `idx`.
    pub fn get_id(&self, idx: usize) -> Option<ValidatorId> {
        self.ids.get(idx).copied()
    }

    /// IDs in canonical order.
    pub fn sorted_ids(&self) -> &[ValidatorId] {
        &self.ids
    }

    /// Weights in canonical order.
    pub fn sorted_weights(&self) -> Vec<Weight> {
        self.profiles.iter().map(|p| p.weight).collect()
    }

    /// Hash committing to the canonical order, weights and keys.
    pub fn hash(&self) -> crate::entities::Hash {
        let mut hasher = Keccak::new();
        for (id, profile) in self.ids.iter().zip(&self.profiles) {
            hasher.update(&id.0.to_be_bytes());
            hasher.update(&profile.weight.to_be_bytes());
            hasher.update(&profile.pubkey);
        }
        hasher.finalize()
    }
}
