//! # Genesis Epoch Builder
//!
//! Derives the first epoch snapshot and the validator keys of a local
//! network from a seed phrase.

use shared_types::{
    keccak256, Epoch, EpochSnapshot, Rules, Timestamp, ValidatorId, ValidatorProfile,
    ValidatorSet, ValidatorSetError, Weight,
};
use ts_03_emitter::LocalKeySigner;

/// Local network parameters.
#[derive(Debug, Clone)]
pub struct GenesisConfig {
    /// Number of validators, IDs `1..=validators`
    pub validators: u32,
    /// Weight of every validator
    pub weight: Weight,
    /// First epoch
    pub epoch: Epoch,
    /// Protocol rules of the first epoch
    pub rules: Rules,
    /// Key derivation seed
    pub seed: String,
}

impl Default for GenesisConfig {
    fn default() -> Self {
        Self {
            validators: 4,
            weight: 1,
            epoch: Epoch(1),
            rules: Rules::for_testing(),
            seed: "tessera-devnet".to_string(),
        }
    }
}

/// First epoch and the keys that sign in it.
#[derive(Clone)]
pub struct Genesis {
    /// Epoch snapshot shared by every node
    pub snapshot: EpochSnapshot,
    /// Signing secret of each validator
    pub secrets: Vec<(ValidatorId, [u8; 32])>,
}

impl GenesisConfig {
    /// `validators` equal-weight validators.
    pub fn with_validators(validators: u32) -> Self {
        Self {
            validators,
            ..Self::default()
        }
    }

    /// Secret of `id`.
    pub fn secret(&self, id: ValidatorId) -> [u8; 32] {
        keccak256(format!("{}/validator/{}", self.seed, id.0).as_bytes())
    }

    /// Snapshot of the first epoch, starting at `start`.
    pub fn build(&self, start: Timestamp) -> Result<Genesis, ValidatorSetError> {
        let secrets: Vec<(ValidatorId, [u8; 32])> = (1..=self.validators)
            .map(|i| (ValidatorId(i), self.secret(ValidatorId(i))))
            .collect();
        let validators = ValidatorSet::new(secrets.iter().map(|(id, secret)| {
            (
                *id,
                ValidatorProfile {
                    weight: self.weight,
                    pubkey: LocalKeySigner::from_secret(secret).public_key(),
                },
            )
        }))?;

        Ok(Genesis {
            snapshot: EpochSnapshot::new(self.epoch, validators, self.rules.clone(), start),
            secrets,
        })
    }
}
