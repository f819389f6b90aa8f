//! Signature and payload commitment check.

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use shared_types::{calc_payload_hash, EpochReader, Event, EventPayload};
use std::sync::Arc;

use super::checker::{Checker, CheckerKind};
use super::errors::{CheckError, HeavyError};

/// Sign `payload` in place with the creator's key. The signature covers the
/// event ID, which commits to every header field.
pub fn sign_event(payload: &mut EventPayload, key: &SigningKey) {
    let id = payload.compute_id();
    payload.signature = key.sign(&id).to_bytes();
}

/// Verifies the creator's signature over the event ID and the payload hash
/// over the transactions. The most expensive stage; always runs last.
pub struct HeavyChecker {
    reader: Arc<dyn EpochReader>,
}

impl HeavyChecker {
    /// Create the checker over an epoch source.
    pub fn new(reader: Arc<dyn EpochReader>) -> Self {
        Self { reader }
    }
}

impl Checker for HeavyChecker {
    fn kind(&self) -> CheckerKind {
        CheckerKind::Heavy
    }

    fn validate(&self, event: &Event, _parents: &[Event]) -> Result<(), CheckError> {
        let snapshot = self.reader.snapshot();
        if event.epoch() != snapshot.epoch {
            return Err(HeavyError::EpochChanged {
                event: event.epoch(),
                active: snapshot.epoch,
            }
            .into());
        }

        let profile = snapshot
            .validators
            .profile(event.creator())
            .ok_or(HeavyError::UnknownCreator(event.creator()))?;
        let key = VerifyingKey::from_bytes(&profile.pubkey)
            .map_err(|_| HeavyError::MalformedPublicKey(event.creator()))?;
        let signature = Signature::from_bytes(event.signature());
        key.verify(&event.id(), &signature)
            .map_err(|_| HeavyError::WrongSignature)?;

        if calc_payload_hash(event.txs()) != event.payload_hash() {
            return Err(HeavyError::WrongPayloadHash.into());
        }
        Ok(())
    }
}
