//! Adapters for the outbound ports that need no external system.

use ed25519_dalek::SigningKey;
use shared_types::EventPayload;
use ts_02_event_check::sign_event;

use crate::error::Result;
use crate::ports::EventSigner;

/// Signs with an in-process Ed25519 key.
pub struct LocalKeySigner {
    key: SigningKey,
}

impl LocalKeySigner {
    /// Wrap a signing key.
    pub fn new(key: SigningKey) -> Self {
        Self { key }
    }

    /// Key from a 32-byte secret.
    pub fn from_secret(secret: &[u8; 32]) -> Self {
        Self::new(SigningKey::from_bytes(secret))
    }

    /// Public key matching the registry entry.
    pub fn public_key(&self) -> [u8; 32] {
        self.key.verifying_key().to_bytes()
    }
}

impl EventSigner for LocalKeySigner {
    fn sign(&self, payload: &mut EventPayload) -> Result<()> {
        sign_event(payload, &self.key);
        Ok(())
    }
}
