//! Keccak-256 helpers.

use sha3::{Digest, Keccak256};

use crate::entities::Hash;

/// Incremental Keccak-256 hasher producing a [`Hash`].
#[derive(Clone, Default)]
pub struct Keccak(Keccak256);

impl Keccak {
    /// Create an empty hasher.
    pub fn new() -> Self {
        Self(Keccak256::new())
    }

    /// Feed bytes.
    pub fn update(&mut self, data: &[u8]) {
        self.0.update(data);
    }

    /// Consume the hasher.
    pub fn finalize(self) -> Hash {
        self.0.finalize().into()
    }
}

/// One-shot Keccak-256.
pub fn keccak256(data: &[u8]) -> Hash {
    Keccak256::digest(data).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input_matches_known_digest() {
        assert_eq!(
            hex::encode(keccak256(&[])),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }

    #[test]
    fn test_incremental_matches_one_shot() {
        let mut hasher = Keccak::new();
        hasher.update(b"tes");
        hasher.update(b"sera");
        assert_eq!(hasher.finalize(), keccak256(b"tessera"));
    }
}
