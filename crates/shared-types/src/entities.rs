//! # Core Domain Entities
//!
//! Identifiers, transactions, and the block-level records replicated by the
//! stream sync protocols.
//!
//! ## Clusters
//!
//! - **Identity**: `Hash`, `Address`, `PeerId`, `ValidatorId`, `Epoch`
//! - **Chain**: `Transaction`
//! - **Stream items**: `BlockVotes`, `BlockRecord`, `EpochPack`

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, Bytes};
use std::fmt;

use crate::hashing::{keccak256, Keccak};
use crate::time::Timestamp;

// Re-export U256 from primitive-types for use across all subsystems
pub use primitive_types::U256;

// =============================================================================
// CLUSTER A: IDENTITY
// =============================================================================

/// A 32-byte Keccak-256 hash.
pub type Hash = [u8; 32];

/// A 64-byte Ed25519 signature.
pub type Signature = [u8; 64];

/// A 32-byte Ed25519 public key.
pub type PublicKey = [u8; 32];

/// A 20-byte Ethereum-style address.
pub type Address = [u8; 20];

/// Identifier of an event in the DAG.
///
/// Layout: `epoch (4 BE) ‖ lamport (4 BE) ‖ hash[8..32]`, so IDs sort by
/// epoch and then by Lamport time.
pub type EventId = [u8; 32];

/// Intrinsic gas of a plain value transfer.
pub const TX_GAS: u64 = 21_000;
/// Extra intrinsic gas of a contract creation.
pub const TX_GAS_CONTRACT_CREATION: u64 = 53_000;
/// Intrinsic gas per zero byte of calldata.
pub const TX_DATA_ZERO_GAS: u64 = 4;
/// Intrinsic gas per non-zero byte of calldata.
pub const TX_DATA_NON_ZERO_GAS: u64 = 16;

/// Unique identifier for a node in the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub struct NodeId(pub [u8; 32]);

/// A peer identifier (alias for `NodeId` in peer contexts).
pub type PeerId = NodeId;

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(&self.0[..8]))
    }
}

/// Index of a validator within the validator registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub struct ValidatorId(pub u32);

impl fmt::Display for ValidatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// Epoch number. Epoch 0 is never valid for an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub struct Epoch(pub u32);

impl Epoch {
    /// The following epoch.
    pub fn next(self) -> Self {
        Epoch(self.0.saturating_add(1))
    }
}

impl fmt::Display for Epoch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Items whose encoded byte size is accounted by flow control.
pub trait ItemSize {
    /// Size of the item in its canonical encoding.
    fn encoded_size(&self) -> u64;
}

/// Bincode size of a value. Values that fail to encode count as oversized
/// so they never pass an admission check.
pub fn bincode_size<T: Serialize + ?Sized>(value: &T) -> u64 {
    bincode::serialized_size(value).unwrap_or(u64::MAX)
}

// =============================================================================
// CLUSTER B: THE CHAIN
// =============================================================================

/// A signed transaction as carried inside events.
///
/// Sender recovery happens upstream in the transaction pool; the `sender`
/// field is trusted at this layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Keccak-256 hash of the transaction body.
    pub hash: Hash,
    /// Sender address.
    pub sender: Address,
    /// Recipient address (`None` for contract creation).
    pub to: Option<Address>,
    /// Sender's nonce.
    pub nonce: u64,
    /// Gas limit.
    pub gas: u64,
    /// Gas price in base units.
    pub gas_price: U256,
    /// Transaction envelope type.
    pub tx_type: u8,
    /// Transferred value.
    pub value: U256,
    /// Calldata.
    pub data: Vec<u8>,
}

impl Transaction {
    /// Build a transaction and compute its hash.
    pub fn new(
        sender: Address,
        to: Option<Address>,
        nonce: u64,
        gas: u64,
        gas_price: U256,
        data: Vec<u8>,
    ) -> Self {
        let mut tx = Self {
            hash: [0u8; 32],
            sender,
            to,
            nonce,
            gas,
            gas_price,
            tx_type: 0,
            value: U256::zero(),
            data,
        };
        tx.hash = tx.compute_hash();
        tx
    }

    /// Builder-style setter for the envelope type. Recomputes the hash.
    pub fn with_type(mut self, tx_type: u8) -> Self {
        self.tx_type = tx_type;
        self.hash = self.compute_hash();
        self
    }

    /// Builder-style setter for the value. Recomputes the hash.
    pub fn with_value(mut self, value: U256) -> Self {
        self.value = value;
        self.hash = self.compute_hash();
        self
    }

    /// Keccak-256 over the canonical field order.
    pub fn compute_hash(&self) -> Hash {
        let mut hasher = Keccak::new();
        hasher.update(&[self.tx_type]);
        hasher.update(&self.sender);
        match &self.to {
            Some(to) => {
                hasher.update(&[1]);
                hasher.update(to);
            }
            None => hasher.update(&[0]),
        }
        hasher.update(&self.nonce.to_be_bytes());
        hasher.update(&self.gas.to_be_bytes());
        let mut word = [0u8; 32];
        self.gas_price.to_big_endian(&mut word);
        hasher.update(&word);
        self.value.to_big_endian(&mut word);
        hasher.update(&word);
        hasher.update(&self.data);
        hasher.finalize()
    }

    /// Minimum gas the transaction must carry to be executable at all.
    pub fn intrinsic_gas(&self) -> u64 {
        let base = if self.to.is_none() {
            TX_GAS + TX_GAS_CONTRACT_CREATION
        } else {
            TX_GAS
        };
        self.data.iter().fold(base, |acc, b| {
            let per_byte = if *b == 0 {
                TX_DATA_ZERO_GAS
            } else {
                TX_DATA_NON_ZERO_GAS
            };
            acc.saturating_add(per_byte)
        })
    }
}

impl ItemSize for Transaction {
    fn encoded_size(&self) -> u64 {
        bincode_size(self)
    }
}

// =============================================================================
// CLUSTER C: STREAM ITEMS
// =============================================================================

/// A batch of block votes cast by one validator for consecutive blocks.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockVotes {
    /// Epoch the votes belong to.
    pub epoch: Epoch,
    /// Voting validator.
    pub creator: ValidatorId,
    /// Index of the first voted block.
    pub start: u64,
    /// Hashes of consecutive voted blocks, starting at `start`.
    pub votes: Vec<Hash>,
    /// Signature of the voter.
    #[serde_as(as = "Bytes")]
    pub signature: Signature,
}

impl BlockVotes {
    /// Hash identifying this vote batch.
    pub fn id(&self) -> Hash {
        let mut hasher = Keccak::new();
        hasher.update(&self.epoch.0.to_be_bytes());
        hasher.update(&self.creator.0.to_be_bytes());
        hasher.update(&self.start.to_be_bytes());
        for vote in &self.votes {
            hasher.update(vote);
        }
        hasher.finalize()
    }
}

impl ItemSize for BlockVotes {
    fn encoded_size(&self) -> u64 {
        bincode_size(self)
    }
}

/// A finalized block as replicated to lagging nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockRecord {
    /// Block index.
    pub index: u64,
    /// Event that finalized the block.
    pub atropos: EventId,
    /// Consensus time of the block.
    pub time: Timestamp,
    /// Hashes of transactions included in the block.
    pub txs: Vec<Hash>,
    /// Gas consumed by the block.
    pub gas_used: u64,
}

impl BlockRecord {
    /// Block hash.
    pub fn hash(&self) -> Hash {
        let mut hasher = Keccak::new();
        hasher.update(&self.index.to_be_bytes());
        hasher.update(&self.atropos);
        hasher.update(&self.time.as_nanos().to_be_bytes());
        for tx in &self.txs {
            hasher.update(tx);
        }
        hasher.finalize()
    }
}

impl ItemSize for BlockRecord {
    fn encoded_size(&self) -> u64 {
        bincode_size(self)
    }
}

/// Summary of a sealed epoch, replicated so nodes can fast-forward epochs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpochPack {
    /// Sealed epoch.
    pub epoch: Epoch,
    /// First block of the epoch.
    pub start_block: u64,
    /// Last block of the epoch.
    pub end_block: u64,
    /// Hash of the validator set of the next epoch.
    pub next_validators: Hash,
    /// Vote batches proving the sealing blocks.
    pub votes: Vec<BlockVotes>,
}

impl EpochPack {
    /// Hash of the pack header.
    pub fn hash(&self) -> Hash {
        let mut header = Vec::with_capacity(4 + 8 + 8 + 32);
        header.extend_from_slice(&self.epoch.0.to_be_bytes());
        header.extend_from_slice(&self.start_block.to_be_bytes());
        header.extend_from_slice(&self.end_block.to_be_bytes());
        header.extend_from_slice(&self.next_validators);
        keccak256(&header)
    }
}

impl ItemSize for EpochPack {
    fn encoded_size(&self) -> u64 {
        bincode_size(self)
    }
}
