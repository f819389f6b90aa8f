//! # DAG Events
//!
//! An event is the atomic unit of gossip: it bundles transactions with
//! references to prior events. Events are assembled as a mutable
//! [`EventPayload`] and frozen into an [`Event`], which caches the ID and the
//! encoded size.

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, Bytes};
use std::fmt;

use crate::entities::{
    bincode_size, Epoch, EventId, Hash, ItemSize, Signature, Transaction, ValidatorId,
};
use crate::hashing::Keccak;
use crate::time::Timestamp;

/// Number of gas power kinds.
pub const GAS_POWER_KINDS: usize = 2;

/// Gas power budget dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GasPowerKind {
    /// Fast refill, short accrual window.
    ShortTerm = 0,
    /// Slow refill, long accrual window.
    LongTerm = 1,
}

impl GasPowerKind {
    /// All kinds in index order.
    pub const ALL: [GasPowerKind; GAS_POWER_KINDS] = [GasPowerKind::ShortTerm, GasPowerKind::LongTerm];

    /// Index into gas power vectors.
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Remaining gas power per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct GasPowerLeft {
    /// Indexed by [`GasPowerKind::index`].
    pub gas: [u64; GAS_POWER_KINDS],
}

impl GasPowerLeft {
    /// Construct from short and long term values.
    pub const fn new(short: u64, long: u64) -> Self {
        Self { gas: [short, long] }
    }

    /// Value of one kind.
    pub fn get(&self, kind: GasPowerKind) -> u64 {
        self.gas[kind.index()]
    }

    /// Smallest remaining budget across kinds.
    pub fn min(&self) -> u64 {
        self.gas.iter().copied().min().unwrap_or(0)
    }

    /// Largest remaining budget across kinds.
    pub fn max(&self) -> u64 {
        self.gas.iter().copied().max().unwrap_or(0)
    }

    /// Deduct `used` from every kind, saturating at zero.
    pub fn saturating_sub(&self, used: u64) -> GasPowerLeft {
        let mut out = *self;
        for g in out.gas.iter_mut() {
            *g = g.saturating_sub(used);
        }
        out
    }
}

impl fmt::Display for GasPowerLeft {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{short={}, long={}}}", self.gas[0], self.gas[1])
    }
}

/// Mutable event under construction, or as decoded from the wire.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventPayload {
    /// Encoding version.
    pub version: u8,
    /// Epoch the event belongs to.
    pub epoch: Epoch,
    /// Position in the creator's own chain, starting at 1.
    pub seq: u32,
    /// Creating validator.
    pub creator: ValidatorId,
    /// Lamport time: one more than the highest parent Lamport time.
    pub lamport: u32,
    /// Parent IDs. The self-parent, if any, comes first.
    pub parents: Vec<EventId>,
    /// Creator's wall-clock time at creation.
    pub creation_time: Timestamp,
    /// Stake-weighted median of observed creation times.
    pub median_time: Timestamp,
    /// Gas power remaining after this event.
    pub gas_power_left: GasPowerLeft,
    /// Gas power consumed by this event.
    pub gas_power_used: u64,
    /// Free-form extra data.
    pub extra: Vec<u8>,
    /// Commitment to `txs`.
    pub payload_hash: Hash,
    /// Included transactions.
    pub txs: Vec<Transaction>,
    /// Creator's signature over the event ID.
    #[serde_as(as = "Bytes")]
    pub signature: Signature,
}

impl Default for EventPayload {
    fn default() -> Self {
        Self {
            version: 0,
            epoch: Epoch(0),
            seq: 0,
            creator: ValidatorId(0),
            lamport: 0,
            parents: Vec::new(),
            creation_time: Timestamp(0),
            median_time: Timestamp(0),
            gas_power_left: GasPowerLeft::default(),
            gas_power_used: 0,
            extra: Vec::new(),
            payload_hash: calc_payload_hash(&[]),
            txs: Vec::new(),
            signature: [0u8; 64],
        }
    }
}

impl EventPayload {
    /// Self-parent ID. Only events past the first of their chain have one.
    pub fn self_parent(&self) -> Option<&EventId> {
        if self.seq > 1 {
            self.parents.first()
        } else {
            None
        }
    }

    /// Whether `id` is this event's self-parent.
    pub fn is_self_parent(&self, id: &EventId) -> bool {
        self.self_parent() == Some(id)
    }

    /// Keccak over every header field except the signature.
    pub fn header_hash(&self) -> Hash {
        let mut hasher = Keccak::new();
        hasher.update(&[self.version]);
        hasher.update(&self.epoch.0.to_be_bytes());
        hasher.update(&self.seq.to_be_bytes());
        hasher.update(&self.creator.0.to_be_bytes());
        hasher.update(&self.lamport.to_be_bytes());
        hasher.update(&(self.parents.len() as u32).to_be_bytes());
        for parent in &self.parents {
            hasher.update(parent);
        }
        hasher.update(&self.creation_time.as_nanos().to_be_bytes());
        hasher.update(&self.median_time.as_nanos().to_be_bytes());
        for g in self.gas_power_left.gas {
            hasher.update(&g.to_be_bytes());
        }
        hasher.update(&self.gas_power_used.to_be_bytes());
        hasher.update(&(self.extra.len() as u32).to_be_bytes());
        hasher.update(&self.extra);
        hasher.update(&self.payload_hash);
        hasher.finalize()
    }

    /// Event ID derived from the header.
    pub fn compute_id(&self) -> EventId {
        let hash = self.header_hash();
        let mut id = [0u8; 32];
        id[..4].copy_from_slice(&self.epoch.0.to_be_bytes());
        id[4..8].copy_from_slice(&self.lamport.to_be_bytes());
        id[8..].copy_from_slice(&hash[8..]);
        id
    }

    /// Freeze into an immutable event.
    pub fn build(self) -> Event {
        Event::from(self)
    }
}

/// Commitment over transaction hashes in order.
pub fn calc_payload_hash(txs: &[Transaction]) -> Hash {
    let mut hasher = Keccak::new();
    for tx in txs {
        hasher.update(&tx.hash);
    }
    hasher.finalize()
}

/// Immutable event with cached ID and encoded size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "EventPayload", into = "EventPayload")]
pub struct Event {
    payload: EventPayload,
    id: EventId,
    size: u64,
}

impl From<EventPayload> for Event {
    fn from(payload: EventPayload) -> Self {
        let id = payload.compute_id();
        let size = bincode_size(&payload);
        Self { payload, id, size }
    }
}

impl From<Event> for EventPayload {
    fn from(event: Event) -> Self {
        event.payload
    }
}

impl Event {
    /// Event ID.
    pub fn id(&self) -> EventId {
        self.id
    }

    /// Encoded size in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Underlying payload.
    pub fn payload(&self) -> &EventPayload {
        &self.payload
    }

    /// Copy of the payload, for building a modified event.
    pub fn to_payload(&self) -> EventPayload {
        self.payload.clone()
    }

    /// Epoch.
    pub fn epoch(&self) -> Epoch {
        self.payload.epoch
    }

    /// Sequence number in the creator's chain.
    pub fn seq(&self) -> u32 {
        self.payload.seq
    }

    /// Creator.
    pub fn creator(&self) -> ValidatorId {
        self.payload.creator
    }

    /// Lamport time.
    pub fn lamport(&self) -> u32 {
        self.payload.lamport
    }

    /// Parent IDs, self-parent first.
    pub fn parents(&self) -> &[EventId] {
        &self.payload.parents
    }

    /// Self-parent ID.
    pub fn self_parent(&self) -> Option<&EventId> {
        self.payload.self_parent()
    }

    /// Creation time.
    pub fn creation_time(&self) -> Timestamp {
        self.payload.creation_time
    }

    /// Median time.
    pub fn median_time(&self) -> Timestamp {
        self.payload.median_time
    }

    /// Gas power left after this event.
    pub fn gas_power_left(&self) -> GasPowerLeft {
        self.payload.gas_power_left
    }

    /// Gas power used by this event.
    pub fn gas_power_used(&self) -> u64 {
        self.payload.gas_power_used
    }

    /// Extra data.
    pub fn extra(&self) -> &[u8] {
        &self.payload.extra
    }

    /// Payload commitment.
    pub fn payload_hash(&self) -> Hash {
        self.payload.payload_hash
    }

    /// Transactions.
    pub fn txs(&self) -> &[Transaction] {
        &self.payload.txs
    }

    /// Signature.
    pub fn signature(&self) -> &Signature {
        &self.payload.signature
    }
}

impl ItemSize for Event {
    fn encoded_size(&self) -> u64 {
        self.size
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}",
            self.payload.epoch,
            self.payload.lamport,
            hex::encode(&self.id[8..14])
        )
    }
}
