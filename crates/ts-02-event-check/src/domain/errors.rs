//! Validation errors, one enum per checker.

use shared_types::{Epoch, GasPowerKind, Hash, ValidatorId};
use thiserror::Error;

use super::checker::CheckerKind;

/// Structural errors found without any chain state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BasicError {
    /// A counter that starts at 1 is zero.
    #[error("event is not initialised: {field} is zero")]
    NotInited {
        /// Offending field
        field: &'static str,
    },

    /// Non-first event without parents.
    #[error("event with seq {seq} has no parents")]
    NoParents {
        /// Sequence number
        seq: u32,
    },

    /// A value is too large to be meaningful.
    #[error("too large value in {field}")]
    HugeValue {
        /// Offending field
        field: &'static str,
    },

    /// Creation or median time is zero.
    #[error("zero {field}")]
    ZeroTime {
        /// Offending field
        field: &'static str,
    },

    /// The same parent is referenced twice.
    #[error("duplicate parent {}", hex::encode(.0))]
    DoubleParents(Hash),

    /// Extra data beyond the protocol hard cap.
    #[error("extra data of {size} bytes exceeds hard cap {cap}")]
    ExtraTooLarge {
        /// Extra data length
        size: usize,
        /// Hard cap
        cap: usize,
    },

    /// A transaction carries less gas than it needs to execute at all.
    #[error("transaction {} has gas {gas} below intrinsic {intrinsic}", hex::encode(.tx))]
    IntrinsicGas {
        /// Transaction hash
        tx: Hash,
        /// Declared gas
        gas: u64,
        /// Intrinsic gas
        intrinsic: u64,
    },
}

/// Violations of the epoch's rules.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EpochError {
    /// Event belongs to a different epoch than the active one.
    #[error("event epoch {event} is not the active epoch {active}")]
    NotRelevant {
        /// Event epoch
        event: Epoch,
        /// Active epoch
        active: Epoch,
    },

    /// Creator is not a validator of the epoch.
    #[error("creator {0} is not a validator")]
    UnknownCreator(ValidatorId),

    /// More parents than the rules allow.
    #[error("{count} parents exceed maximum {max}")]
    TooManyParents {
        /// Parent count
        count: usize,
        /// Maximum
        max: u32,
    },

    /// Extra data longer than the rules allow.
    #[error("extra data of {size} bytes exceeds maximum {max}")]
    TooBigExtra {
        /// Extra data length
        size: usize,
        /// Maximum
        max: u32,
    },

    /// Event consumes more than the per-event gas cap.
    #[error("gas used {used} exceeds max event gas {max}")]
    TooBigGasUsed {
        /// Claimed usage
        used: u64,
        /// Cap
        max: u64,
    },

    /// Claimed gas usage differs from the computed one.
    #[error("gas used {got} differs from computed {expected}")]
    WrongGasUsed {
        /// Computed usage
        expected: u64,
        /// Claimed usage
        got: u64,
    },

    /// Transaction envelope type not enabled in this epoch.
    #[error("transaction {} has unsupported type {tx_type}", hex::encode(.tx))]
    UnsupportedTxType {
        /// Transaction hash
        tx: Hash,
        /// Envelope type
        tx_type: u8,
    },

    /// Transaction gas price below the epoch minimum.
    #[error("transaction {} is underpriced", hex::encode(.tx))]
    Underpriced {
        /// Transaction hash
        tx: Hash,
    },
}

/// Inconsistencies between an event and its parents.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParentsError {
    /// The supplied parents do not match the event's parent list.
    #[error("supplied parents do not match the event's {expected} parents")]
    ParentsMismatch {
        /// Parents the event lists
        expected: usize,
    },

    /// Two parents share a creator.
    #[error("two parents created by {0}")]
    DuplicateParentCreator(ValidatorId),

    /// Self-parent flags disagree with parent creators.
    #[error("wrong self-parent")]
    WrongSelfParent,

    /// Sequence number does not follow the self-parent.
    #[error("wrong seq {got}, expected {expected}")]
    WrongSeq {
        /// Expected seq
        expected: u32,
        /// Event seq
        got: u32,
    },

    /// Lamport time is not one more than the highest parent.
    #[error("wrong lamport {got}, expected {expected}")]
    WrongLamport {
        /// Expected Lamport time
        expected: u32,
        /// Event Lamport time
        got: u32,
    },

    /// Creation time does not move past the self-parent.
    #[error("creation time is not after the self-parent")]
    PastTime,

    /// A parent belongs to a later epoch.
    #[error("parent from epoch {parent} is later than event epoch {event}")]
    FutureEpochParent {
        /// Parent epoch
        parent: Epoch,
        /// Event epoch
        event: Epoch,
    },
}

/// Gas power accounting failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GasPowerError {
    /// The epoch changed between checks.
    #[error("event epoch {event} is not the active epoch {active}")]
    EpochChanged {
        /// Event epoch
        event: Epoch,
        /// Active epoch
        active: Epoch,
    },

    /// Event declares a self-parent that was not supplied.
    #[error("self-parent not supplied")]
    MissingSelfParent,

    /// Usage exceeds what the validator has accrued.
    #[error("{kind:?} gas power {available} is below used {used}")]
    ExceedsAvailable {
        /// Gas power kind
        kind: GasPowerKind,
        /// Claimed usage
        used: u64,
        /// Computed availability
        available: u64,
    },

    /// Claimed remaining gas power differs from the recomputation.
    #[error("{kind:?} gas power left {got} differs from computed {expected}")]
    WrongGasPowerLeft {
        /// Gas power kind
        kind: GasPowerKind,
        /// Computed remaining power
        expected: u64,
        /// Claimed remaining power
        got: u64,
    },
}

/// Cryptographic failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HeavyError {
    /// The epoch changed between checks.
    #[error("event epoch {event} is not the active epoch {active}")]
    EpochChanged {
        /// Event epoch
        event: Epoch,
        /// Active epoch
        active: Epoch,
    },

    /// No public key is registered for the creator.
    #[error("no public key for {0}")]
    UnknownCreator(ValidatorId),

    /// The registered public key is not a valid curve point.
    #[error("malformed public key for {0}")]
    MalformedPublicKey(ValidatorId),

    /// Signature does not verify against the event ID.
    #[error("wrong event signature")]
    WrongSignature,

    /// Payload hash does not commit to the transactions.
    #[error("payload hash mismatch")]
    WrongPayloadHash,
}

/// Failure of the validation pipeline, attributed to the failing checker.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckError {
    /// Basic check failure
    #[error("basic check: {0}")]
    Basic(#[from] BasicError),

    /// Epoch check failure
    #[error("epoch check: {0}")]
    Epoch(#[from] EpochError),

    /// Parents check failure
    #[error("parents check: {0}")]
    Parents(#[from] ParentsError),

    /// Gas power check failure
    #[error("gas power check: {0}")]
    GasPower(#[from] GasPowerError),

    /// Heavy check failure
    #[error("heavy check: {0}")]
    Heavy(#[from] HeavyError),
}

impl CheckError {
    /// Checker that produced the error.
    pub fn kind(&self) -> CheckerKind {
        match self {
            CheckError::Basic(_) => CheckerKind::Basic,
            CheckError::Epoch(_) => CheckerKind::Epoch,
            CheckError::Parents(_) => CheckerKind::Parents,
            CheckError::GasPower(_) => CheckerKind::GasPower,
            CheckError::Heavy(_) => CheckerKind::Heavy,
        }
    }

    /// Whether the event can never become valid. Only an epoch mismatch
    /// depends on the local node's view.
    pub fn is_permanent(&self) -> bool {
        !self.is_epoch_mismatch()
    }

    /// Whether the sending peer should be penalized. Events of another
    /// epoch are dropped without penalty.
    pub fn penalizes_peer(&self) -> bool {
        !self.is_epoch_mismatch()
    }

    fn is_epoch_mismatch(&self) -> bool {
        matches!(
            self,
            CheckError::Epoch(EpochError::NotRelevant { .. })
                | CheckError::GasPower(GasPowerError::EpochChanged { .. })
                | CheckError::Heavy(HeavyError::EpochChanged { .. })
        )
    }
}
