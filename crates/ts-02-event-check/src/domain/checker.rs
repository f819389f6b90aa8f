//! The checker capability.

use shared_types::Event;
use std::fmt;

use super::errors::CheckError;

/// Identity of a checker in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CheckerKind {
    /// Structural well-formedness
    Basic,
    /// Epoch rules
    Epoch,
    /// Parent consistency
    Parents,
    /// Gas power accounting
    GasPower,
    /// Signature and payload commitment
    Heavy,
}

impl CheckerKind {
    /// Canonical pipeline order.
    pub const ORDER: [CheckerKind; 5] = [
        CheckerKind::Basic,
        CheckerKind::Epoch,
        CheckerKind::Parents,
        CheckerKind::GasPower,
        CheckerKind::Heavy,
    ];

    /// Label for logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckerKind::Basic => "basic",
            CheckerKind::Epoch => "epoch",
            CheckerKind::Parents => "parents",
            CheckerKind::GasPower => "gas_power",
            CheckerKind::Heavy => "heavy",
        }
    }
}

impl fmt::Display for CheckerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One validation stage.
///
/// `parents` are the event's parents in the order the event lists them.
/// Checkers that do not need them ignore the slice.
pub trait Checker: Send + Sync {
    /// Which stage this is.
    fn kind(&self) -> CheckerKind;

    /// Validate `event`; no side effects.
    fn validate(&self, event: &Event, parents: &[Event]) -> Result<(), CheckError>;
}
