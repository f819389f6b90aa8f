//! Ports for stream sync

pub mod inbound;
pub mod outbound;

pub use inbound::*;
pub use outbound::*;
