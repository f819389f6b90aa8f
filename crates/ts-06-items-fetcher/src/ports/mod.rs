//! Ports for the items fetcher

pub mod inbound;
pub mod outbound;

pub use inbound::*;
pub use outbound::*;
