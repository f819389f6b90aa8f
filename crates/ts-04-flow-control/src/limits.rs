//! Wire protocol hard limits.

/// Maximum size of a single protocol message.
pub const PROTOCOL_MAX_MSG_SIZE: u64 = 10 * 1024 * 1024;

/// Maximum number of items in a single protocol message.
pub const HARD_LIMIT_ITEMS: u64 = 4000;

/// Preferred number of items in a single protocol message.
pub const SOFT_LIMIT_ITEMS: u64 = 250;
