//! Network rules snapshot.
//!
//! Rules are versioned per epoch and read-only at runtime. Checkers and the
//! emitter share one `Arc<Rules>` per epoch.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::entities::U256;

/// Base gas charged for every event.
pub const DEFAULT_EVENT_GAS: u64 = 28_000;

/// Complete rules snapshot for one epoch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rules {
    /// Human-readable network name.
    pub name: String,
    /// DAG shape limits.
    pub dag: DagRules,
    /// Gas and gas power economy.
    pub economy: EconomyRules,
    /// Block limits.
    pub blocks: BlocksRules,
}

/// Limits on the DAG structure of events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DagRules {
    /// Maximum number of parents per event.
    pub max_parents: u32,
    /// Parents beyond this count are charged `parent_gas` each.
    pub max_free_parents: u32,
    /// Maximum length of the free-form extra field.
    pub max_extra_data: u32,
}

/// Gas pricing of event contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GasRules {
    /// Maximum total gas an event may consume.
    pub max_event_gas: u64,
    /// Base gas of any event.
    pub event_gas: u64,
    /// Gas per parent beyond the free ones.
    pub parent_gas: u64,
    /// Gas per byte of extra data.
    pub extra_data_gas: u64,
}

/// Allocation parameters of one gas power kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GasPowerRules {
    /// Network-wide gas power allocated per second, split by stake.
    pub alloc_per_sec: u64,
    /// Accrual stops after this much idle time.
    pub max_alloc_period: Duration,
    /// Accrual granted to a validator's first event.
    pub startup_alloc_period: Duration,
    /// Lower bound of the startup grant.
    pub min_startup_gas: u64,
}

/// Economic rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EconomyRules {
    /// Minimum gas price for transactions in events.
    pub min_gas_price: U256,
    /// Event gas pricing.
    pub gas: GasRules,
    /// Short-term gas power (fast refill, short accrual).
    pub short_gas_power: GasPowerRules,
    /// Long-term gas power (slow refill, long accrual).
    pub long_gas_power: GasPowerRules,
    /// Transaction envelope types accepted in events.
    pub tx_types: Vec<u8>,
}

/// Block limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlocksRules {
    /// Maximum gas of a block.
    pub max_block_gas: u64,
    /// Maximum period between blocks without transactions.
    pub max_empty_block_skip_period: Duration,
}

impl Default for DagRules {
    fn default() -> Self {
        Self {
            max_parents: 10,
            max_free_parents: 3,
            max_extra_data: 128,
        }
    }
}

impl Default for GasRules {
    fn default() -> Self {
        Self {
            max_event_gas: 10_000_000 + DEFAULT_EVENT_GAS,
            event_gas: DEFAULT_EVENT_GAS,
            parent_gas: 2_400,
            extra_data_gas: 25,
        }
    }
}

impl GasPowerRules {
    /// Long-term allocation defaults.
    pub fn default_long() -> Self {
        Self {
            alloc_per_sec: 100 * DEFAULT_EVENT_GAS,
            max_alloc_period: Duration::from_secs(60 * 60),
            startup_alloc_period: Duration::from_secs(5),
            min_startup_gas: DEFAULT_EVENT_GAS * 20,
        }
    }

    /// Short-term allocation defaults.
    pub fn default_short() -> Self {
        let long = Self::default_long();
        Self {
            alloc_per_sec: long.alloc_per_sec * 2,
            max_alloc_period: Duration::from_secs(5),
            startup_alloc_period: long.startup_alloc_period / 2,
            min_startup_gas: long.min_startup_gas / 2,
        }
    }
}

impl Default for EconomyRules {
    fn default() -> Self {
        Self {
            min_gas_price: U256::from(1_000_000_000u64),
            gas: GasRules::default(),
            short_gas_power: GasPowerRules::default_short(),
            long_gas_power: GasPowerRules::default_long(),
            tx_types: vec![0, 1, 2],
        }
    }
}

impl Default for BlocksRules {
    fn default() -> Self {
        Self {
            max_block_gas: 20_500_000,
            max_empty_block_skip_period: Duration::from_secs(60),
        }
    }
}

impl Default for Rules {
    fn default() -> Self {
        Self {
            name: "main".to_string(),
            dag: DagRules::default(),
            economy: EconomyRules::default(),
            blocks: BlocksRules::default(),
        }
    }
}

impl Rules {
    /// Rules for local test networks: cheap gas, zero minimum price.
    pub fn for_testing() -> Self {
        let mut rules = Self {
            name: "fake".to_string(),
            ..Self::default()
        };
        rules.economy.min_gas_price = U256::zero();
        rules
    }

    /// Whether transactions of `tx_type` are accepted.
    pub fn supports_tx_type(&self, tx_type: u8) -> bool {
        self.economy.tx_types.contains(&tx_type)
    }
}
