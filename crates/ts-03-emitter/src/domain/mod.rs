//! Pure emission logic: no I/O, no clocks, no locks beyond the liveness
//! view.

pub mod add_txs;
pub mod gas_ceiling;
pub mod offline;
pub mod ordering;
pub mod originated;
pub mod parents;
pub mod permutation;
pub mod turn;

pub use add_txs::{add_txs, AddTxsContext, AddTxsReport};
pub use gas_ceiling::{max_gas_power_to_use, max_pending_gas, ThrottleConfig, MIN_MAX_PENDING_GAS};
pub use offline::OfflineValidators;
pub use ordering::TxsByPriceAndNonce;
pub use originated::OriginatedTxs;
pub use parents::{choose_parents, median_time};
pub use permutation::{weighted_permutation, PermutationError};
pub use turn::{
    is_my_tx_turn, tx_round_index, tx_time, tx_turn_originator, turn_seed, TurnConfig,
    TurnContext, TurnDecision,
};
