//! Transaction inclusion loop.

use shared_types::{EventPayload, Rules, Timestamp, ValidatorId, TX_GAS};
use ts_02_event_check::check_txs;

use super::ordering::TxsByPriceAndNonce;
use super::originated::OriginatedTxs;
use super::turn::{tx_turn_originator, TurnContext};
use crate::ports::TxPool;

/// Why candidates were left out, per reason.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AddTxsReport {
    /// Transactions included
    pub added: u64,
    /// Failed the epoch's transaction rules
    pub skipped_epoch_rules: u64,
    /// Did not fit the gas ceiling
    pub skipped_no_validator_gas: u64,
    /// Sender already has an unconfirmed transaction
    pub skipped_conflicting_sender: u64,
    /// Another validator's turn
    pub skipped_not_my_turn: u64,
    /// Left the pool meanwhile
    pub skipped_outdated: u64,
    /// Offline validators passed over during turn checks
    pub skipped_offline_validators: u64,
}

/// Everything the loop reads besides the event and the candidates.
pub struct AddTxsContext<'a> {
    /// Local validator
    pub me: ValidatorId,
    /// Wall-clock time of the turn check
    pub now: Timestamp,
    /// Rules of the event's epoch
    pub rules: &'a Rules,
    /// Turn rotation inputs
    pub turn: TurnContext<'a>,
    /// Unconfirmed senders
    pub originated: &'a OriginatedTxs,
    /// Pool to detect stale candidates
    pub pool: &'a dyn TxPool,
    /// Total gas power the event may use, transactions included
    pub max_gas_used: u64,
}

/// Append eligible transactions to `e`, deducting their gas from the
/// event's gas power.
pub fn add_txs(
    e: &mut EventPayload,
    sorted: &mut TxsByPriceAndNonce,
    ctx: &AddTxsContext<'_>,
) -> AddTxsReport {
    let mut report = AddTxsReport::default();
    if ctx.max_gas_used <= e.gas_power_used {
        return report;
    }

    while let Some(tx) = sorted.peek() {
        if check_txs(std::slice::from_ref(tx), ctx.rules).is_err() {
            report.skipped_epoch_rules += 1;
            sorted.pop();
            continue;
        }

        let left = e.gas_power_left.min();
        if tx.gas >= left || e.gas_power_used.saturating_add(tx.gas) >= ctx.max_gas_used {
            report.skipped_no_validator_gas += 1;
            if TX_GAS >= left || e.gas_power_used.saturating_add(TX_GAS) >= ctx.max_gas_used {
                break;
            }
            sorted.pop();
            continue;
        }

        if ctx.originated.total_of(&tx.sender) != 0 {
            report.skipped_conflicting_sender += 1;
            sorted.pop();
            continue;
        }

        let decision = tx_turn_originator(&tx.hash, &tx.sender, tx.nonce, ctx.now, &ctx.turn);
        report.skipped_offline_validators += decision.skipped_offline() as u64;
        if !decision.is(ctx.me) {
            report.skipped_not_my_turn += 1;
            sorted.pop();
            continue;
        }

        if !ctx.pool.has(&tx.hash) {
            report.skipped_outdated += 1;
            sorted.pop();
            continue;
        }

        e.gas_power_used += tx.gas;
        e.gas_power_left = e.gas_power_left.saturating_sub(tx.gas);
        e.txs.push(tx.clone());
        report.added += 1;
        sorted.shift();
    }
    report
}
