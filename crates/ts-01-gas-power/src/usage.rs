//! Gas power charged for an event.

use shared_types::{EventPayload, Rules};

/// Gas power an event consumes: base event gas, every transaction's gas
/// limit, parents beyond the free ones, and extra data bytes.
pub fn calc_gas_power_used(e: &EventPayload, rules: &Rules) -> u64 {
    let gas = &rules.economy.gas;

    let txs_gas = e.txs.iter().fold(0u64, |acc, tx| acc.saturating_add(tx.gas));

    let parents = e.parents.len() as u64;
    let free = u64::from(rules.dag.max_free_parents);
    let parents_gas = parents.saturating_sub(free).saturating_mul(gas.parent_gas);

    let extra_gas = (e.extra.len() as u64).saturating_mul(gas.extra_data_gas);

    gas.event_gas
        .saturating_add(txs_gas)
        .saturating_add(parents_gas)
        .saturating_add(extra_gas)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::{Transaction, U256};

    #[test]
    fn test_used_sums_all_components() {
        let rules = Rules::default();
        let tx = Transaction::new([1; 20], Some([2; 20]), 0, 50_000, U256::one(), vec![]);
        let e = EventPayload {
            parents: vec![[0u8; 32]; 5],
            extra: vec![0u8; 4],
            txs: vec![tx.clone(), tx],
            ..EventPayload::default()
        };
        let gas = &rules.economy.gas;
        let expected = gas.event_gas + 100_000 + 2 * gas.parent_gas + 4 * gas.extra_data_gas;
        assert_eq!(calc_gas_power_used(&e, &rules), expected);
    }

    #[test]
    fn test_free_parents_cost_nothing() {
        let rules = Rules::default();
        let e = EventPayload {
            parents: vec![[0u8; 32]; 3],
            ..EventPayload::default()
        };
        assert_eq!(calc_gas_power_used(&e, &rules), rules.economy.gas.event_gas);
    }
}
