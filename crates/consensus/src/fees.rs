//! Gas-fee distribution: 80% to the parent block's witnesses in proportion
//! to their stake, 20% to the fixed buyback address.

use alloy_consensus::Transaction;
use alloy_primitives::{Address, U256};
use tracing::{error, info};
use zkscam_types::{
    aliases::TxEnvelope,
    block::Receipt,
    constants::{FEE_BUYBACK_ADDRESS, MINER_WAITING_BLOCKS, MIN_STAKE},
    header::Header,
};

use crate::traits::{StakeOracle, StateDb};

/// Splits the gas fees earned by `parent`'s transactions.
///
/// All arithmetic is integer; the remainder of each witness's division
/// accrues to no one. Witnesses whose stake at the snapshot height fell
/// below the minimum are excluded from the distribution.
pub fn distribute_gas_fees<O>(
    oracle: &O,
    parent: &Header,
    state: &mut dyn StateDb,
    txs: &[TxEnvelope],
    receipts: &[Receipt],
    local_address: Option<Address>,
) where
    O: StakeOracle + ?Sized,
{
    let base_fee = parent.base_fee.map(|fee| fee.to::<u64>());
    let mut total_fees = U256::ZERO;
    for (tx, receipt) in txs.iter().zip(receipts) {
        let effective_gas_price = tx.effective_gas_price(base_fee);
        total_fees += U256::from(receipt.gas_used) * U256::from(effective_gas_price);
    }
    if total_fees.is_zero() {
        return;
    }

    let eighty_percent = total_fees * U256::from(80) / U256::from(100);
    let twenty_percent = total_fees - eighty_percent;
    state.add_balance(FEE_BUYBACK_ADDRESS, twenty_percent);

    let snapshot = parent.number.saturating_sub(MINER_WAITING_BLOCKS);
    let mut stakes = Vec::with_capacity(parent.miner_addresses.len());
    let mut total_stake = U256::ZERO;
    for miner in &parent.miner_addresses {
        let stake = match oracle.balance_of_at(*miner, snapshot) {
            Ok(stake) => stake,
            Err(lookup) => {
                error!(miner = %miner, %lookup, "failed to fetch witness stake");
                continue;
            }
        };
        if stake < U256::from(MIN_STAKE) {
            continue;
        }
        stakes.push((*miner, stake));
        total_stake += stake;
    }
    if total_stake.is_zero() {
        error!("total witness stake is zero, gas fees not distributed");
        return;
    }

    for (miner, stake) in stakes {
        let share = eighty_percent * stake / total_stake;
        if Some(miner) == local_address {
            info!(miner = %miner, reward = %share, "local node earned gas fee share");
        }
        state.add_balance(miner, share);
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use alloy_consensus::{Signed, TxLegacy};
    use alloy_primitives::{Signature, TxKind, B256};
    use zkscam_types::constants::{EXTRA_SEAL, EXTRA_VANITY};

    use super::*;
    use crate::error::StakeLookupError;

    struct FixedStakes(HashMap<Address, U256>);

    impl StakeOracle for FixedStakes {
        fn balance_of_at(&self, address: Address, _number: u64) -> Result<U256, StakeLookupError> {
            Ok(self.0.get(&address).copied().unwrap_or(U256::ZERO))
        }

        fn balance_of(&self, address: Address) -> Result<U256, StakeLookupError> {
            self.balance_of_at(address, 0)
        }
    }

    #[derive(Default)]
    struct RecordingState {
        credits: HashMap<Address, U256>,
    }

    impl StateDb for RecordingState {
        fn add_balance(&mut self, address: Address, amount: U256) {
            *self.credits.entry(address).or_default() += amount;
        }

        fn intermediate_root(&mut self, _eip158: bool) -> B256 {
            B256::ZERO
        }
    }

    fn legacy_tx(gas_price: u128) -> TxEnvelope {
        let tx = TxLegacy {
            chain_id: Some(1),
            nonce: 0,
            gas_price,
            gas_limit: 100_000,
            to: TxKind::Call(Address::ZERO),
            value: U256::ZERO,
            input: Default::default(),
        };
        let signature = Signature::new(U256::from(1), U256::from(1), false);
        TxEnvelope::Legacy(Signed::new_unchecked(tx, signature, B256::ZERO))
    }

    fn parent_with_witnesses(witnesses: Vec<Address>) -> Header {
        Header {
            number: 20,
            miner_addresses: witnesses,
            extra: vec![0u8; EXTRA_VANITY + EXTRA_SEAL].into(),
            ..Default::default()
        }
    }

    #[test]
    fn splits_fees_eighty_twenty_by_stake() {
        let rich = Address::repeat_byte(0x01);
        let poor = Address::repeat_byte(0x02);
        let oracle = FixedStakes(HashMap::from([
            (rich, U256::from(300_000u64)),
            (poor, U256::from(100_000u64)),
        ]));
        let parent = parent_with_witnesses(vec![rich, poor]);
        let mut state = RecordingState::default();

        // One legacy transaction: 50_000 gas at price 2 => 100_000 total.
        let txs = vec![legacy_tx(2)];
        let receipts = vec![Receipt { tx_hash: B256::ZERO, gas_used: 50_000 }];
        distribute_gas_fees(&oracle, &parent, &mut state, &txs, &receipts, None);

        assert_eq!(state.credits[&FEE_BUYBACK_ADDRESS], U256::from(20_000u64));
        // 80_000 split 3:1.
        assert_eq!(state.credits[&rich], U256::from(60_000u64));
        assert_eq!(state.credits[&poor], U256::from(20_000u64));
    }

    #[test]
    fn sub_threshold_witness_is_excluded() {
        let eligible = Address::repeat_byte(0x01);
        let ineligible = Address::repeat_byte(0x02);
        let oracle = FixedStakes(HashMap::from([
            (eligible, U256::from(200_000u64)),
            (ineligible, U256::from(99_999u64)),
        ]));
        let parent = parent_with_witnesses(vec![eligible, ineligible]);
        let mut state = RecordingState::default();

        let txs = vec![legacy_tx(1)];
        let receipts = vec![Receipt { tx_hash: B256::ZERO, gas_used: 100_000 }];
        distribute_gas_fees(&oracle, &parent, &mut state, &txs, &receipts, None);

        assert_eq!(state.credits[&eligible], U256::from(80_000u64));
        assert!(!state.credits.contains_key(&ineligible));
    }

    #[test]
    fn division_dust_accrues_to_no_one() {
        let a = Address::repeat_byte(0x01);
        let b = Address::repeat_byte(0x02);
        let c = Address::repeat_byte(0x03);
        let oracle = FixedStakes(HashMap::from([
            (a, U256::from(100_000u64)),
            (b, U256::from(100_000u64)),
            (c, U256::from(100_000u64)),
        ]));
        let parent = parent_with_witnesses(vec![a, b, c]);
        let mut state = RecordingState::default();

        // 100 total fees: 20 buyback, 80 split three ways -> 26 each, 2 dust.
        let txs = vec![legacy_tx(1)];
        let receipts = vec![Receipt { tx_hash: B256::ZERO, gas_used: 100 }];
        distribute_gas_fees(&oracle, &parent, &mut state, &txs, &receipts, None);

        assert_eq!(state.credits[&FEE_BUYBACK_ADDRESS], U256::from(20u64));
        for miner in [a, b, c] {
            assert_eq!(state.credits[&miner], U256::from(26u64));
        }
        let distributed: U256 = state.credits.values().copied().sum();
        assert_eq!(distributed, U256::from(98u64));
    }

    #[test]
    fn zero_fee_block_distributes_nothing() {
        let oracle = FixedStakes(HashMap::new());
        let parent = parent_with_witnesses(vec![Address::repeat_byte(0x01)]);
        let mut state = RecordingState::default();
        distribute_gas_fees(&oracle, &parent, &mut state, &[], &[], None);
        assert!(state.credits.is_empty());
    }

    #[test]
    fn eip1559_effective_price_is_capped_by_fee_cap() {
        use alloy_consensus::TxEip1559;

        let witness = Address::repeat_byte(0x01);
        let oracle = FixedStakes(HashMap::from([(witness, U256::from(100_000u64))]));
        let parent = Header {
            base_fee: Some(U256::from(10u64)),
            ..parent_with_witnesses(vec![witness])
        };
        let mut state = RecordingState::default();

        // fee cap 12 < base fee 10 + tip 5 => effective price 12.
        let tx = TxEip1559 {
            chain_id: 1,
            nonce: 0,
            gas_limit: 100_000,
            max_fee_per_gas: 12,
            max_priority_fee_per_gas: 5,
            to: TxKind::Call(Address::ZERO),
            value: U256::ZERO,
            access_list: Default::default(),
            input: Default::default(),
        };
        let signature = Signature::new(U256::from(1), U256::from(1), false);
        let txs = vec![TxEnvelope::Eip1559(Signed::new_unchecked(tx, signature, B256::ZERO))];
        let receipts = vec![Receipt { tx_hash: B256::ZERO, gas_used: 1_000 }];
        distribute_gas_fees(&oracle, &parent, &mut state, &txs, &receipts, None);

        // total = 12_000; buyback 2_400; witness takes the rest.
        assert_eq!(state.credits[&FEE_BUYBACK_ADDRESS], U256::from(2_400u64));
        assert_eq!(state.credits[&witness], U256::from(9_600u64));
    }
}
