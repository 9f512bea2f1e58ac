//! Finalization: fee distribution wiring and the withdrawals rejection.

mod common;

use alloy_consensus::{Signed, TxLegacy};
use alloy_primitives::{Address, Signature, TxKind, B256, U256};
use common::{candidate, genesis, harness, mocks::MockStateDb, test_spec, vault};
use zkscam_consensus::EngineError;
use zkscam_types::{
    aliases::TxEnvelope,
    block::Receipt,
    constants::FEE_BUYBACK_ADDRESS,
};

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

#[test]
fn finalize_distributes_parent_fees_to_its_witnesses() {
    let miner = vault(0x61);
    let witness = vault(0x62).eth_address().unwrap();
    let h = harness(test_spec(), miner);
    h.oracle.set_stake(witness, 200_000);

    let mut parent = genesis();
    parent.miner_addresses = vec![witness];
    h.chain.insert(parent.clone());

    let header = candidate(&parent, 1);
    let txs = vec![legacy_tx(2)];
    let receipts = vec![Receipt { tx_hash: B256::ZERO, gas_used: 50_000 }];
    let mut state = MockStateDb::default();

    h.engine.finalize(&header, &mut state, &txs, &receipts);

    assert_eq!(state.credits[&FEE_BUYBACK_ADDRESS], U256::from(20_000u64));
    assert_eq!(state.credits[&witness], U256::from(80_000u64));
}

#[test]
fn assemble_assigns_the_intermediate_state_root() {
    let miner = vault(0x63);
    let h = harness(test_spec(), miner);
    let parent = genesis();
    h.chain.insert(parent.clone());

    let header = candidate(&parent, 1);
    let mut state = MockStateDb::default();
    let block = h
        .engine
        .finalize_and_assemble(header, &mut state, Vec::new(), &[], false)
        .expect("assembly succeeds");
    assert_eq!(block.header.state_root, B256::repeat_byte(0x5a));
}

#[test]
fn withdrawals_are_rejected_at_assembly() {
    let miner = vault(0x64);
    let h = harness(test_spec(), miner);
    let parent = genesis();
    h.chain.insert(parent.clone());

    let header = candidate(&parent, 1);
    let mut state = MockStateDb::default();
    let err = h
        .engine
        .finalize_and_assemble(header, &mut state, Vec::new(), &[], true)
        .unwrap_err();
    assert!(matches!(err, EngineError::WithdrawalsNotSupported), "unexpected error: {err}");
}
