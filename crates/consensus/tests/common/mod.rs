#![allow(dead_code)]

pub mod mocks;

use std::{
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};

use alloy_primitives::{B256, U256};
use zkscam_consensus::{collector::VoteCollector, engine::Engine};
use zkscam_crypto::{bls, IdentityVault};
use zkscam_types::{
    config::ChainSpec,
    constants::{EMPTY_UNCLE_HASH, EXTRA_SEAL, EXTRA_VANITY, NONCE_DROP_VOTE},
    header::Header,
    vote::Vote,
};

use mocks::{MockChain, MockStakeOracle, RecordingVoteSink};

pub fn unix_now() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_secs()
}

pub fn vault(tag: u8) -> Arc<IdentityVault> {
    let vault = IdentityVault::new();
    vault.load_from_key_bytes(&[tag; 32]).expect("test key loads");
    Arc::new(vault)
}

pub fn test_spec() -> ChainSpec {
    ChainSpec { period: 1, ..Default::default() }
}

/// Genesis header anchored far enough in the past that children never trip
/// the future-block check.
pub fn genesis() -> Header {
    Header {
        number: 0,
        uncle_hash: EMPTY_UNCLE_HASH,
        nonce: NONCE_DROP_VOTE,
        gas_limit: 30_000_000,
        time: unix_now() - 1_000,
        extra: vec![0u8; EXTRA_VANITY + EXTRA_SEAL].into(),
        votes: Some(U256::ZERO),
        total_votes: Some(U256::ZERO),
        ..Default::default()
    }
}

/// Unsealed candidate on top of `parent` with the slot time already due.
pub fn candidate(parent: &Header, period: u64) -> Header {
    Header {
        parent_hash: parent.hash(),
        number: parent.number + 1,
        uncle_hash: EMPTY_UNCLE_HASH,
        nonce: NONCE_DROP_VOTE,
        difficulty: U256::from(1u64),
        gas_limit: parent.gas_limit,
        time: parent.time + period,
        extra: vec![0u8; EXTRA_VANITY + EXTRA_SEAL].into(),
        ..Default::default()
    }
}

/// Builds one witness vote for `zkscam_hash` signed by `vault`.
pub fn witness_vote(vault: &IdentityVault, number: u64, zkscam_hash: B256) -> Vote {
    let bls_public_key = vault.bls_public_key_bytes().unwrap();
    Vote {
        number,
        miner_address: vault.eth_address().unwrap(),
        zkscam_hash,
        signature: vault.sign_hash(zkscam_hash).unwrap(),
        auth_bls_signature: vault.sign_arbitrary(&bls_public_key).unwrap(),
        bls_public_key,
        bls_signature: vault.bls_sign(zkscam_hash).unwrap(),
    }
}

/// Fills the witness fields of `header` with signatures from `vaults`, in
/// order, over the header's own content hash.
pub fn seal_with_witnesses(header: &mut Header, vaults: &[&IdentityVault]) {
    let zkscam_hash = header.content_hash();
    header.zkscam_hash = zkscam_hash;
    let mut bls_signatures = Vec::with_capacity(vaults.len());
    for vault in vaults {
        let bls_public_key = vault.bls_public_key_bytes().unwrap();
        header.miner_addresses.push(vault.eth_address().unwrap());
        header.signatures.push(vault.sign_hash(zkscam_hash).unwrap());
        header.auth_bls_signatures.push(vault.sign_arbitrary(&bls_public_key).unwrap());
        header.bls_public_keys.push(bls_public_key);
        bls_signatures.push(vault.bls_sign(zkscam_hash).unwrap());
    }
    header.aggregated_signature =
        bls::aggregate_signatures(&bls_signatures).unwrap().into();
}

pub struct Harness {
    pub chain: Arc<MockChain>,
    pub oracle: Arc<MockStakeOracle>,
    pub sink: Arc<RecordingVoteSink>,
    pub collector: Arc<VoteCollector>,
    pub engine: Arc<Engine<MockChain, MockStakeOracle>>,
    pub vault: Arc<IdentityVault>,
}

/// Wires a full engine around the mocks, with `vault` as the local miner.
pub fn harness(spec: ChainSpec, vault: Arc<IdentityVault>) -> Harness {
    let chain = Arc::new(MockChain::new(spec.clone()));
    let oracle = Arc::new(MockStakeOracle::default());
    let sink = Arc::new(RecordingVoteSink::default());
    let collector = Arc::new(VoteCollector::new(
        vault.eth_address().unwrap(),
        chain.clone(),
        oracle.clone(),
        sink.clone(),
    ));
    let engine = Arc::new(Engine::new(
        spec,
        vault.clone(),
        collector.clone(),
        chain.clone(),
        oracle.clone(),
    ));
    Harness { chain, oracle, sink, collector, engine, vault }
}
