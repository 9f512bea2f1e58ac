#![forbid(unsafe_code)]
#![deny(trivial_casts, trivial_numeric_casts)]
#![allow(missing_docs)]

//! Genesis construction for dev and test networks.
//!
//! Besides funding the dev accounts with gas money, the builder seeds the
//! stake-token contract's storage so every dev signer starts with enough
//! stake to witness blocks.

use std::{collections::BTreeMap, str::FromStr};

use alloy_genesis::{ChainConfig, CliqueConfig, Genesis, GenesisAccount};
use alloy_primitives::{Address, Bytes, B256, U256};
use alloy_signer_local::{coins_bip39::English, MnemonicBuilder, PrivateKeySigner};
use color_eyre::eyre::Result;
use zkscam_types::{
    config::ChainSpec,
    constants::{EXTRA_SEAL, EXTRA_VANITY},
    stake::{balance_slot, STAKE_TOKEN_ADDRESS},
};

/// Test mnemonics for wallet generation.
///
/// This is intended for dev/testnet genesis generation workflows.
const TEST_MNEMONICS: [&str; 3] = [
    "test test test test test test test test test test test junk",
    "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about",
    "zero zero zero zero zero zero zero zero zero zero zero zoo",
];

/// Stake granted to each dev signer, comfortably above the witness minimum.
const DEV_STAKE: u64 = 1_000_000;

pub fn make_signer(mnemonic: &str) -> PrivateKeySigner {
    MnemonicBuilder::<English>::default().phrase(mnemonic).build().expect("failed to create wallet")
}

pub fn make_signers() -> Vec<PrivateKeySigner> {
    TEST_MNEMONICS.iter().map(|&mnemonic| make_signer(mnemonic)).collect()
}

/// Dev genesis: funded signers, staked signers, engine config from `spec`.
pub fn build_dev_genesis(spec: &ChainSpec) -> Result<Genesis> {
    let signers = make_signers();
    let signer_addresses: Vec<Address> = signers.iter().map(|signer| signer.address()).collect();

    let mut alloc = BTreeMap::new();
    for addr in &signer_addresses {
        alloc.insert(
            *addr,
            GenesisAccount {
                balance: U256::from_str("15000000000000000000000").unwrap(), // 15000 ETH
                ..Default::default()
            },
        );
    }
    alloc.insert(STAKE_TOKEN_ADDRESS, stake_token_account(&signer_addresses));

    build_genesis_from_alloc(spec, alloc)
}

pub fn build_genesis(spec: &ChainSpec, alloc: BTreeMap<Address, GenesisAccount>) -> Result<Genesis> {
    build_genesis_from_alloc(spec, alloc)
}

/// The stake-token contract account with one balance slot per holder.
pub fn stake_token_account(holders: &[Address]) -> GenesisAccount {
    let mut storage = BTreeMap::new();
    for holder in holders {
        storage.insert(balance_slot(*holder), B256::from(U256::from(DEV_STAKE)));
    }
    GenesisAccount { storage: Some(storage), ..Default::default() }
}

fn build_genesis_from_alloc(
    spec: &ChainSpec,
    alloc: BTreeMap<Address, GenesisAccount>,
) -> Result<Genesis> {
    let genesis = Genesis {
        config: ChainConfig {
            chain_id: spec.chain_id,
            homestead_block: Some(0),
            eip150_block: Some(0),
            eip155_block: Some(0),
            eip158_block: Some(0),
            byzantium_block: Some(0),
            constantinople_block: Some(0),
            petersburg_block: Some(0),
            istanbul_block: Some(0),
            berlin_block: Some(0),
            london_block: spec.london_block,
            // Shanghai and Cancun stay unscheduled: the engine rejects
            // headers from chains that activate them.
            clique: Some(CliqueConfig { period: Some(spec.period), epoch: Some(spec.epoch) }),
            ..Default::default()
        },
        alloc,
        ..Default::default()
    }
    .with_gas_limit(30_000_000)
    .with_timestamp(
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("Time went backwards")
            .as_secs(),
    )
    .with_extra_data(Bytes::from(vec![0u8; EXTRA_VANITY + EXTRA_SEAL]))
    .with_difficulty(U256::from(1))
    .with_mix_hash(B256::ZERO)
    .with_coinbase(Address::ZERO)
    .with_base_fee(Some(7));

    let mut genesis = genesis;
    genesis.parent_hash = Some(B256::ZERO);
    genesis.number = Some(0);

    Ok(genesis)
}

pub fn write_genesis(path: &std::path::Path, genesis: &Genesis) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let genesis_json = serde_json::to_string_pretty(genesis)?;
    std::fs::write(path, genesis_json)?;
    Ok(())
}

pub fn read_genesis(path: &std::path::Path) -> Result<Genesis> {
    let data = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&data)?)
}
