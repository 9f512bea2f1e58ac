//! Stake-token layout: where witness balances live in the account state.

use alloy_primitives::{address, keccak256, Address, B256};

/// Address of the ERC-20 stake token contract.
pub const STAKE_TOKEN_ADDRESS: Address = address!("4b75210419009994c7f856f0b5c5b79750dbed22");

/// Storage slot holding `holder`'s token balance.
///
/// The balances mapping sits at slot zero of the token contract, so the
/// per-holder slot is `keccak256(pad32(holder))`.
pub fn balance_slot(holder: Address) -> B256 {
    let mut padded = [0u8; 32];
    padded[12..].copy_from_slice(holder.as_slice());
    keccak256(padded)
}
