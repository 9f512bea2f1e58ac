//! Interfaces to the engine's external collaborators: the header chain, the
//! account state, the stake token, and the vote network.

use alloy_primitives::{Address, B256, U256};
use zkscam_types::{
    config::ChainSpec,
    header::Header,
    stake::{balance_slot, STAKE_TOKEN_ADDRESS},
    vote::Votes,
};

use crate::error::StakeLookupError;

/// Read access to the local header chain during verification.
pub trait ChainHeaderReader: Send + Sync {
    fn get_header(&self, hash: B256, number: u64) -> Option<Header>;
    fn chain_spec(&self) -> &ChainSpec;
    fn current_header(&self) -> Option<Header>;
}

/// Witness stake queries. `balance_of_at` at height `N - 10` is the
/// canonical eligibility question; `balance_of` answers at the latest state.
pub trait StakeOracle: Send + Sync {
    fn balance_of_at(&self, address: Address, number: u64) -> Result<U256, StakeLookupError>;
    fn balance_of(&self, address: Address) -> Result<U256, StakeLookupError>;
}

/// Mutable account state during block finalization.
pub trait StateDb {
    fn add_balance(&mut self, address: Address, amount: U256);
    fn intermediate_root(&mut self, eip158: bool) -> B256;
}

/// Raw contract-storage reads backing [`Erc20StakeOracle`].
pub trait StateReader: Send + Sync {
    /// Storage word of `contract` at `slot`; `number` of `None` means the
    /// latest state.
    fn storage_at(&self, contract: Address, slot: B256, number: Option<u64>) -> Option<U256>;
}

/// Outbound vote broadcast. Implementations must not block: the collector
/// may call this while servicing network ingress.
pub trait VoteSink: Send + Sync {
    fn broadcast_votes(&self, votes: Votes);
}

/// Stake oracle reading the token's balances mapping straight out of
/// contract storage.
pub struct Erc20StakeOracle<R> {
    reader: R,
    token: Address,
}

impl<R: StateReader> Erc20StakeOracle<R> {
    pub fn new(reader: R) -> Self {
        Self { reader, token: STAKE_TOKEN_ADDRESS }
    }

    pub fn with_token(reader: R, token: Address) -> Self {
        Self { reader, token }
    }

    fn read(&self, address: Address, number: Option<u64>) -> Result<U256, StakeLookupError> {
        self.reader
            .storage_at(self.token, balance_slot(address), number)
            .ok_or(StakeLookupError { address, number: number.unwrap_or(u64::MAX) })
    }
}

impl<R: StateReader> StakeOracle for Erc20StakeOracle<R> {
    fn balance_of_at(&self, address: Address, number: u64) -> Result<U256, StakeLookupError> {
        self.read(address, Some(number))
    }

    fn balance_of(&self, address: Address) -> Result<U256, StakeLookupError> {
        self.read(address, None)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    struct FlatState(HashMap<B256, U256>);

    impl StateReader for FlatState {
        fn storage_at(&self, contract: Address, slot: B256, _number: Option<u64>) -> Option<U256> {
            (contract == STAKE_TOKEN_ADDRESS).then(|| self.0.get(&slot).copied().unwrap_or(U256::ZERO))
        }
    }

    #[test]
    fn oracle_reads_the_balance_slot() {
        let holder = Address::repeat_byte(0x01);
        let mut slots = HashMap::new();
        slots.insert(balance_slot(holder), U256::from(250_000u64));

        let oracle = Erc20StakeOracle::new(FlatState(slots));
        assert_eq!(oracle.balance_of_at(holder, 5).unwrap(), U256::from(250_000u64));
        assert_eq!(oracle.balance_of(Address::repeat_byte(0x02)).unwrap(), U256::ZERO);
    }
}
