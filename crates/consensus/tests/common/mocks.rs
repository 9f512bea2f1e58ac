//! Test doubles for the engine's external collaborators.
//!
//! These mocks let the harness exercise verification and sealing without a
//! real chain database, state backend, or network stack.

use std::{
    collections::HashMap,
    sync::{Mutex, RwLock},
};

use alloy_primitives::{Address, B256, U256};
use zkscam_consensus::{
    error::StakeLookupError,
    traits::{ChainHeaderReader, StakeOracle, StateDb, VoteSink},
};
use zkscam_types::{config::ChainSpec, header::Header, vote::Votes};

/// In-memory header chain keyed by identity hash.
pub struct MockChain {
    spec: ChainSpec,
    headers: RwLock<HashMap<B256, Header>>,
    head: RwLock<Option<Header>>,
}

impl MockChain {
    pub fn new(spec: ChainSpec) -> Self {
        Self { spec, headers: RwLock::new(HashMap::new()), head: RwLock::new(None) }
    }

    /// Inserts a header and makes it the current head.
    pub fn insert(&self, header: Header) {
        self.headers.write().unwrap().insert(header.hash(), header.clone());
        *self.head.write().unwrap() = Some(header);
    }
}

impl ChainHeaderReader for MockChain {
    fn get_header(&self, hash: B256, _number: u64) -> Option<Header> {
        self.headers.read().unwrap().get(&hash).cloned()
    }

    fn chain_spec(&self) -> &ChainSpec {
        &self.spec
    }

    fn current_header(&self) -> Option<Header> {
        self.head.read().unwrap().clone()
    }
}

/// Stake oracle with separately configurable snapshot and latest balances.
#[derive(Default)]
pub struct MockStakeOracle {
    snapshot: RwLock<HashMap<Address, U256>>,
    current: RwLock<HashMap<Address, U256>>,
}

impl MockStakeOracle {
    /// Sets both the snapshot and the latest balance.
    pub fn set_stake(&self, address: Address, amount: u64) {
        self.snapshot.write().unwrap().insert(address, U256::from(amount));
        self.current.write().unwrap().insert(address, U256::from(amount));
    }

    pub fn set_snapshot_stake(&self, address: Address, amount: u64) {
        self.snapshot.write().unwrap().insert(address, U256::from(amount));
    }

    pub fn set_current_stake(&self, address: Address, amount: u64) {
        self.current.write().unwrap().insert(address, U256::from(amount));
    }
}

impl StakeOracle for MockStakeOracle {
    fn balance_of_at(&self, address: Address, _number: u64) -> Result<U256, StakeLookupError> {
        Ok(self.snapshot.read().unwrap().get(&address).copied().unwrap_or(U256::ZERO))
    }

    fn balance_of(&self, address: Address) -> Result<U256, StakeLookupError> {
        let current = self.current.read().unwrap().get(&address).copied();
        match current {
            Some(balance) => Ok(balance),
            None => self.balance_of_at(address, 0),
        }
    }
}

/// Records every broadcast batch for assertions.
#[derive(Default)]
pub struct RecordingVoteSink {
    sent: Mutex<Vec<Votes>>,
}

impl RecordingVoteSink {
    pub fn sent(&self) -> Vec<Votes> {
        self.sent.lock().unwrap().clone()
    }
}

impl VoteSink for RecordingVoteSink {
    fn broadcast_votes(&self, votes: Votes) {
        self.sent.lock().unwrap().push(votes);
    }
}

/// State double that records balance credits.
#[derive(Default)]
pub struct MockStateDb {
    pub credits: HashMap<Address, U256>,
}

impl StateDb for MockStateDb {
    fn add_balance(&mut self, address: Address, amount: U256) {
        *self.credits.entry(address).or_default() += amount;
    }

    fn intermediate_root(&mut self, _eip158: bool) -> B256 {
        B256::repeat_byte(0x5a)
    }
}
