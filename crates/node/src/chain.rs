//! In-memory chain backends for dev runs and tests: a header store, a
//! genesis-backed state reader, and a channel-based vote sink.

use std::{
    collections::HashMap,
    sync::RwLock,
};

use alloy_genesis::Genesis;
use alloy_primitives::{Address, B256, B64, U256};
use tokio::sync::mpsc;
use tracing::warn;
use zkscam_consensus::traits::{ChainHeaderReader, StateReader, VoteSink};
use zkscam_types::{
    config::ChainSpec,
    constants::EMPTY_UNCLE_HASH,
    header::Header,
    vote::Votes,
};

/// Header chain held entirely in memory, indexed by identity hash.
pub struct MemoryChain {
    spec: ChainSpec,
    headers: RwLock<HashMap<B256, Header>>,
    head: RwLock<Option<Header>>,
}

impl MemoryChain {
    pub fn new(spec: ChainSpec) -> Self {
        Self { spec, headers: RwLock::new(HashMap::new()), head: RwLock::new(None) }
    }

    /// Inserts a header and advances the head to it.
    pub fn insert(&self, header: Header) {
        self.headers.write().expect("chain lock poisoned").insert(header.hash(), header.clone());
        *self.head.write().expect("chain lock poisoned") = Some(header);
    }
}

impl ChainHeaderReader for MemoryChain {
    fn get_header(&self, hash: B256, _number: u64) -> Option<Header> {
        self.headers.read().expect("chain lock poisoned").get(&hash).cloned()
    }

    fn chain_spec(&self) -> &ChainSpec {
        &self.spec
    }

    fn current_header(&self) -> Option<Header> {
        self.head.read().expect("chain lock poisoned").clone()
    }
}

/// Consensus view of a genesis file's header fields.
pub fn genesis_header(genesis: &Genesis) -> Header {
    Header {
        number: genesis.number.unwrap_or_default(),
        parent_hash: genesis.parent_hash.unwrap_or_default(),
        uncle_hash: EMPTY_UNCLE_HASH,
        coinbase: genesis.coinbase,
        difficulty: genesis.difficulty,
        gas_limit: genesis.gas_limit,
        time: genesis.timestamp,
        extra: genesis.extra_data.clone(),
        mix_digest: genesis.mix_hash,
        nonce: B64::from(genesis.nonce.to_be_bytes()),
        base_fee: genesis.base_fee_per_gas.map(U256::from),
        votes: Some(U256::ZERO),
        total_votes: Some(U256::ZERO),
        ..Default::default()
    }
}

/// State reader answering storage queries out of a genesis allocation.
///
/// Dev networks run without an execution layer, so stake balances stay at
/// their genesis values at every height.
pub struct GenesisState {
    storage: HashMap<Address, HashMap<B256, U256>>,
}

impl GenesisState {
    pub fn new(genesis: &Genesis) -> Self {
        let mut storage = HashMap::new();
        for (address, account) in &genesis.alloc {
            if let Some(slots) = &account.storage {
                let slots = slots
                    .iter()
                    .map(|(slot, value)| (*slot, U256::from_be_bytes(value.0)))
                    .collect();
                storage.insert(*address, slots);
            }
        }
        Self { storage }
    }
}

impl StateReader for GenesisState {
    fn storage_at(&self, contract: Address, slot: B256, _number: Option<u64>) -> Option<U256> {
        let value = self
            .storage
            .get(&contract)
            .and_then(|slots| slots.get(&slot))
            .copied()
            .unwrap_or(U256::ZERO);
        Some(value)
    }
}

/// Vote sink forwarding broadcast batches to the network task over a
/// channel. `try_send` keeps it non-blocking as the collector requires.
pub struct ChannelVoteSink {
    tx: mpsc::Sender<Votes>,
}

impl ChannelVoteSink {
    pub fn new(tx: mpsc::Sender<Votes>) -> Self {
        Self { tx }
    }
}

impl VoteSink for ChannelVoteSink {
    fn broadcast_votes(&self, votes: Votes) {
        if self.tx.try_send(votes).is_err() {
            warn!("vote broadcast queue full, dropping batch");
        }
    }
}
