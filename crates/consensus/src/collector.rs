//! Per-node collection of witness votes for open block candidates.
//!
//! Every vote is validated on ingress, deduplicated on `(miner, hash)`, and
//! re-broadcast once through the network sink. The map lives only between
//! block generation and a successful seal; the sealer clears it.

use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex},
};

use alloy_primitives::{Address, Bytes, B256, U256};
use tracing::debug;
use zkscam_crypto::bls;
use zkscam_types::{
    constants::{MIN_STAKE, MINER_WAITING_BLOCKS},
    vote::{Vote, Votes},
};

use crate::{
    error::{EngineError, StakeLookupError},
    traits::{ChainHeaderReader, StakeOracle, VoteSink},
};

#[derive(Default)]
struct CollectorInner {
    votes: HashMap<B256, Vec<Vote>>,
    seen: HashSet<(Address, B256)>,
}

pub struct VoteCollector {
    inner: Mutex<CollectorInner>,
    local_address: Address,
    chain: Arc<dyn ChainHeaderReader>,
    oracle: Arc<dyn StakeOracle>,
    sink: Arc<dyn VoteSink>,
}

impl VoteCollector {
    pub fn new(
        local_address: Address,
        chain: Arc<dyn ChainHeaderReader>,
        oracle: Arc<dyn StakeOracle>,
        sink: Arc<dyn VoteSink>,
    ) -> Self {
        Self { inner: Mutex::new(CollectorInner::default()), local_address, chain, oracle, sink }
    }

    /// Validates and stores a batch of peer votes. Invalid votes are dropped
    /// without re-broadcast; punishing the sender is the network layer's
    /// business, not ours.
    pub fn ingest(&self, batch: Votes) {
        for vote in batch.votes {
            // Our own vote coming back around the gossip loop.
            if vote.miner_address == self.local_address {
                continue;
            }
            match zkscam_crypto::recover_address(&vote.zkscam_hash, &vote.signature) {
                Ok(recovered) if recovered == vote.miner_address => {}
                _ => {
                    debug!(miner = %vote.miner_address, "dropping vote: signature does not recover miner address");
                    continue;
                }
            }
            match zkscam_crypto::verify_arbitrary_with_address(
                &vote.bls_public_key,
                &vote.auth_bls_signature,
                vote.miner_address,
            ) {
                Ok(true) => {}
                _ => {
                    debug!(miner = %vote.miner_address, "dropping vote: BLS key not bound to miner address");
                    continue;
                }
            }
            match bls::verify(vote.zkscam_hash.as_slice(), &vote.bls_signature, &vote.bls_public_key)
            {
                Ok(true) => {}
                _ => {
                    debug!(miner = %vote.miner_address, "dropping vote: BLS signature invalid");
                    continue;
                }
            }
            let stake = match self.stake_at_snapshot(vote.miner_address) {
                Ok(stake) => stake,
                Err(error) => {
                    debug!(miner = %vote.miner_address, %error, "dropping vote: stake unavailable");
                    continue;
                }
            };
            if stake < U256::from(MIN_STAKE) {
                debug!(miner = %vote.miner_address, %stake, "dropping vote: stake below minimum");
                continue;
            }
            self.add(vote);
        }
    }

    /// Stores one vote and broadcasts it, unless `(miner, hash)` was already
    /// seen. The broadcast happens outside the lock; the sink only needs to
    /// be non-blocking.
    pub fn add(&self, vote: Vote) {
        {
            let mut inner = self.inner.lock().expect("vote collector lock poisoned");
            if !inner.seen.insert((vote.miner_address, vote.zkscam_hash)) {
                return;
            }
            inner.votes.entry(vote.zkscam_hash).or_default().push(vote.clone());
        }
        self.sink.broadcast_votes(Votes::single(vote));
    }

    /// The candidate hash with the highest eligible stake behind it, if any
    /// votes were collected at all.
    pub fn determine_winner(&self) -> Result<Option<B256>, StakeLookupError> {
        let inner = self.inner.lock().expect("vote collector lock poisoned");
        let mut max_votes = U256::ZERO;
        let mut winner = None;
        for (hash, votes) in &inner.votes {
            let mut total = U256::ZERO;
            for vote in votes {
                let stake = self.stake_at_snapshot(vote.miner_address)?;
                if stake >= U256::from(MIN_STAKE) {
                    total += stake;
                }
            }
            if total > max_votes {
                max_votes = total;
                winner = Some(*hash);
            }
        }
        Ok(winner)
    }

    /// Votes for `hash` in insertion order, the order the sealed header's
    /// witness lists will carry.
    pub fn votes_for(&self, hash: &B256) -> Vec<Vote> {
        let inner = self.inner.lock().expect("vote collector lock poisoned");
        inner.votes.get(hash).cloned().unwrap_or_default()
    }

    /// Aggregates the BLS signatures of all votes for `hash`, in the same
    /// insertion order as [`Self::votes_for`].
    pub fn aggregate_signatures_for(&self, hash: &B256) -> Result<Bytes, EngineError> {
        let inner = self.inner.lock().expect("vote collector lock poisoned");
        let votes = inner.votes.get(hash).ok_or(EngineError::NoVotes)?;
        let signatures: Vec<&[u8]> = votes.iter().map(|v| v.bls_signature.as_ref()).collect();
        Ok(Bytes::from(bls::aggregate_signatures(&signatures)?))
    }

    pub fn vote_count(&self, hash: &B256) -> usize {
        let inner = self.inner.lock().expect("vote collector lock poisoned");
        inner.votes.get(hash).map_or(0, Vec::len)
    }

    /// Empties the vote map and the dedup set. Called once per successful
    /// seal.
    pub fn clear(&self) {
        let mut inner = self.inner.lock().expect("vote collector lock poisoned");
        inner.votes.clear();
        inner.seen.clear();
    }

    fn stake_at_snapshot(&self, miner: Address) -> Result<U256, StakeLookupError> {
        let head = self.chain.current_header().map(|h| h.number).unwrap_or_default();
        self.oracle.balance_of_at(miner, head.saturating_sub(MINER_WAITING_BLOCKS))
    }
}
