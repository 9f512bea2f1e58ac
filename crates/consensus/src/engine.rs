//! The block-verification and sealing state machine.
//!
//! Verification enforces every structural header rule, then walks the
//! witness set in index order so the first violation is the one reported.
//! Sealing publishes the local vote, sleeps until the slot time, and folds
//! the collected votes into the header.

use std::{
    collections::HashMap,
    num::NonZeroUsize,
    sync::{Arc, RwLock},
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use alloy_primitives::{Address, B256, U256};
use lru::LruCache;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};
use zkscam_crypto::{bls, IdentityVault};
use zkscam_types::{
    aliases::TxEnvelope,
    block::{Block, Receipt},
    config::ChainSpec,
    constants::{
        DIFF_IN_TURN, DIFF_NO_TURN, EMPTY_UNCLE_HASH, EPOCH_LENGTH, EXTRA_SEAL, EXTRA_VANITY,
        INMEMORY_SIGNATURES, MAX_GAS_LIMIT, MINER_WAITING_BLOCKS, MIN_STAKE, NONCE_AUTH_VOTE,
        NONCE_DROP_VOTE,
    },
    header::Header,
    vote::Vote,
};

use crate::{
    collector::VoteCollector,
    error::EngineError,
    fees,
    traits::{ChainHeaderReader, StakeOracle, StateDb},
};

fn unix_now() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).expect("clock before unix epoch").as_secs()
}

pub struct Engine<C, O> {
    spec: ChainSpec,
    vault: Arc<IdentityVault>,
    collector: Arc<VoteCollector>,
    chain: Arc<C>,
    oracle: Arc<O>,
    /// Seal hash → recovered author, to amortize ecrecover across reorgs.
    signatures: RwLock<LruCache<B256, Address>>,
    /// Identity hash → header, for parents that verified recently but are
    /// not yet canonical.
    recent_headers: RwLock<HashMap<B256, Header>>,
}

impl<C, O> Engine<C, O>
where
    C: ChainHeaderReader,
    O: StakeOracle,
{
    pub fn new(
        spec: ChainSpec,
        vault: Arc<IdentityVault>,
        collector: Arc<VoteCollector>,
        chain: Arc<C>,
        oracle: Arc<O>,
    ) -> Self {
        let mut spec = spec;
        if spec.epoch == 0 {
            spec.epoch = EPOCH_LENGTH;
        }
        let capacity = NonZeroUsize::new(INMEMORY_SIGNATURES).expect("cache capacity is non-zero");
        Self {
            spec,
            vault,
            collector,
            chain,
            oracle,
            signatures: RwLock::new(LruCache::new(capacity)),
            recent_headers: RwLock::new(HashMap::new()),
        }
    }

    pub fn chain_spec(&self) -> &ChainSpec {
        &self.spec
    }

    /// The address that sealed `header`, recovered from the signature in the
    /// extra-data and cached under the seal hash.
    pub fn author(&self, header: &Header) -> Result<Address, EngineError> {
        if header.extra.len() < EXTRA_SEAL {
            return Err(EngineError::MissingSignature);
        }
        let seal_hash = header.seal_hash();
        {
            let mut cache = self.signatures.write().expect("signature cache poisoned");
            if let Some(author) = cache.get(&seal_hash) {
                return Ok(*author);
            }
        }
        let signature = &header.extra[header.extra.len() - EXTRA_SEAL..];
        let author = zkscam_crypto::recover_address(&seal_hash, signature)?;
        self.signatures.write().expect("signature cache poisoned").put(seal_hash, author);
        Ok(author)
    }

    /// Checks a single header against every consensus rule.
    pub fn verify_header(&self, header: &Header) -> Result<(), EngineError> {
        self.verify_header_with_parents(header, &[])
    }

    /// Batch verification; each header may use the preceding ones of the
    /// batch as parents. Results come back in input order.
    pub fn verify_headers(&self, headers: &[Header]) -> Vec<Result<(), EngineError>> {
        headers
            .iter()
            .enumerate()
            .map(|(i, header)| self.verify_header_with_parents(header, &headers[..i]))
            .collect()
    }

    fn verify_header_with_parents(
        &self,
        header: &Header,
        parents: &[Header],
    ) -> Result<(), EngineError> {
        let number = header.number;

        if header.time > unix_now() {
            return Err(EngineError::FutureBlock);
        }
        let checkpoint = number % self.spec.epoch == 0;
        if checkpoint && header.coinbase != Address::ZERO {
            return Err(EngineError::InvalidCheckpointBeneficiary);
        }
        if header.nonce != NONCE_AUTH_VOTE && header.nonce != NONCE_DROP_VOTE {
            return Err(EngineError::InvalidVoteNonce);
        }
        if checkpoint && header.nonce != NONCE_DROP_VOTE {
            return Err(EngineError::InvalidVoteNonce);
        }
        if header.extra.len() < EXTRA_VANITY {
            return Err(EngineError::MissingVanity);
        }
        if header.extra.len() < EXTRA_VANITY + EXTRA_SEAL {
            return Err(EngineError::MissingSignature);
        }
        let signers_bytes = header.extra_signers_len();
        if !checkpoint && signers_bytes != 0 {
            return Err(EngineError::ExtraSigners);
        }
        if checkpoint && signers_bytes % Address::len_bytes() != 0 {
            return Err(EngineError::InvalidCheckpointSigners);
        }
        if header.mix_digest != B256::ZERO {
            return Err(EngineError::InvalidMixDigest);
        }
        if header.uncle_hash != EMPTY_UNCLE_HASH {
            return Err(EngineError::InvalidUncleHash);
        }
        if number > 0
            && header.difficulty != U256::from(DIFF_IN_TURN)
            && header.difficulty != U256::from(DIFF_NO_TURN)
        {
            return Err(EngineError::InvalidDifficulty);
        }
        if header.gas_limit > MAX_GAS_LIMIT {
            return Err(EngineError::InvalidGasLimit { have: header.gas_limit, max: MAX_GAS_LIMIT });
        }
        if self.spec.is_shanghai(number, header.time) {
            return Err(EngineError::ShanghaiNotSupported);
        }
        if self.spec.is_cancun(number, header.time) {
            return Err(EngineError::CancunNotSupported);
        }
        // The genesis header carries no witnesses and no parent.
        if number == 0 {
            return Ok(());
        }
        self.verify_cascading_fields(header, parents)?;
        self.verify_votes_and_signatures(header)
    }

    fn verify_cascading_fields(
        &self,
        header: &Header,
        parents: &[Header],
    ) -> Result<(), EngineError> {
        let number = header.number;
        let parent = parents
            .last()
            .cloned()
            .or_else(|| self.lookup_parent(header.parent_hash, number - 1));
        let parent = parent.ok_or(EngineError::UnknownAncestor)?;
        if parent.number != number - 1 || parent.hash() != header.parent_hash {
            return Err(EngineError::UnknownAncestor);
        }
        if parent.time + self.spec.period > header.time {
            return Err(EngineError::InvalidTimestamp);
        }
        if header.gas_used > header.gas_limit {
            return Err(EngineError::InvalidGasUsed {
                have: header.gas_used,
                limit: header.gas_limit,
            });
        }
        if !self.spec.is_london(number) && header.base_fee.is_some() {
            return Err(EngineError::InvalidBaseFee);
        }
        Ok(())
    }

    fn verify_votes_and_signatures(&self, header: &Header) -> Result<(), EngineError> {
        let witnesses = header.miner_addresses.len();
        if header.signatures.len() != witnesses
            || header.bls_public_keys.len() != witnesses
            || header.auth_bls_signatures.len() != witnesses
        {
            return Err(EngineError::WitnessListMismatch);
        }

        let snapshot = header.number.saturating_sub(MINER_WAITING_BLOCKS);
        let mut votes_count = U256::ZERO;
        for (index, miner) in header.miner_addresses.iter().enumerate() {
            let stake = self.oracle.balance_of_at(*miner, snapshot)?;
            if stake < U256::from(MIN_STAKE) {
                return Err(EngineError::BalanceBelowThreshold {
                    index: Some(index),
                    address: *miner,
                    stake,
                });
            }
            let recovered =
                zkscam_crypto::recover_address(&header.zkscam_hash, &header.signatures[index])
                    .map_err(|_| EngineError::UnauthorizedSigner { index })?;
            if recovered != *miner {
                return Err(EngineError::UnauthorizedSigner { index });
            }
            let key_bound = zkscam_crypto::verify_arbitrary_with_address(
                &header.bls_public_keys[index],
                &header.auth_bls_signatures[index],
                *miner,
            )
            .unwrap_or(false);
            if !key_bound {
                return Err(EngineError::UnauthorizedSigner { index });
            }
            votes_count += stake;
        }

        let votes = header.votes.ok_or(EngineError::MissingVotes)?;
        if votes != votes_count {
            return Err(EngineError::VoteCountMismatch { have: votes, want: votes_count });
        }

        let parent = self
            .lookup_parent(header.parent_hash, header.number - 1)
            .ok_or(EngineError::UnknownAncestor)?;
        let parent_total = parent.total_votes.ok_or(EngineError::MissingVotes)?;
        let total_votes = header.total_votes.ok_or(EngineError::MissingVotes)?;
        let expected_total = parent_total + votes_count;
        if total_votes != expected_total {
            return Err(EngineError::TotalVotesMismatch {
                have: total_votes,
                want: expected_total,
            });
        }

        let aggregate_valid = bls::aggregate_verify(
            header.zkscam_hash.as_slice(),
            &header.aggregated_signature,
            &header.bls_public_keys,
        )
        .unwrap_or(false);
        if !aggregate_valid {
            return Err(EngineError::AggregateVerifyFailed);
        }

        self.recent_headers
            .write()
            .expect("header cache poisoned")
            .insert(header.hash(), header.clone());
        if let Ok(author) = self.author(header) {
            debug!(number = header.number, %author, "verified sealed header");
        }
        Ok(())
    }

    fn lookup_parent(&self, hash: B256, number: u64) -> Option<Header> {
        let cached = self.recent_headers.read().expect("header cache poisoned").get(&hash).cloned();
        cached.or_else(|| self.chain.get_header(hash, number))
    }

    /// Initializes the consensus fields of a candidate header and waits out
    /// the slot delay so the candidate is not announced ahead of time.
    pub async fn prepare(&self, header: &mut Header) -> Result<(), EngineError> {
        header.coinbase = Address::ZERO;
        header.nonce = NONCE_DROP_VOTE;
        header.difficulty = self.calc_difficulty();
        header.mix_digest = B256::ZERO;

        let mut extra = header.extra.to_vec();
        extra.resize(EXTRA_VANITY + EXTRA_SEAL, 0);
        header.extra = extra.into();

        let parent = self
            .chain
            .get_header(header.parent_hash, header.number.saturating_sub(1))
            .ok_or(EngineError::UnknownAncestor)?;
        header.time = parent.time + self.spec.period;

        let now = unix_now();
        if header.time > now {
            tokio::time::sleep(Duration::from_secs(header.time - now)).await;
        }
        Ok(())
    }

    /// Emitted difficulty is always the out-of-turn value; verification
    /// accepts both in-turn and out-of-turn on receive.
    pub fn calc_difficulty(&self) -> U256 {
        U256::from(DIFF_NO_TURN)
    }

    /// Starts a sealing attempt for `block`.
    ///
    /// Publishes the local vote immediately, then spawns a task that wakes
    /// at the header time, folds the winning candidate's votes into the
    /// header, and emits the sealed block on `results`. A signal on `stop`
    /// before the wake-up aborts silently; errors after the wake-up are
    /// logged and drop the attempt.
    pub fn seal(
        self: Arc<Self>,
        block: Block,
        results: mpsc::Sender<Block>,
        stop: watch::Receiver<()>,
    ) -> Result<(), EngineError>
    where
        C: 'static,
        O: 'static,
    {
        let number = block.number();
        if number == 0 {
            return Err(EngineError::UnknownBlock);
        }
        let miner = self.vault.eth_address()?;
        let snapshot = number.saturating_sub(MINER_WAITING_BLOCKS);
        let stake = self.oracle.balance_of_at(miner, snapshot)?;
        if stake < U256::from(MIN_STAKE) {
            return Err(EngineError::BalanceBelowThreshold { index: None, address: miner, stake });
        }
        if self.spec.period == 0 && block.transactions.is_empty() {
            return Err(EngineError::SealingPaused);
        }

        let zkscam_hash = block.zkscam_hash();
        let bls_public_key = self.vault.bls_public_key_bytes()?;
        let vote = Vote {
            number,
            miner_address: miner,
            zkscam_hash,
            signature: self.vault.sign_hash(zkscam_hash)?,
            auth_bls_signature: self.vault.sign_arbitrary(&bls_public_key)?,
            bls_public_key,
            bls_signature: self.vault.bls_sign(zkscam_hash)?,
        };
        self.collector.add(vote);

        let delay = Duration::from_secs(block.header.time.saturating_sub(unix_now()));
        info!(number, ?delay, "waiting for slot to sign and propagate");

        let engine = Arc::clone(&self);
        let mut stop = stop;
        tokio::spawn(async move {
            tokio::select! {
                _ = stop.changed() => {}
                _ = tokio::time::sleep(delay) => {
                    if let Err(error) = engine.finish_seal(&block, &results) {
                        warn!(number, %error, "sealing attempt dropped");
                    }
                }
            }
        });
        Ok(())
    }

    fn finish_seal(&self, block: &Block, results: &mpsc::Sender<Block>) -> Result<(), EngineError> {
        let number = block.number();
        let winner = self.collector.determine_winner()?.ok_or(EngineError::NoVotes)?;
        let votes = self.collector.votes_for(&winner);
        if votes.is_empty() {
            return Err(EngineError::NoVotes);
        }

        let mut miner_addresses = Vec::with_capacity(votes.len());
        let mut signatures = Vec::with_capacity(votes.len());
        let mut bls_public_keys = Vec::with_capacity(votes.len());
        let mut auth_bls_signatures = Vec::with_capacity(votes.len());
        for vote in &votes {
            miner_addresses.push(vote.miner_address);
            signatures.push(vote.signature.clone());
            bls_public_keys.push(vote.bls_public_key.clone());
            auth_bls_signatures.push(vote.auth_bls_signature.clone());
        }

        let local = self.vault.eth_address()?;
        let snapshot = number.saturating_sub(MINER_WAITING_BLOCKS);
        let mut votes_count = U256::ZERO;
        for miner in &miner_addresses {
            if *miner != local {
                votes_count += self.oracle.balance_of_at(*miner, snapshot)?;
                continue;
            }
            let snapshot_stake = self.oracle.balance_of_at(*miner, snapshot)?;
            let current_stake = self.oracle.balance_of(*miner)?;
            if snapshot_stake > current_stake {
                // Funds left since the snapshot; the snapshot still counts.
                votes_count += snapshot_stake;
            } else if snapshot_stake < current_stake {
                // Funds arrived after the snapshot; defer until the new
                // stake has aged past the waiting window.
                info!(miner = %local, "local stake increased since snapshot, deferring seal attempt");
                return Ok(());
            } else {
                votes_count += current_stake;
            }
        }

        let parent = self
            .lookup_parent(block.header.parent_hash, number - 1)
            .ok_or(EngineError::UnknownAncestor)?;
        let total_votes = parent.total_votes.ok_or(EngineError::MissingVotes)? + votes_count;
        let aggregated_signature = self.collector.aggregate_signatures_for(&winner)?;

        let mut header = block.header.clone();
        header.miner_addresses = miner_addresses;
        header.zkscam_hash = winner;
        header.signatures = signatures;
        header.bls_public_keys = bls_public_keys;
        header.auth_bls_signatures = auth_bls_signatures;
        header.aggregated_signature = aggregated_signature;
        header.votes = Some(votes_count);
        header.total_votes = Some(total_votes);

        self.collector.clear();

        if results.try_send(block.with_seal(header)).is_err() {
            warn!(number, "sealing result is not read by miner");
        }
        Ok(())
    }

    /// Runs post-execution consensus effects: gas fees of the parent block
    /// are split between its witnesses and the buyback address.
    pub fn finalize(
        &self,
        header: &Header,
        state: &mut dyn StateDb,
        txs: &[TxEnvelope],
        receipts: &[Receipt],
    ) {
        let Some(parent) =
            self.lookup_parent(header.parent_hash, header.number.saturating_sub(1))
        else {
            warn!(number = header.number, "missing parent header, skipping fee distribution");
            return;
        };
        let local = self.vault.eth_address().ok();
        fees::distribute_gas_fees(self.oracle.as_ref(), &parent, state, txs, receipts, local);
    }

    /// Finalizes, assigns the intermediate state root, and assembles the
    /// candidate block. Withdrawals are never valid here.
    pub fn finalize_and_assemble(
        &self,
        mut header: Header,
        state: &mut dyn StateDb,
        txs: Vec<TxEnvelope>,
        receipts: &[Receipt],
        has_withdrawals: bool,
    ) -> Result<Block, EngineError> {
        if has_withdrawals {
            return Err(EngineError::WithdrawalsNotSupported);
        }
        self.finalize(&header, state, &txs, receipts);
        header.state_root = state.intermediate_root(self.spec.is_eip158(header.number));
        Ok(Block::new(header, txs))
    }
}
