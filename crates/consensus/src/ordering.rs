//! Miner-side transaction ordering: senders with more stake go first, ties
//! broken by earliest arrival, and each sender's transactions stay in nonce
//! order.

use std::{
    cmp::Ordering,
    collections::{BinaryHeap, HashMap, VecDeque},
    time::Instant,
};

use alloy_consensus::Transaction;
use alloy_primitives::{Address, U256};
use zkscam_types::aliases::TxEnvelope;

use crate::traits::StakeOracle;

/// A pool transaction together with its sender and observed arrival time.
#[derive(Clone, Debug)]
pub struct PendingTransaction {
    pub tx: TxEnvelope,
    pub sender: Address,
    pub arrived_at: Instant,
}

/// One heap entry: the next executable transaction of a single sender.
struct HeapEntry {
    pending: PendingTransaction,
    /// Effective miner tip, kept alongside for fee accounting by callers.
    tip: u128,
    stake: U256,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Max-heap: higher stake first, then earlier arrival.
        self.stake
            .cmp(&other.stake)
            .then_with(|| other.pending.arrived_at.cmp(&self.pending.arrived_at))
    }
}

/// Transactions grouped per sender, returned in stake-priority order while
/// honoring per-sender nonce order.
pub struct StakeOrderedTransactions {
    txs: HashMap<Address, VecDeque<PendingTransaction>>,
    heads: BinaryHeap<HeapEntry>,
    base_fee: Option<u64>,
}

impl StakeOrderedTransactions {
    /// Builds the ordered set. Senders whose head transaction cannot cover
    /// the base fee are dropped wholesale, like any other unexecutable
    /// account batch.
    pub fn new<O>(
        oracle: &O,
        txs: HashMap<Address, Vec<PendingTransaction>>,
        base_fee: Option<u64>,
    ) -> Self
    where
        O: StakeOracle + ?Sized,
    {
        let mut remaining: HashMap<Address, VecDeque<PendingTransaction>> = HashMap::new();
        let mut heads = BinaryHeap::with_capacity(txs.len());
        for (sender, list) in txs {
            let mut queue: VecDeque<PendingTransaction> = list.into();
            let Some(head) = queue.pop_front() else { continue };
            let stake = current_stake(oracle, sender);
            if let Some(entry) = wrap(head, stake, base_fee) {
                heads.push(entry);
                remaining.insert(sender, queue);
            }
        }
        Self { txs: remaining, heads, base_fee }
    }

    /// The best transaction and its effective tip, without removing it.
    pub fn peek(&self) -> Option<(&PendingTransaction, u128)> {
        self.heads.peek().map(|entry| (&entry.pending, entry.tip))
    }

    /// Replaces the current best with the same sender's next transaction.
    pub fn shift<O>(&mut self, oracle: &O)
    where
        O: StakeOracle + ?Sized,
    {
        let Some(entry) = self.heads.pop() else { return };
        let sender = entry.pending.sender;
        if let Some(queue) = self.txs.get_mut(&sender) {
            if let Some(next) = queue.pop_front() {
                let stake = current_stake(oracle, sender);
                if let Some(entry) = wrap(next, stake, self.base_fee) {
                    self.heads.push(entry);
                    return;
                }
            }
        }
        self.txs.remove(&sender);
    }

    /// Drops the best transaction *and* the rest of its sender's batch; used
    /// when the head turned out to be unexecutable.
    pub fn pop(&mut self) {
        if let Some(entry) = self.heads.pop() {
            self.txs.remove(&entry.pending.sender);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.heads.is_empty()
    }

    pub fn clear(&mut self) {
        self.heads.clear();
        self.txs.clear();
    }
}

fn current_stake<O>(oracle: &O, sender: Address) -> U256
where
    O: StakeOracle + ?Sized,
{
    oracle.balance_of(sender).unwrap_or(U256::ZERO)
}

fn wrap(
    pending: PendingTransaction,
    stake: U256,
    base_fee: Option<u64>,
) -> Option<HeapEntry> {
    let tip = match base_fee {
        Some(base_fee) => pending.tx.effective_tip_per_gas(base_fee)?,
        None => pending.tx.priority_fee_or_price(),
    };
    Some(HeapEntry { pending, tip, stake })
}
