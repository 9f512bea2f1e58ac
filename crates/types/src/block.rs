//! Block assembly: a consensus header plus its executed transaction list.

use alloy_primitives::B256;

use crate::{aliases::TxEnvelope, header::Header};

#[derive(Clone, Debug, Default)]
pub struct Block {
    pub header: Header,
    pub transactions: Vec<TxEnvelope>,
}

impl Block {
    pub fn new(header: Header, transactions: Vec<TxEnvelope>) -> Self {
        Self { header, transactions }
    }

    pub fn number(&self) -> u64 {
        self.header.number
    }

    pub fn hash(&self) -> B256 {
        self.header.hash()
    }

    /// Content hash witnesses sign; see [`Header::content_hash`].
    pub fn zkscam_hash(&self) -> B256 {
        self.header.content_hash()
    }

    /// Replaces the header, keeping the body. Used by the sealer once the
    /// witness fields are populated.
    pub fn with_seal(&self, header: Header) -> Self {
        Self { header, transactions: self.transactions.clone() }
    }
}

/// Execution result of a single transaction, as far as fee distribution is
/// concerned. Produced by the external block executor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Receipt {
    pub tx_hash: B256,
    pub gas_used: u64,
}
