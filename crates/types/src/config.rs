//! Chain parameters consulted by the consensus engine.

use serde::{Deserialize, Serialize};

use crate::constants::EPOCH_LENGTH;

/// Hard-fork schedule and engine timing parameters.
///
/// Shanghai and Cancun are carried only so the engine can reject chains that
/// activate them; a ZKscam chain never schedules either.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainSpec {
    pub chain_id: u64,
    /// Minimum seconds between consecutive block timestamps.
    pub period: u64,
    /// Number of blocks between signer checkpoints.
    pub epoch: u64,
    pub london_block: Option<u64>,
    pub eip158_block: Option<u64>,
    pub shanghai_time: Option<u64>,
    pub cancun_time: Option<u64>,
}

impl Default for ChainSpec {
    fn default() -> Self {
        Self {
            chain_id: 1,
            period: 15,
            epoch: EPOCH_LENGTH,
            london_block: Some(0),
            eip158_block: Some(0),
            shanghai_time: None,
            cancun_time: None,
        }
    }
}

impl ChainSpec {
    pub fn is_london(&self, number: u64) -> bool {
        self.london_block.is_some_and(|block| number >= block)
    }

    pub fn is_eip158(&self, number: u64) -> bool {
        self.eip158_block.is_some_and(|block| number >= block)
    }

    pub fn is_shanghai(&self, _number: u64, time: u64) -> bool {
        self.shanghai_time.is_some_and(|at| time >= at)
    }

    pub fn is_cancun(&self, _number: u64, time: u64) -> bool {
        self.cancun_time.is_some_and(|at| time >= at)
    }
}
