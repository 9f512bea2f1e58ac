//! Weighted fork choice: the canonical chain is the one with the highest
//! cumulative vote weight, not the highest total difficulty.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use tracing::debug;
use zkscam_types::header::Header;

use crate::error::EngineError;

#[derive(Default)]
pub struct ForkChoice {
    is_reorging: Arc<AtomicBool>,
}

impl ForkChoice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared handle to the reorg flag, observable by other subsystems.
    pub fn is_reorging_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.is_reorging)
    }

    pub fn is_reorging(&self) -> bool {
        self.is_reorging.load(Ordering::SeqCst)
    }

    /// Whether `external` should replace `current` as the chain head.
    ///
    /// Decision ladder: cumulative votes, then witness count, then the
    /// *shorter* chain (equal weight on fewer blocks leaves less room for
    /// selfish mining), then identity of the voted content.
    pub fn reorg_needed(&self, current: &Header, external: &Header) -> Result<bool, EngineError> {
        let (Some(local_votes), Some(extern_votes)) = (current.total_votes, external.total_votes)
        else {
            self.set(false);
            return Err(EngineError::MissingVotes);
        };

        let reorg = if extern_votes != local_votes {
            extern_votes > local_votes
        } else if external.miner_addresses.len() != current.miner_addresses.len() {
            external.miner_addresses.len() > current.miner_addresses.len()
        } else if external.number < current.number {
            true
        } else {
            // Same weight, same witness count, not shorter: stay. This also
            // covers re-seeing the identical content at the same height.
            false
        };
        debug!(
            local = %local_votes,
            external = %extern_votes,
            reorg,
            "fork choice decided"
        );
        self.set(reorg);
        Ok(reorg)
    }

    fn set(&self, reorging: bool) {
        self.is_reorging.store(reorging, Ordering::SeqCst);
    }
}
