//! Peer selection for chain sync: follow the peer advertising the highest
//! cumulative vote weight, never total difficulty.

use std::{sync::Arc, time::Duration};

use alloy_primitives::{B256, U256};
use tokio::sync::mpsc;
use tracing::{debug, info};
use zkscam_consensus::traits::ChainHeaderReader;

/// Interval after which the minimum peer requirement is forced down to one,
/// so a sparsely connected node still starts syncing.
pub const FORCE_SYNC_CYCLE: Duration = Duration::from_secs(1);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PeerInfo {
    pub id: String,
    pub head: B256,
    pub total_votes: U256,
}

/// The connected peer set, as the network layer reports it.
pub trait PeerSet: Send + Sync {
    fn peer_count(&self) -> usize;
    fn peer_with_highest_votes(&self) -> Option<PeerInfo>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncMode {
    Full,
}

/// A scheduled sync operation handed to the downloader.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SyncOp {
    pub peer: PeerInfo,
    pub mode: SyncMode,
}

pub struct ChainSyncer<P, C> {
    peers: P,
    chain: Arc<C>,
    min_sync_peers: usize,
    forced: bool,
}

impl<P, C> ChainSyncer<P, C>
where
    P: PeerSet,
    C: ChainHeaderReader,
{
    pub fn new(peers: P, chain: Arc<C>, min_sync_peers: usize) -> Self {
        Self { peers, chain, min_sync_peers, forced: false }
    }

    /// Decides whether a sync should start right now, and against whom.
    pub fn next_sync_op(&self) -> Option<SyncOp> {
        let min_peers = if self.forced { 1 } else { self.min_sync_peers };
        if self.peers.peer_count() < min_peers {
            return None;
        }
        let peer = self.peers.peer_with_highest_votes()?;
        let local_votes = self
            .chain
            .current_header()
            .and_then(|head| head.total_votes)
            .unwrap_or(U256::ZERO);
        if peer.total_votes <= local_votes {
            debug!(peer = %peer.id, "already at or ahead of best peer, not syncing");
            return None;
        }
        Some(SyncOp { peer, mode: SyncMode::Full })
    }

    /// Lowers the peer requirement to one; called when the force timer fires.
    pub fn force(&mut self) {
        self.forced = true;
    }

    /// Re-arms the peer requirement after a sync round completes.
    pub fn sync_finished(&mut self) {
        self.forced = false;
    }

    /// Drives the sync loop: reacts to peer events, arms the force timer,
    /// and emits sync operations on `ops`.
    pub async fn run(mut self, mut peer_events: mpsc::Receiver<()>, ops: mpsc::Sender<SyncOp>) {
        let mut force = tokio::time::interval(FORCE_SYNC_CYCLE);
        force.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            if let Some(op) = self.next_sync_op() {
                info!(peer = %op.peer.id, votes = %op.peer.total_votes, "starting full sync");
                if ops.send(op).await.is_err() {
                    return;
                }
                self.sync_finished();
            }
            tokio::select! {
                event = peer_events.recv() => {
                    if event.is_none() {
                        return;
                    }
                }
                _ = force.tick() => {
                    self.forced = true;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use zkscam_types::{config::ChainSpec, header::Header};

    use super::*;
    use crate::chain::MemoryChain;

    struct FixedPeers {
        peers: Mutex<Vec<PeerInfo>>,
    }

    impl FixedPeers {
        fn new(peers: Vec<PeerInfo>) -> Self {
            Self { peers: Mutex::new(peers) }
        }
    }

    impl PeerSet for FixedPeers {
        fn peer_count(&self) -> usize {
            self.peers.lock().unwrap().len()
        }

        fn peer_with_highest_votes(&self) -> Option<PeerInfo> {
            self.peers.lock().unwrap().iter().max_by_key(|p| p.total_votes).cloned()
        }
    }

    fn peer(id: &str, votes: u64) -> PeerInfo {
        PeerInfo { id: id.to_string(), head: B256::repeat_byte(0x01), total_votes: U256::from(votes) }
    }

    fn chain_with_votes(votes: u64) -> Arc<MemoryChain> {
        let chain = MemoryChain::new(ChainSpec::default());
        chain.insert(Header { total_votes: Some(U256::from(votes)), ..Default::default() });
        Arc::new(chain)
    }

    #[test]
    fn syncs_to_the_peer_with_most_votes() {
        let peers = FixedPeers::new(vec![peer("a", 500), peer("b", 900)]);
        let syncer = ChainSyncer::new(peers, chain_with_votes(100), 1);
        let op = syncer.next_sync_op().expect("sync should start");
        assert_eq!(op.peer.id, "b");
        assert_eq!(op.mode, SyncMode::Full);
    }

    #[test]
    fn refuses_to_sync_below_the_minimum_peer_count() {
        let peers = FixedPeers::new(vec![peer("a", 900)]);
        let mut syncer = ChainSyncer::new(peers, chain_with_votes(100), 3);
        assert_eq!(syncer.next_sync_op(), None);

        // Once the force timer fires the single peer suffices.
        syncer.force();
        assert!(syncer.next_sync_op().is_some());
    }

    #[test]
    fn does_not_sync_when_local_votes_are_ahead() {
        let peers = FixedPeers::new(vec![peer("a", 500)]);
        let syncer = ChainSyncer::new(peers, chain_with_votes(500), 1);
        assert_eq!(syncer.next_sync_op(), None);
    }
}
