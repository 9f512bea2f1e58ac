//! Node assembly: the single construction site for the identity vault, the
//! vote collector, the engine and the fork choice rule.

use std::{path::PathBuf, sync::Arc};

use color_eyre::eyre::{eyre, Result};
use tokio::sync::mpsc;
use tracing::{debug, info};
use zkscam_cli::config::NodeConfig;
use zkscam_consensus::{
    collector::VoteCollector,
    engine::Engine,
    fork_choice::ForkChoice,
    traits::Erc20StakeOracle,
};
use zkscam_crypto::IdentityVault;
use zkscam_types::vote::Votes;

use crate::chain::{genesis_header, ChannelVoteSink, GenesisState, MemoryChain};

const VOTE_CHANNEL_CAPACITY: usize = 128;

type DevEngine = Engine<MemoryChain, Erc20StakeOracle<GenesisState>>;

/// Everything a running node hands to its network and miner tasks.
pub struct NodeHandles {
    pub engine: Arc<DevEngine>,
    pub collector: Arc<VoteCollector>,
    pub fork_choice: ForkChoice,
    pub chain: Arc<MemoryChain>,
    /// Feed for vote batches arriving from peers.
    pub votes_in: mpsc::Sender<Votes>,
    /// Stream of vote batches to be gossiped to peers.
    pub votes_out: mpsc::Receiver<Votes>,
}

pub struct Node {
    pub config: NodeConfig,
    pub home_dir: PathBuf,
    pub genesis_file: PathBuf,
    pub key_file: PathBuf,
}

impl Node {
    /// Builds the consensus stack. This is the only place the vault, the
    /// collector and the engine are constructed.
    pub fn build(&self) -> Result<(NodeHandles, mpsc::Receiver<Votes>)> {
        let vault = Arc::new(IdentityVault::new());
        let address = vault
            .load_from_file(&self.key_file)
            .map_err(|error| eyre!("failed to load miner key: {error}"))?;
        info!(%address, "loaded miner identity");

        let genesis = zkscam_genesis::read_genesis(&self.genesis_file)?;
        let chain = Arc::new(MemoryChain::new(self.config.chain.clone()));
        chain.insert(genesis_header(&genesis));
        let oracle = Arc::new(Erc20StakeOracle::new(GenesisState::new(&genesis)));

        let (votes_out_tx, votes_out_rx) = mpsc::channel(VOTE_CHANNEL_CAPACITY);
        let sink = Arc::new(ChannelVoteSink::new(votes_out_tx));
        let collector =
            Arc::new(VoteCollector::new(address, chain.clone(), oracle.clone(), sink));
        let engine = Arc::new(Engine::new(
            self.config.chain.clone(),
            vault,
            collector.clone(),
            chain.clone(),
            oracle,
        ));
        let fork_choice = ForkChoice::new();

        let (votes_in_tx, votes_in_rx) = mpsc::channel(VOTE_CHANNEL_CAPACITY);
        let handles = NodeHandles {
            engine,
            collector,
            fork_choice,
            chain,
            votes_in: votes_in_tx,
            votes_out: votes_out_rx,
        };
        Ok((handles, votes_in_rx))
    }

    /// Runs the node until interrupted: ingests peer votes and drains the
    /// outbound gossip queue.
    pub async fn run(self) -> Result<()> {
        let (mut handles, mut votes_in_rx) = self.build()?;
        info!(moniker = %self.config.moniker, "node started");

        loop {
            tokio::select! {
                batch = votes_in_rx.recv() => {
                    match batch {
                        Some(batch) => handles.collector.ingest(batch),
                        None => break,
                    }
                }
                batch = handles.votes_out.recv() => {
                    if let Some(batch) = batch {
                        // The network layer picks these up; without one we
                        // just trace the outbound gossip.
                        debug!(votes = batch.votes.len(), "broadcasting votes");
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("shutdown requested");
                    break;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use zkscam_consensus::traits::ChainHeaderReader;
    use zkscam_types::config::ChainSpec;

    use super::*;

    fn write_dev_files(dir: &std::path::Path) -> (PathBuf, PathBuf) {
        let genesis = zkscam_genesis::build_dev_genesis(&ChainSpec::default()).unwrap();
        let genesis_file = dir.join("genesis.json");
        zkscam_genesis::write_genesis(&genesis_file, &genesis).unwrap();

        let vault = IdentityVault::new();
        let address = vault.load_from_key_bytes(&[0x42; 32]).unwrap();
        let key_file = dir.join("miner_private_key.txt");
        let mut file = std::fs::File::create(&key_file).unwrap();
        writeln!(file, "{}", alloy_primitives::hex::encode([0x42u8; 32])).unwrap();
        writeln!(file, "{address}").unwrap();

        (genesis_file, key_file)
    }

    #[tokio::test]
    async fn build_wires_the_full_consensus_stack() {
        let dir = std::env::temp_dir().join("zkscam-node-build-test");
        std::fs::create_dir_all(&dir).unwrap();
        let (genesis_file, key_file) = write_dev_files(&dir);

        let node = Node {
            config: NodeConfig::default(),
            home_dir: dir.clone(),
            genesis_file,
            key_file,
        };
        let (handles, _votes_in_rx) = node.build().expect("node builds");

        let head = handles.chain.current_header().expect("genesis is the head");
        assert_eq!(head.number, 0);
        handles.engine.verify_header(&head).expect("genesis passes structural checks");

        std::fs::remove_dir_all(&dir).ok();
    }
}
