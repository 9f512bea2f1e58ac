//! Protocol constants shared across the ZKscam crates.

use alloy_primitives::{address, b256, Address, B256, B64};

/// Minimum stake (in token base units) an address must hold at the snapshot
/// height before it may witness a block.
pub const MIN_STAKE: u64 = 100_000;

/// Number of blocks between the block being sealed and the balance snapshot
/// used for witness eligibility.
pub const MINER_WAITING_BLOCKS: u64 = 10;

/// Fixed number of extra-data prefix bytes reserved for signer vanity.
pub const EXTRA_VANITY: usize = 32;

/// Fixed number of extra-data suffix bytes reserved for the signer seal.
pub const EXTRA_SEAL: usize = 65;

/// Block difficulty for in-turn signatures.
pub const DIFF_IN_TURN: u64 = 2;

/// Block difficulty for out-of-turn signatures.
pub const DIFF_NO_TURN: u64 = 1;

/// Default number of blocks after which the signer checkpoint repeats.
pub const EPOCH_LENGTH: u64 = 30_000;

/// Random per-signer delay allowance for concurrent signers.
pub const WIGGLE_TIME_MS: u64 = 500;

/// Number of blocks after which a vote snapshot is persisted.
pub const CHECKPOINT_INTERVAL: u64 = 1024;

/// Number of recent vote snapshots kept in memory.
pub const INMEMORY_SNAPSHOTS: usize = 128;

/// Number of recent block signatures kept in memory.
pub const INMEMORY_SIGNATURES: usize = 4096;

/// Maximum gas limit any header may carry.
pub const MAX_GAS_LIMIT: u64 = 0x7fff_ffff_ffff_ffff;

/// Magic nonce value voting to add a signer.
pub const NONCE_AUTH_VOTE: B64 = B64::new([0xff; 8]);

/// Magic nonce value voting to drop a signer.
pub const NONCE_DROP_VOTE: B64 = B64::ZERO;

/// Keccak-256 of the RLP encoding of an empty list; the only uncle hash a
/// valid header may carry.
pub const EMPTY_UNCLE_HASH: B256 =
    b256!("1dcc4de8dec75d7aab85b567b6ccd41ad312451b948a7413f0a142fd40d49347");

/// Address credited with the 20% buyback share of every block's gas fees.
pub const FEE_BUYBACK_ADDRESS: Address = address!("1234567890abcdef1234567890abcdef12345678");
