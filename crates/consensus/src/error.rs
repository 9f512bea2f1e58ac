use alloy_primitives::{Address, U256};
use thiserror::Error;
use zkscam_crypto::CryptoError;

/// Everything that can go wrong while verifying or sealing a block.
///
/// Verification errors surface at the import boundary per header; sealing
/// errors are logged and drop the attempt. Witness-loop variants carry the
/// first failing index so rejections are deterministic and reportable.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("unknown block")]
    UnknownBlock,

    #[error("block in the future")]
    FutureBlock,

    #[error("beneficiary in checkpoint block non-zero")]
    InvalidCheckpointBeneficiary,

    #[error("vote nonce not 0x00..0 or 0xff..f")]
    InvalidVoteNonce,

    #[error("extra-data 32 byte vanity prefix missing")]
    MissingVanity,

    #[error("extra-data 65 byte signature suffix missing")]
    MissingSignature,

    #[error("non-checkpoint block contains extra signer list")]
    ExtraSigners,

    #[error("invalid signer list on checkpoint block")]
    InvalidCheckpointSigners,

    #[error("non-zero mix digest")]
    InvalidMixDigest,

    #[error("non empty uncle hash")]
    InvalidUncleHash,

    #[error("invalid difficulty")]
    InvalidDifficulty,

    #[error("invalid gasLimit: have {have}, max {max}")]
    InvalidGasLimit { have: u64, max: u64 },

    #[error("invalid gasUsed: have {have}, gasLimit {limit}")]
    InvalidGasUsed { have: u64, limit: u64 },

    #[error("base fee present before london fork")]
    InvalidBaseFee,

    #[error("invalid timestamp")]
    InvalidTimestamp,

    #[error("unknown ancestor")]
    UnknownAncestor,

    #[error("unauthorized signer at witness index {index}")]
    UnauthorizedSigner { index: usize },

    #[error("witness lists have mismatched lengths")]
    WitnessListMismatch,

    /// `index` is the failing witness position, or `None` when the local
    /// miner's own stake fails the pre-seal check.
    #[error("stake {stake} of miner {address} below minimum")]
    BalanceBelowThreshold { index: Option<usize>, address: Address, stake: U256 },

    #[error("missing votes")]
    MissingVotes,

    #[error("votes count mismatch: header has {have}, calculated {want}")]
    VoteCountMismatch { have: U256, want: U256 },

    #[error("total votes mismatch: header has {have}, expected {want}")]
    TotalVotesMismatch { have: U256, want: U256 },

    #[error("aggregated signature verification failed")]
    AggregateVerifyFailed,

    #[error("shanghai fork not supported")]
    ShanghaiNotSupported,

    #[error("cancun fork not supported")]
    CancunNotSupported,

    #[error("withdrawals not supported")]
    WithdrawalsNotSupported,

    #[error("sealing paused while waiting for transactions")]
    SealingPaused,

    #[error("no votes collected for any candidate")]
    NoVotes,

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error(transparent)]
    StakeLookup(#[from] StakeLookupError),
}

/// The stake oracle could not answer a balance query.
#[derive(Debug, Error)]
#[error("stake lookup failed for {address} at block {number}")]
pub struct StakeLookupError {
    pub address: Address,
    pub number: u64,
}
