use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CryptoError {
    /// A signing or derivation operation ran before the vault was loaded.
    #[error("signing key is not initialized")]
    KeyNotInitialized,

    #[error("bad signature length: expected {expected}, got {got}")]
    BadSignatureLength { expected: usize, got: usize },

    #[error("invalid secp256k1 private key")]
    InvalidPrivateKey,

    #[error("signature recovery failed")]
    RecoveryFailed,

    #[error("invalid BLS point encoding")]
    InvalidPoint,

    #[error("failed to read key file {0}")]
    KeyFileRead(PathBuf),

    #[error("key file format invalid: {0}")]
    KeyFileFormat(String),
}
