#![forbid(unsafe_code)]
#![deny(trivial_casts, trivial_numeric_casts)]
#![allow(missing_docs)]

pub mod bls;
pub mod error;
pub mod vault;

pub use error::CryptoError;
pub use vault::{recover_address, verify_arbitrary_with_address, IdentityVault, SIGNATURE_LENGTH};
