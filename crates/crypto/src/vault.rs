//! Holder of the miner identity: the secp256k1 signing key, the BLS secret
//! derived from it, and the corresponding ETH address.
//!
//! The vault is built empty and loaded exactly once at program start from
//! the miner key file. Every signing operation before that load fails with
//! [`CryptoError::KeyNotInitialized`]. The vault is injected wherever the
//! identity is needed; there is no process-global state.

use std::{fs, path::Path, sync::RwLock};

use alloy_primitives::{hex, keccak256, Address, Bytes, B256};
use ark_bn254::Fr;
use k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};
use sha2::{Digest, Sha256};

use crate::{bls, error::CryptoError};

/// Length of a recoverable ECDSA signature: r ‖ s ‖ v.
pub const SIGNATURE_LENGTH: usize = 65;

struct Identity {
    signing_key: SigningKey,
    address: Address,
    bls_secret: Fr,
}

pub struct IdentityVault {
    inner: RwLock<Option<Identity>>,
}

impl Default for IdentityVault {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentityVault {
    pub fn new() -> Self {
        Self { inner: RwLock::new(None) }
    }

    /// Loads the identity from a plaintext key file: hex ECDSA private key on
    /// the first line, hex ETH address on the second. The address line must
    /// match the address derived from the key.
    pub fn load_from_file(&self, path: &Path) -> Result<Address, CryptoError> {
        let data =
            fs::read_to_string(path).map_err(|_| CryptoError::KeyFileRead(path.to_path_buf()))?;
        let lines: Vec<&str> =
            data.lines().map(str::trim).filter(|line| !line.is_empty()).collect();
        if lines.len() < 2 {
            return Err(CryptoError::KeyFileFormat(
                "expected private key and address lines".to_string(),
            ));
        }
        let key_bytes = hex::decode(lines[0])
            .map_err(|_| CryptoError::KeyFileFormat("private key is not hex".to_string()))?;
        let declared: Address = lines[1]
            .parse()
            .map_err(|_| CryptoError::KeyFileFormat("address is not hex".to_string()))?;

        let address = self.load_from_key_bytes(&key_bytes)?;
        if address != declared {
            return Err(CryptoError::KeyFileFormat(
                "address line does not match the private key".to_string(),
            ));
        }
        Ok(address)
    }

    /// Loads the identity from raw private-key bytes. Used by tests and by
    /// `init` right after key generation.
    pub fn load_from_key_bytes(&self, key_bytes: &[u8]) -> Result<Address, CryptoError> {
        let signing_key =
            SigningKey::from_slice(key_bytes).map_err(|_| CryptoError::InvalidPrivateKey)?;
        let address = address_from_key(signing_key.verifying_key());

        // The BLS secret is bound to the ECDSA key: sha256 of the scalar.
        let digest: [u8; 32] = Sha256::digest(signing_key.to_bytes()).into();
        let bls_secret = bls::secret_from_seed(&digest);

        let mut guard = self.inner.write().expect("identity lock poisoned");
        *guard = Some(Identity { signing_key, address, bls_secret });
        Ok(address)
    }

    pub fn is_loaded(&self) -> bool {
        self.inner.read().expect("identity lock poisoned").is_some()
    }

    pub fn eth_address(&self) -> Result<Address, CryptoError> {
        self.with_identity(|identity| Ok(identity.address))
    }

    /// Signs a 32-byte digest, producing the 65-byte recoverable form.
    pub fn sign_hash(&self, hash: B256) -> Result<Bytes, CryptoError> {
        self.with_identity(|identity| {
            let (signature, recovery_id) = identity
                .signing_key
                .sign_prehash_recoverable(hash.as_slice())
                .map_err(|_| CryptoError::RecoveryFailed)?;
            let mut out = [0u8; SIGNATURE_LENGTH];
            out[..64].copy_from_slice(&signature.to_bytes());
            out[64] = recovery_id.to_byte();
            Ok(Bytes::copy_from_slice(&out))
        })
    }

    /// Signs arbitrary-length data by signing its sha256 digest.
    pub fn sign_arbitrary(&self, message: &[u8]) -> Result<Bytes, CryptoError> {
        let digest: [u8; 32] = Sha256::digest(message).into();
        self.sign_hash(B256::from(digest))
    }

    pub fn bls_public_key_bytes(&self) -> Result<Bytes, CryptoError> {
        self.with_identity(|identity| Ok(Bytes::from(bls::public_key_bytes(&identity.bls_secret))))
    }

    /// BLS signature over a 32-byte digest.
    pub fn bls_sign(&self, hash: B256) -> Result<Bytes, CryptoError> {
        self.with_identity(|identity| {
            Ok(Bytes::from(bls::sign(&identity.bls_secret, hash.as_slice())))
        })
    }

    fn with_identity<T>(
        &self,
        f: impl FnOnce(&Identity) -> Result<T, CryptoError>,
    ) -> Result<T, CryptoError> {
        let guard = self.inner.read().expect("identity lock poisoned");
        let identity = guard.as_ref().ok_or(CryptoError::KeyNotInitialized)?;
        f(identity)
    }
}

/// Recovers the signer address of a 65-byte recoverable signature over the
/// given 32-byte digest.
pub fn recover_address(hash: &B256, signature: &[u8]) -> Result<Address, CryptoError> {
    if signature.len() != SIGNATURE_LENGTH {
        return Err(CryptoError::BadSignatureLength {
            expected: SIGNATURE_LENGTH,
            got: signature.len(),
        });
    }
    let recovery_id =
        RecoveryId::from_byte(signature[64]).ok_or(CryptoError::RecoveryFailed)?;
    let signature =
        Signature::from_slice(&signature[..64]).map_err(|_| CryptoError::RecoveryFailed)?;
    let key = VerifyingKey::recover_from_prehash(hash.as_slice(), &signature, recovery_id)
        .map_err(|_| CryptoError::RecoveryFailed)?;
    Ok(address_from_key(&key))
}

/// Checks that `signature` is the expected address's signature over
/// arbitrary-length `message` (hashed with sha256 first, matching
/// [`IdentityVault::sign_arbitrary`]).
pub fn verify_arbitrary_with_address(
    message: &[u8],
    signature: &[u8],
    address: Address,
) -> Result<bool, CryptoError> {
    let digest: [u8; 32] = Sha256::digest(message).into();
    let recovered = recover_address(&B256::from(digest), signature)?;
    Ok(recovered == address)
}

fn address_from_key(key: &VerifyingKey) -> Address {
    let encoded = key.to_encoded_point(false);
    let digest = keccak256(&encoded.as_bytes()[1..]);
    Address::from_slice(&digest[12..])
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn loaded_vault(tag: u8) -> IdentityVault {
        let vault = IdentityVault::new();
        vault.load_from_key_bytes(&[tag; 32]).expect("load");
        vault
    }

    #[test]
    fn operations_fail_before_load() {
        let vault = IdentityVault::new();
        assert!(matches!(vault.eth_address(), Err(CryptoError::KeyNotInitialized)));
        assert!(matches!(
            vault.sign_hash(B256::repeat_byte(0x01)),
            Err(CryptoError::KeyNotInitialized)
        ));
        assert!(matches!(vault.bls_public_key_bytes(), Err(CryptoError::KeyNotInitialized)));
    }

    #[test]
    fn sign_and_recover_roundtrip() {
        let vault = loaded_vault(0x11);
        let hash = B256::repeat_byte(0x42);
        let signature = vault.sign_hash(hash).unwrap();
        assert_eq!(signature.len(), SIGNATURE_LENGTH);
        assert_eq!(recover_address(&hash, &signature).unwrap(), vault.eth_address().unwrap());
    }

    #[test]
    fn short_signature_is_rejected() {
        let err = recover_address(&B256::ZERO, &[0u8; 64]).unwrap_err();
        assert!(matches!(err, CryptoError::BadSignatureLength { expected: 65, got: 64 }));
    }

    #[test]
    fn arbitrary_message_signature_binds_to_address() {
        let vault = loaded_vault(0x22);
        let address = vault.eth_address().unwrap();
        let bls_key = vault.bls_public_key_bytes().unwrap();
        let signature = vault.sign_arbitrary(&bls_key).unwrap();

        assert!(verify_arbitrary_with_address(&bls_key, &signature, address).unwrap());
        let other = loaded_vault(0x23).eth_address().unwrap();
        assert!(!verify_arbitrary_with_address(&bls_key, &signature, other).unwrap());
    }

    #[test]
    fn bls_signature_verifies_under_vault_key() {
        let vault = loaded_vault(0x33);
        let hash = B256::repeat_byte(0x07);
        let signature = vault.bls_sign(hash).unwrap();
        let public_key = vault.bls_public_key_bytes().unwrap();
        assert!(crate::bls::verify(hash.as_slice(), &signature, &public_key).unwrap());
    }

    #[test]
    fn load_from_file_checks_the_address_line() {
        let vault = loaded_vault(0x44);
        let address = vault.eth_address().unwrap();

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{}", hex::encode([0x44u8; 32])).unwrap();
        writeln!(file, "{address}").unwrap();

        let fresh = IdentityVault::new();
        assert_eq!(fresh.load_from_file(file.path()).unwrap(), address);

        let mut wrong = tempfile::NamedTempFile::new().unwrap();
        writeln!(wrong, "{}", hex::encode([0x44u8; 32])).unwrap();
        writeln!(wrong, "{}", Address::repeat_byte(0x99)).unwrap();
        assert!(matches!(
            IdentityVault::new().load_from_file(wrong.path()),
            Err(CryptoError::KeyFileFormat(_))
        ));
    }
}
