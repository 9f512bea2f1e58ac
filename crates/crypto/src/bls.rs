//! BLS signatures on BN254 as the vote-aggregation primitive.
//!
//! Public keys live in G2, signatures in G1, and aggregation is point
//! addition in the respective group. Messages are mapped onto G1 with a
//! deterministic try-and-increment over keccak-256, so every node derives
//! the identical signature bytes for the same message and key.

use alloy_primitives::keccak256;
use ark_bn254::{Bn254, Fq, Fr, G1Affine, G2Affine, G2Projective};
use ark_ec::{pairing::Pairing, AffineRepr, CurveGroup};
use ark_ff::PrimeField;
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};

use crate::error::CryptoError;

/// Derives the BLS secret scalar from a 32-byte seed.
pub fn secret_from_seed(seed: &[u8; 32]) -> Fr {
    Fr::from_be_bytes_mod_order(seed)
}

/// Serialized G2 public key for `secret`.
pub fn public_key_bytes(secret: &Fr) -> Vec<u8> {
    serialize_point(&(G2Affine::generator() * secret).into_affine())
}

/// Signs `message`, returning the serialized G1 signature point.
pub fn sign(secret: &Fr, message: &[u8]) -> Vec<u8> {
    serialize_point(&(hash_to_g1(message) * secret).into_affine())
}

/// Verifies a single signature: `e(sig, G2) == e(H(m), pk)`.
pub fn verify(message: &[u8], signature: &[u8], public_key: &[u8]) -> Result<bool, CryptoError> {
    let signature: G1Affine = deserialize_point(signature)?;
    let public_key: G2Affine = deserialize_point(public_key)?;
    Ok(verify_inner(message, signature, public_key))
}

/// Verifies an aggregated signature by first summing the public keys in G2
/// and then running a single pairing check against `message`.
pub fn aggregate_verify<K>(
    message: &[u8],
    aggregated_signature: &[u8],
    public_keys: &[K],
) -> Result<bool, CryptoError>
where
    K: AsRef<[u8]>,
{
    let signature: G1Affine = deserialize_point(aggregated_signature)?;
    let mut sum: Option<G2Projective> = None;
    for key in public_keys {
        let point: G2Affine = deserialize_point(key.as_ref())?;
        sum = Some(match sum {
            Some(acc) => acc + point,
            None => point.into_group(),
        });
    }
    let Some(aggregated_key) = sum else {
        return Ok(false);
    };
    Ok(verify_inner(message, signature, aggregated_key.into_affine()))
}

/// Sums the given G1 signature points into one aggregated signature.
pub fn aggregate_signatures<S>(signatures: &[S]) -> Result<Vec<u8>, CryptoError>
where
    S: AsRef<[u8]>,
{
    let mut sum: Option<ark_bn254::G1Projective> = None;
    for signature in signatures {
        let point: G1Affine = deserialize_point(signature.as_ref())?;
        sum = Some(match sum {
            Some(acc) => acc + point,
            None => point.into_group(),
        });
    }
    let sum = sum.ok_or(CryptoError::InvalidPoint)?;
    Ok(serialize_point(&sum.into_affine()))
}

fn verify_inner(message: &[u8], signature: G1Affine, public_key: G2Affine) -> bool {
    Bn254::pairing(signature, G2Affine::generator()) == Bn254::pairing(hash_to_g1(message), public_key)
}

/// Deterministic try-and-increment mapping onto G1.
///
/// G1 has cofactor one on BN254, so any on-curve point is already in the
/// prime-order subgroup.
fn hash_to_g1(message: &[u8]) -> G1Affine {
    for counter in 0u8..=u8::MAX {
        let mut data = Vec::with_capacity(message.len() + 1);
        data.push(counter);
        data.extend_from_slice(message);
        let candidate = Fq::from_be_bytes_mod_order(keccak256(&data).as_slice());
        if let Some(point) = G1Affine::get_point_from_x_unchecked(candidate, false) {
            return point;
        }
    }
    unreachable!("no G1 point found within 256 hash increments")
}

fn serialize_point<P: CanonicalSerialize>(point: &P) -> Vec<u8> {
    let mut out = Vec::new();
    point.serialize_compressed(&mut out).expect("serialization into a Vec cannot fail");
    out
}

fn deserialize_point<P: CanonicalDeserialize>(bytes: &[u8]) -> Result<P, CryptoError> {
    P::deserialize_compressed(bytes).map_err(|_| CryptoError::InvalidPoint)
}
