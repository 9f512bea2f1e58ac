//! Witness votes exchanged between peers while a block candidate is open.

use alloy_primitives::{Address, Bytes, B256};
use serde::{Deserialize, Serialize};

/// A single witness vote for a block candidate.
///
/// `signature` covers `zkscam_hash`; `auth_bls_signature` covers
/// `bls_public_key` and binds it to `miner_address`; `bls_signature` is the
/// witness's BLS signature over `zkscam_hash`, the piece that gets
/// aggregated into the sealed header.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vote {
    pub number: u64,
    pub miner_address: Address,
    pub zkscam_hash: B256,
    pub signature: Bytes,
    pub bls_public_key: Bytes,
    pub auth_bls_signature: Bytes,
    pub bls_signature: Bytes,
}

/// Wire batch of votes.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Votes {
    pub votes: Vec<Vote>,
}

impl Votes {
    pub fn single(vote: Vote) -> Self {
        Self { votes: vec![vote] }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vote_batches_roundtrip_through_json() {
        let vote = Vote {
            number: 42,
            miner_address: Address::repeat_byte(0x11),
            zkscam_hash: B256::repeat_byte(0x22),
            signature: Bytes::from(vec![1u8; 65]),
            bls_public_key: Bytes::from(vec![2u8; 64]),
            auth_bls_signature: Bytes::from(vec![3u8; 65]),
            bls_signature: Bytes::from(vec![4u8; 32]),
        };
        let batch = Votes::single(vote);
        let encoded = serde_json::to_string(&batch).unwrap();
        let decoded: Votes = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, batch);
        assert_eq!(decoded.votes[0].number, 42);
    }
}
