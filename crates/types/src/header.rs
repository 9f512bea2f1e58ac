//! Consensus header and its deterministic encodings.
//!
//! Three digests matter here and they are not interchangeable:
//!
//! * [`Header::hash`]: identity hash, keccak-256 of the full RLP encoding.
//! * [`Header::seal_hash`]: digest signed by the legacy author seal; the
//!   trailing 65 bytes of `extra` (the seal slot) are omitted.
//! * [`Header::content_hash`]: the hash witnesses vote on and sign; the
//!   witness extension fields are omitted so every voter derives the same
//!   digest before the block is sealed.

use alloy_primitives::{keccak256, Address, Bloom, Bytes, B256, B64, U256};
use alloy_rlp::{length_of_length, BufMut, Decodable, Encodable};
use serde::{Deserialize, Serialize};

use crate::constants::EXTRA_SEAL;

/// 8-byte vote nonce carried by every header.
pub type BlockNonce = B64;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Header {
    pub parent_hash: B256,
    pub uncle_hash: B256,
    pub coinbase: Address,
    pub state_root: B256,
    pub tx_root: B256,
    pub receipt_root: B256,
    pub logs_bloom: Bloom,
    pub difficulty: U256,
    pub number: u64,
    pub gas_limit: u64,
    pub gas_used: u64,
    pub time: u64,
    pub extra: Bytes,
    pub mix_digest: B256,
    pub nonce: BlockNonce,

    /// Ordered witness set for this block.
    pub miner_addresses: Vec<Address>,
    /// Content hash the witnesses signed.
    pub zkscam_hash: B256,
    /// 65-byte ECDSA signatures over `zkscam_hash`, one per witness.
    pub signatures: Vec<Bytes>,
    /// Serialized BLS public keys (G2), one per witness.
    pub bls_public_keys: Vec<Bytes>,
    /// ECDSA signatures binding each BLS key to its witness address.
    pub auth_bls_signatures: Vec<Bytes>,
    /// Aggregated BLS signature over `zkscam_hash`.
    pub aggregated_signature: Bytes,
    /// Stake-weighted vote total of this block.
    pub votes: Option<U256>,
    /// `parent.total_votes + votes`.
    pub total_votes: Option<U256>,

    pub base_fee: Option<U256>,
}

impl Header {
    /// Identity hash of the header: keccak-256 of the full RLP encoding.
    pub fn hash(&self) -> B256 {
        let mut out = Vec::with_capacity(self.length());
        self.encode(&mut out);
        keccak256(&out)
    }

    /// Digest covered by the legacy author seal in `extra`.
    ///
    /// Panics when `extra` is shorter than the seal slot: a header in that
    /// shape can never be sealed and hashing it would silently produce a
    /// second digest form for the same header.
    pub fn seal_hash(&self) -> B256 {
        assert!(
            self.extra.len() >= EXTRA_SEAL,
            "header extra-data shorter than the {EXTRA_SEAL} byte seal slot"
        );
        let mut payload = Vec::new();
        self.encode_base_fields(&mut payload, &self.extra[..self.extra.len() - EXTRA_SEAL]);
        keccak256(&wrap_list(payload))
    }

    /// Digest of the block content witnesses vote on.
    ///
    /// Identical field list to [`Self::seal_hash`] but with the full
    /// extra-data, so it is defined before any seal bytes exist.
    pub fn content_hash(&self) -> B256 {
        let mut payload = Vec::new();
        self.encode_base_fields(&mut payload, &self.extra);
        keccak256(&wrap_list(payload))
    }

    /// Number of extra-data bytes between the vanity prefix and the seal
    /// suffix; non-zero only on checkpoint headers.
    pub fn extra_signers_len(&self) -> usize {
        self.extra.len().saturating_sub(crate::constants::EXTRA_VANITY + EXTRA_SEAL)
    }

    fn encode_base_fields(&self, out: &mut dyn BufMut, extra: &[u8]) {
        self.parent_hash.encode(out);
        self.uncle_hash.encode(out);
        self.coinbase.encode(out);
        self.state_root.encode(out);
        self.tx_root.encode(out);
        self.receipt_root.encode(out);
        self.logs_bloom.encode(out);
        self.difficulty.encode(out);
        U256::from(self.number).encode(out);
        self.gas_limit.encode(out);
        self.gas_used.encode(out);
        self.time.encode(out);
        extra.encode(out);
        self.mix_digest.encode(out);
        self.nonce.encode(out);
        if let Some(base_fee) = self.base_fee {
            base_fee.encode(out);
        }
    }

    /// Presence flags for the trailing-optional encoding: a slot is written
    /// whenever it, or any later slot, carries a value.
    fn extension_flags(&self) -> [bool; 9] {
        [
            !self.miner_addresses.is_empty(),
            self.zkscam_hash != B256::ZERO,
            !self.signatures.is_empty(),
            !self.bls_public_keys.is_empty(),
            !self.auth_bls_signatures.is_empty(),
            !self.aggregated_signature.is_empty(),
            self.votes.is_some(),
            self.total_votes.is_some(),
            self.base_fee.is_some(),
        ]
    }

    fn encode_fields(&self, out: &mut dyn BufMut) {
        self.parent_hash.encode(out);
        self.uncle_hash.encode(out);
        self.coinbase.encode(out);
        self.state_root.encode(out);
        self.tx_root.encode(out);
        self.receipt_root.encode(out);
        self.logs_bloom.encode(out);
        self.difficulty.encode(out);
        U256::from(self.number).encode(out);
        self.gas_limit.encode(out);
        self.gas_used.encode(out);
        self.time.encode(out);
        self.extra.encode(out);
        self.mix_digest.encode(out);
        self.nonce.encode(out);

        let flags = self.extension_flags();
        let emit = |idx: usize| flags[idx..].iter().any(|f| *f);

        if emit(0) {
            self.miner_addresses.encode(out);
        }
        if emit(1) {
            self.zkscam_hash.encode(out);
        }
        if emit(2) {
            self.signatures.encode(out);
        }
        if emit(3) {
            self.bls_public_keys.encode(out);
        }
        if emit(4) {
            self.auth_bls_signatures.encode(out);
        }
        if emit(5) {
            self.aggregated_signature.encode(out);
        }
        if emit(6) {
            self.votes.unwrap_or(U256::ZERO).encode(out);
        }
        if emit(7) {
            self.total_votes.unwrap_or(U256::ZERO).encode(out);
        }
        if emit(8) {
            self.base_fee.unwrap_or(U256::ZERO).encode(out);
        }
    }
}

fn wrap_list(payload: Vec<u8>) -> Vec<u8> {
    let mut out = Vec::with_capacity(payload.len() + 9);
    alloy_rlp::Header { list: true, payload_length: payload.len() }.encode(&mut out);
    out.extend_from_slice(&payload);
    out
}

impl Encodable for Header {
    fn encode(&self, out: &mut dyn BufMut) {
        let mut payload = Vec::new();
        self.encode_fields(&mut payload);
        alloy_rlp::Header { list: true, payload_length: payload.len() }.encode(out);
        out.put_slice(&payload);
    }

    fn length(&self) -> usize {
        let mut payload = Vec::new();
        self.encode_fields(&mut payload);
        payload.len() + length_of_length(payload.len())
    }
}

impl Decodable for Header {
    fn decode(buf: &mut &[u8]) -> alloy_rlp::Result<Self> {
        let rlp_head = alloy_rlp::Header::decode(buf)?;
        if !rlp_head.list {
            return Err(alloy_rlp::Error::UnexpectedString);
        }
        let started_len = buf.len();
        if started_len < rlp_head.payload_length {
            return Err(alloy_rlp::Error::InputTooShort);
        }

        let mut header = Header {
            parent_hash: B256::decode(buf)?,
            uncle_hash: B256::decode(buf)?,
            coinbase: Address::decode(buf)?,
            state_root: B256::decode(buf)?,
            tx_root: B256::decode(buf)?,
            receipt_root: B256::decode(buf)?,
            logs_bloom: Bloom::decode(buf)?,
            difficulty: U256::decode(buf)?,
            number: u64::decode(buf)?,
            gas_limit: u64::decode(buf)?,
            gas_used: u64::decode(buf)?,
            time: u64::decode(buf)?,
            extra: Bytes::decode(buf)?,
            mix_digest: B256::decode(buf)?,
            nonce: BlockNonce::decode(buf)?,
            ..Default::default()
        };

        let consumed = |buf: &&[u8]| started_len - buf.len();
        if consumed(buf) < rlp_head.payload_length {
            header.miner_addresses = Vec::<Address>::decode(buf)?;
        }
        if consumed(buf) < rlp_head.payload_length {
            header.zkscam_hash = B256::decode(buf)?;
        }
        if consumed(buf) < rlp_head.payload_length {
            header.signatures = Vec::<Bytes>::decode(buf)?;
        }
        if consumed(buf) < rlp_head.payload_length {
            header.bls_public_keys = Vec::<Bytes>::decode(buf)?;
        }
        if consumed(buf) < rlp_head.payload_length {
            header.auth_bls_signatures = Vec::<Bytes>::decode(buf)?;
        }
        if consumed(buf) < rlp_head.payload_length {
            header.aggregated_signature = Bytes::decode(buf)?;
        }
        if consumed(buf) < rlp_head.payload_length {
            header.votes = Some(U256::decode(buf)?);
        }
        if consumed(buf) < rlp_head.payload_length {
            header.total_votes = Some(U256::decode(buf)?);
        }
        if consumed(buf) < rlp_head.payload_length {
            header.base_fee = Some(U256::decode(buf)?);
        }
        // Withdrawals, blob-gas and beacon-root slots are never valid here.
        if consumed(buf) != rlp_head.payload_length {
            return Err(alloy_rlp::Error::Custom("unsupported post-london header extension"));
        }
        Ok(header)
    }
}
