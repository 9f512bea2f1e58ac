pub type U256 = alloy_primitives::U256;
pub type B256 = alloy_primitives::B256;
pub type B64 = alloy_primitives::B64;
pub type Address = alloy_primitives::Address;

pub type BlockHash = alloy_primitives::BlockHash;
pub type BlockNumber = alloy_primitives::BlockNumber;
pub type Bloom = alloy_primitives::Bloom;
pub type Bytes = alloy_primitives::Bytes;

pub type TxEnvelope = alloy_consensus::TxEnvelope;
