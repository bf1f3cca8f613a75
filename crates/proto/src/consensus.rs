//! Consensus data records: votes, commits, headers, blocks and their parts.
//!
//! An empty `hash` field denotes the absent hash; decoders must treat it as
//! distinct from any 32-byte value.

/// Tag identifying which kind of message a signature covers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum SignedMsgType {
    Unknown = 0,
    Prevote = 1,
    Precommit = 2,
    Proposal = 32,
}

/// Per-validator flag in a commit: did the validator sign, and for what.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum BlockIdFlag {
    Unknown = 0,
    Absent = 1,
    Commit = 2,
    Nil = 3,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PartSetHeader {
    #[prost(uint32, tag = "1")]
    pub total: u32,
    #[prost(bytes = "vec", tag = "2")]
    pub hash: Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct BlockId {
    #[prost(bytes = "vec", tag = "1")]
    pub hash: Vec<u8>,
    #[prost(message, optional, tag = "2")]
    pub part_set_header: Option<PartSetHeader>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Part {
    #[prost(uint32, tag = "1")]
    pub index: u32,
    #[prost(bytes = "vec", tag = "2")]
    pub bytes: Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Vote {
    #[prost(enumeration = "SignedMsgType", tag = "1")]
    pub vote_type: i32,
    #[prost(uint64, tag = "2")]
    pub height: u64,
    #[prost(int32, tag = "3")]
    pub round: i32,
    #[prost(message, optional, tag = "4")]
    pub block_id: Option<BlockId>,
    #[prost(message, optional, tag = "5")]
    pub timestamp: Option<::prost_types::Timestamp>,
    #[prost(bytes = "vec", tag = "6")]
    pub validator_address: Vec<u8>,
    #[prost(uint32, tag = "7")]
    pub validator_index: u32,
    #[prost(bytes = "vec", tag = "8")]
    pub signature: Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Proposal {
    #[prost(uint64, tag = "1")]
    pub height: u64,
    #[prost(int32, tag = "2")]
    pub round: i32,
    #[prost(int32, tag = "3")]
    pub pol_round: i32,
    #[prost(message, optional, tag = "4")]
    pub block_id: Option<BlockId>,
    #[prost(message, optional, tag = "5")]
    pub timestamp: Option<::prost_types::Timestamp>,
    #[prost(bytes = "vec", tag = "6")]
    pub signature: Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CommitSig {
    #[prost(enumeration = "BlockIdFlag", tag = "1")]
    pub block_id_flag: i32,
    #[prost(bytes = "vec", tag = "2")]
    pub validator_address: Vec<u8>,
    #[prost(message, optional, tag = "3")]
    pub timestamp: Option<::prost_types::Timestamp>,
    #[prost(bytes = "vec", tag = "4")]
    pub signature: Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Commit {
    #[prost(uint64, tag = "1")]
    pub height: u64,
    #[prost(int32, tag = "2")]
    pub round: i32,
    #[prost(message, optional, tag = "3")]
    pub block_id: Option<BlockId>,
    #[prost(message, repeated, tag = "4")]
    pub signatures: Vec<CommitSig>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Header {
    #[prost(string, tag = "1")]
    pub chain_id: String,
    #[prost(uint64, tag = "2")]
    pub height: u64,
    #[prost(message, optional, tag = "3")]
    pub time: Option<::prost_types::Timestamp>,
    #[prost(message, optional, tag = "4")]
    pub last_block_id: Option<BlockId>,
    #[prost(bytes = "vec", tag = "5")]
    pub last_commit_hash: Vec<u8>,
    #[prost(bytes = "vec", tag = "6")]
    pub data_hash: Vec<u8>,
    #[prost(bytes = "vec", tag = "7")]
    pub validators_hash: Vec<u8>,
    #[prost(bytes = "vec", tag = "8")]
    pub next_validators_hash: Vec<u8>,
    #[prost(bytes = "vec", tag = "9")]
    pub app_hash: Vec<u8>,
    #[prost(bytes = "vec", tag = "10")]
    pub last_results_hash: Vec<u8>,
    #[prost(bytes = "vec", tag = "11")]
    pub evidence_hash: Vec<u8>,
    #[prost(bytes = "vec", tag = "12")]
    pub proposer_address: Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Block {
    #[prost(message, optional, tag = "1")]
    pub header: Option<Header>,
    #[prost(bytes = "vec", repeated, tag = "2")]
    pub data: Vec<Vec<u8>>,
    #[prost(bytes = "vec", repeated, tag = "3")]
    pub evidence: Vec<Vec<u8>>,
    #[prost(message, optional, tag = "4")]
    pub last_commit: Option<Commit>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct BlockMeta {
    #[prost(message, optional, tag = "1")]
    pub block_id: Option<BlockId>,
    #[prost(uint64, tag = "2")]
    pub block_size: u64,
    #[prost(message, optional, tag = "3")]
    pub header: Option<Header>,
    #[prost(uint64, tag = "4")]
    pub num_txs: u64,
}

/// Persistent (base, height) pair of the block store, kept under a singleton
/// key and rewritten on every save.
#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct BlockStoreState {
    #[prost(uint64, tag = "1")]
    pub base: u64,
    #[prost(uint64, tag = "2")]
    pub height: u64,
}
