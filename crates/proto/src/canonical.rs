//! Canonical sign-byte forms.
//!
//! Signatures are computed over the length-delimited encoding of these
//! messages. Heights and rounds use fixed-width encodings and timestamps are
//! RFC 3339 text in UTC; a block id with an absent hash collapses to the nil
//! form (no `block_id` field at all), discarding any part-set header.

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CanonicalPartSetHeader {
    #[prost(uint32, tag = "1")]
    pub total: u32,
    #[prost(bytes = "vec", tag = "2")]
    pub hash: Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CanonicalBlockId {
    #[prost(bytes = "vec", tag = "1")]
    pub hash: Vec<u8>,
    #[prost(message, optional, tag = "2")]
    pub part_set_header: Option<CanonicalPartSetHeader>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CanonicalVote {
    #[prost(enumeration = "super::SignedMsgType", tag = "1")]
    pub vote_type: i32,
    #[prost(sfixed64, tag = "2")]
    pub height: i64,
    #[prost(sfixed64, tag = "3")]
    pub round: i64,
    #[prost(message, optional, tag = "4")]
    pub block_id: Option<CanonicalBlockId>,
    #[prost(string, tag = "5")]
    pub timestamp: String,
    #[prost(string, tag = "6")]
    pub chain_id: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CanonicalProposal {
    #[prost(enumeration = "super::SignedMsgType", tag = "1")]
    pub msg_type: i32,
    #[prost(sfixed64, tag = "2")]
    pub height: i64,
    #[prost(sfixed64, tag = "3")]
    pub round: i64,
    #[prost(sfixed64, tag = "4")]
    pub pol_round: i64,
    #[prost(message, optional, tag = "5")]
    pub block_id: Option<CanonicalBlockId>,
    #[prost(string, tag = "6")]
    pub timestamp: String,
    #[prost(string, tag = "7")]
    pub chain_id: String,
}
