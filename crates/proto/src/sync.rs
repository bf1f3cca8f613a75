//! Block-sync peer messages.
//!
//! Framing is provided by the enclosing P2P layer; this is only the payload
//! schema carried on the block-sync channel.

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct BlockRequest {
    #[prost(uint64, tag = "1")]
    pub height: u64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct BlockResponse {
    #[prost(message, optional, tag = "1")]
    pub block: Option<super::Block>,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct NoBlockResponse {
    #[prost(uint64, tag = "1")]
    pub height: u64,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct StatusRequest {}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct StatusResponse {
    #[prost(uint64, tag = "1")]
    pub base: u64,
    #[prost(uint64, tag = "2")]
    pub height: u64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Message {
    #[prost(oneof = "message::Sum", tags = "1, 2, 3, 4, 5")]
    pub sum: Option<message::Sum>,
}

pub mod message {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Sum {
        #[prost(message, tag = "1")]
        BlockRequest(super::BlockRequest),
        #[prost(message, tag = "2")]
        NoBlockResponse(super::NoBlockResponse),
        #[prost(message, tag = "3")]
        BlockResponse(super::BlockResponse),
        #[prost(message, tag = "4")]
        StatusRequest(super::StatusRequest),
        #[prost(message, tag = "5")]
        StatusResponse(super::StatusResponse),
    }
}
