use core::fmt;

use thiserror::Error;

use baronbft_core_types::{Block, Height, PeerId};
use baronbft_proto::{self as proto, Error as ProtoError, Protobuf};

/// A message on the block-sync channel, in either direction.
#[derive(Clone, Debug, PartialEq)]
pub enum Message {
    /// Ask a peer for the block at `height`.
    BlockRequest { height: Height },

    /// A requested block.
    BlockResponse { block: Box<Block> },

    /// The peer does not have the requested height.
    NoBlockResponse { height: Height },

    /// Solicit the peer's status.
    StatusRequest,

    /// The peer's stored range.
    StatusResponse { base: Height, height: Height },
}

impl Protobuf for Message {
    type Proto = proto::sync::Message;

    fn from_proto(proto: Self::Proto) -> Result<Self, ProtoError> {
        use baronbft_proto::sync::message::Sum;

        let sum = proto
            .sum
            .ok_or_else(|| ProtoError::missing_field("Message", "sum"))?;

        Ok(match sum {
            Sum::BlockRequest(m) => Message::BlockRequest {
                height: Height::new(m.height),
            },
            Sum::BlockResponse(m) => {
                let block = m
                    .block
                    .ok_or_else(|| ProtoError::missing_field("BlockResponse", "block"))?;
                Message::BlockResponse {
                    block: Box::new(Block::from_proto(block)?),
                }
            }
            Sum::NoBlockResponse(m) => Message::NoBlockResponse {
                height: Height::new(m.height),
            },
            Sum::StatusRequest(_) => Message::StatusRequest,
            Sum::StatusResponse(m) => Message::StatusResponse {
                base: Height::new(m.base),
                height: Height::new(m.height),
            },
        })
    }

    fn to_proto(&self) -> Result<Self::Proto, ProtoError> {
        use baronbft_proto::sync::message::Sum;

        let sum = match self {
            Message::BlockRequest { height } => Sum::BlockRequest(proto::sync::BlockRequest {
                height: height.as_u64(),
            }),
            Message::BlockResponse { block } => Sum::BlockResponse(proto::sync::BlockResponse {
                block: Some(block.to_proto()?),
            }),
            Message::NoBlockResponse { height } => {
                Sum::NoBlockResponse(proto::sync::NoBlockResponse {
                    height: height.as_u64(),
                })
            }
            Message::StatusRequest => Sum::StatusRequest(proto::sync::StatusRequest {}),
            Message::StatusResponse { base, height } => {
                Sum::StatusResponse(proto::sync::StatusResponse {
                    base: base.as_u64(),
                    height: height.as_u64(),
                })
            }
        };

        Ok(proto::sync::Message { sum: Some(sum) })
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Message::BlockRequest { height } => write!(f, "BlockRequest({height})"),
            Message::BlockResponse { block } => write!(f, "BlockResponse(#{})", block.height()),
            Message::NoBlockResponse { height } => write!(f, "NoBlockResponse({height})"),
            Message::StatusRequest => f.write_str("StatusRequest"),
            Message::StatusResponse { base, height } => {
                write!(f, "StatusResponse([{base}, {height}])")
            }
        }
    }
}

/// An outbound message addressed to one peer. Broadcast is the reactor
/// iterating its connected peers.
#[derive(Clone, Debug)]
pub struct Envelope {
    pub to: PeerId,
    pub message: Message,
}

/// Why a peer is being reported on the peer-error channel.
#[derive(Clone, Debug, Error)]
pub enum PeerFault {
    #[error("request for height {height} timed out")]
    Timeout { height: Height },

    #[error("sent an invalid block at height {height}: {reason}")]
    InvalidBlock { height: Height, reason: String },

    #[error("sent a response we did not request: {reason}")]
    UnsolicitedResponse { reason: String },
}

/// A faulty peer, surfaced for upstream disconnection.
#[derive(Clone, Debug)]
pub struct PeerError {
    pub peer_id: PeerId,
    pub fault: PeerFault,
}
