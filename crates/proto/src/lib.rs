//! Wire schemas for the baronbft replication engine.
//!
//! The message structs in this crate are hand-maintained prost types. The
//! schema is small and consensus-critical, so the field tags live in plain
//! sight here rather than behind a build-time code generator.

use std::convert::Infallible;

use thiserror::Error;

use prost::{DecodeError, EncodeError, Message};

pub use prost;
pub use prost_types as types;

pub mod abci;
pub mod canonical;
pub mod sync;
mod consensus;

pub use consensus::*;

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to decode protobuf message")]
    Decode(#[from] DecodeError),

    #[error("failed to encode protobuf message")]
    Encode(#[from] EncodeError),

    #[error("unable to decode `{type_name}`: missing field `{field}`")]
    MissingField {
        type_name: &'static str,
        field: &'static str,
    },

    #[error("invalid field `{field}` in `{type_name}`: {reason}")]
    InvalidField {
        type_name: &'static str,
        field: &'static str,
        reason: String,
    },

    #[error("{0}")]
    Other(String),
}

impl Error {
    pub fn missing_field(type_name: &'static str, field: &'static str) -> Self {
        Self::MissingField { type_name, field }
    }

    pub fn invalid_field(
        type_name: &'static str,
        field: &'static str,
        reason: impl ToString,
    ) -> Self {
        Self::InvalidField {
            type_name,
            field,
            reason: reason.to_string(),
        }
    }
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Self::Other(s)
    }
}

impl From<Infallible> for Error {
    fn from(_: Infallible) -> Self {
        unreachable!()
    }
}

/// Conversion between a domain type and its protobuf representation.
pub trait Protobuf: Sized {
    type Proto: Message + Default;

    fn from_proto(proto: Self::Proto) -> Result<Self, Error>;

    fn to_proto(&self) -> Result<Self::Proto, Error>;

    fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        let proto = Self::Proto::decode(bytes)?;
        Self::from_proto(proto)
    }

    fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        let proto = self.to_proto()?;
        Ok(proto.encode_to_vec())
    }
}
