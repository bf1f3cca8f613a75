use core::fmt;

use thiserror::Error;

use baronbft_proto::canonical::CanonicalVote;
use baronbft_proto::prost::Message;
use baronbft_proto::{self as proto, SignedMsgType};

use crate::proto::{canonical_block_id, commit_sig_to_proto};
use crate::{merkle_root, Address, BlockId, Hash, Height, Round, Signature, Timestamp};

/// What a commit entry says about its validator's precommit.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BlockIdFlag {
    Absent,
    Commit,
    Nil,
}

/// One entry of a commit, positionally matching the validator set.
#[derive(Clone, Debug, PartialEq)]
pub enum CommitSig {
    /// The validator did not precommit (or its precommit never arrived).
    Absent,
    /// The validator precommitted the committed block.
    Commit {
        validator_address: Address,
        timestamp: Timestamp,
        signature: Signature,
    },
    /// The validator precommitted nil or some other block.
    Nil {
        validator_address: Address,
        timestamp: Timestamp,
        signature: Signature,
    },
}

impl CommitSig {
    pub fn flag(&self) -> BlockIdFlag {
        match self {
            Self::Absent => BlockIdFlag::Absent,
            Self::Commit { .. } => BlockIdFlag::Commit,
            Self::Nil { .. } => BlockIdFlag::Nil,
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    pub fn is_commit(&self) -> bool {
        matches!(self, Self::Commit { .. })
    }

    pub fn validator_address(&self) -> Option<&Address> {
        match self {
            Self::Absent => None,
            Self::Commit {
                validator_address, ..
            }
            | Self::Nil {
                validator_address, ..
            } => Some(validator_address),
        }
    }

    pub fn timestamp(&self) -> Option<Timestamp> {
        match self {
            Self::Absent => None,
            Self::Commit { timestamp, .. } | Self::Nil { timestamp, .. } => Some(*timestamp),
        }
    }

    pub fn signature(&self) -> Option<&Signature> {
        match self {
            Self::Absent => None,
            Self::Commit { signature, .. } | Self::Nil { signature, .. } => Some(signature),
        }
    }
}

#[derive(Debug, Error)]
pub enum CommitError {
    #[error("commit height must be at least 1, got {0}")]
    InvalidHeight(Height),

    #[error("commit round must be non-negative, got {0}")]
    InvalidRound(Round),

    #[error("commit has a zero block id")]
    ZeroBlockId,

    #[error("commit has no signatures")]
    NoSignatures,

    #[error("failed to encode sign bytes: {0}")]
    SignBytes(#[from] proto::Error),
}

/// A super-majority certificate over one block id: one entry per validator
/// of the set, in validator-set order.
#[derive(Clone, Debug, PartialEq)]
pub struct Commit {
    pub height: Height,
    pub round: Round,
    pub block_id: BlockId,
    pub signatures: Vec<CommitSig>,
}

impl Commit {
    pub fn size(&self) -> usize {
        self.signatures.len()
    }

    pub fn validate_basic(&self) -> Result<(), CommitError> {
        if self.height < Height::new(1) {
            return Err(CommitError::InvalidHeight(self.height));
        }

        if self.round.is_nil() {
            return Err(CommitError::InvalidRound(self.round));
        }

        if self.block_id.is_zero() {
            return Err(CommitError::ZeroBlockId);
        }

        if self.signatures.is_empty() {
            return Err(CommitError::NoSignatures);
        }

        Ok(())
    }

    /// Reconstruct the canonical sign-bytes of the precommit behind the
    /// commit entry at `index`, or `None` for an absent entry.
    ///
    /// A `Commit` entry signed the committed block id; a `Nil` entry signed
    /// the nil block id.
    pub fn vote_sign_bytes(
        &self,
        chain_id: &str,
        index: usize,
    ) -> Result<Option<Vec<u8>>, proto::Error> {
        let Some(sig) = self.signatures.get(index) else {
            return Ok(None);
        };

        let (timestamp, block_id) = match sig {
            CommitSig::Absent => return Ok(None),
            CommitSig::Commit { timestamp, .. } => (*timestamp, canonical_block_id(&self.block_id)),
            CommitSig::Nil { timestamp, .. } => (*timestamp, None),
        };

        let timestamp = timestamp
            .to_rfc3339()
            .map_err(|e| proto::Error::invalid_field("CanonicalVote", "timestamp", e))?;

        let canonical = CanonicalVote {
            vote_type: SignedMsgType::Precommit as i32,
            height: self.height.as_u64() as i64,
            round: i64::from(self.round.as_i32()),
            block_id,
            timestamp,
            chain_id: chain_id.to_string(),
        };

        Ok(Some(canonical.encode_length_delimited_to_vec()))
    }

    /// Merkle root over the encoded commit entries, committed to by the next
    /// block's header.
    pub fn hash(&self) -> Hash {
        let encoded: Vec<Vec<u8>> = self
            .signatures
            .iter()
            .map(|sig| commit_sig_to_proto(sig).encode_to_vec())
            .collect();

        merkle_root(&encoded)
    }
}

impl fmt::Display for Commit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let committed = self.signatures.iter().filter(|s| s.is_commit()).count();
        write!(
            f,
            "Commit{{{}/{} {} ({}/{} signed)}}",
            self.height,
            self.round,
            self.block_id,
            committed,
            self.signatures.len()
        )
    }
}
