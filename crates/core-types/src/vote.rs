use core::fmt;

use thiserror::Error;

use baronbft_proto::canonical::CanonicalVote;
use baronbft_proto::prost::Message;
use baronbft_proto::{self as proto, SignedMsgType};

use crate::block_id::BlockIdError;
use crate::proto::canonical_block_id;
use crate::{Address, BlockId, Height, PublicKey, Round, Signature, Timestamp};

/// The two vote kinds of a consensus round.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum VoteType {
    Prevote,
    Precommit,
}

impl VoteType {
    pub fn signed_msg_type(&self) -> SignedMsgType {
        match self {
            Self::Prevote => SignedMsgType::Prevote,
            Self::Precommit => SignedMsgType::Precommit,
        }
    }
}

impl fmt::Display for VoteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Prevote => f.write_str("prevote"),
            Self::Precommit => f.write_str("precommit"),
        }
    }
}

#[derive(Debug, Error)]
pub enum VoteError {
    #[error("vote height must be at least 1, got {0}")]
    InvalidHeight(Height),

    #[error("vote round must be non-negative, got {0}")]
    InvalidRound(Round),

    #[error("invalid block id: {0}")]
    InvalidBlockId(#[from] BlockIdError),

    #[error("vote address {got} does not match public key address {expected}")]
    AddressMismatch { got: Address, expected: Address },

    #[error("invalid signature")]
    InvalidSignature,

    #[error("failed to encode sign bytes: {0}")]
    SignBytes(#[from] proto::Error),
}

/// A signed vote for a block (or nil) at a (height, round).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Vote {
    pub vote_type: VoteType,
    pub height: Height,
    pub round: Round,
    /// The voted-for block, or the zero block id for a nil vote.
    pub block_id: BlockId,
    pub timestamp: Timestamp,
    pub validator_address: Address,
    pub validator_index: u32,
    pub signature: Signature,
}

impl Vote {
    pub fn is_nil(&self) -> bool {
        self.block_id.is_zero()
    }

    /// The canonical bytes this vote's signature covers: the
    /// length-delimited canonical form of (type, height, round, block id,
    /// timestamp, chain id). A zero-hash block id canonicalizes to nil.
    pub fn sign_bytes(&self, chain_id: &str) -> Result<Vec<u8>, proto::Error> {
        let timestamp = self
            .timestamp
            .to_rfc3339()
            .map_err(|e| proto::Error::invalid_field("CanonicalVote", "timestamp", e))?;

        let canonical = CanonicalVote {
            vote_type: self.vote_type.signed_msg_type() as i32,
            height: self.height.as_u64() as i64,
            round: i64::from(self.round.as_i32()),
            block_id: canonical_block_id(&self.block_id),
            timestamp,
            chain_id: chain_id.to_string(),
        };

        Ok(canonical.encode_length_delimited_to_vec())
    }

    /// Check that this vote's address matches the given key and that its
    /// signature verifies over the canonical sign-bytes.
    pub fn verify(&self, chain_id: &str, public_key: &PublicKey) -> Result<(), VoteError> {
        let expected = Address::from_public_key(public_key);
        if self.validator_address != expected {
            return Err(VoteError::AddressMismatch {
                got: self.validator_address,
                expected,
            });
        }

        let sign_bytes = self.sign_bytes(chain_id)?;
        public_key
            .verify(&sign_bytes, &self.signature)
            .map_err(|_| VoteError::InvalidSignature)
    }

    /// Structural checks that need no validator set: height, round, and the
    /// shape of the block id.
    pub fn validate_basic(&self) -> Result<(), VoteError> {
        if self.height < Height::new(1) {
            return Err(VoteError::InvalidHeight(self.height));
        }

        if self.round.is_nil() {
            return Err(VoteError::InvalidRound(self.round));
        }

        self.block_id.validate_basic()?;

        Ok(())
    }
}

impl fmt::Display for Vote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Vote{{{} {}/{} {} by {}}}",
            self.vote_type, self.height, self.round, self.block_id, self.validator_address
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Hash, PartSetHeader, PrivateKey};

    fn sample_vote(key: &PrivateKey, block_id: BlockId) -> Vote {
        let mut vote = Vote {
            vote_type: VoteType::Precommit,
            height: Height::new(5),
            round: Round::new(0),
            block_id,
            timestamp: Timestamp::from_unix_parts(1_700_000_000, 0).unwrap(),
            validator_address: Address::from_public_key(&key.public_key()),
            validator_index: 0,
            signature: Signature::zero(),
        };
        let sign_bytes = vote.sign_bytes("baron-chain").unwrap();
        vote.signature = key.sign(&sign_bytes);
        vote
    }

    fn block_id() -> BlockId {
        BlockId::new(
            Hash::sha3_of(b"block"),
            PartSetHeader::new(1, Hash::sha3_of(b"parts")),
        )
    }

    #[test]
    fn signed_vote_verifies() {
        let key = PrivateKey::from_bytes([1; 32]);
        let vote = sample_vote(&key, block_id());
        assert!(vote.verify("baron-chain", &key.public_key()).is_ok());
    }

    #[test]
    fn wrong_chain_id_invalidates_signature() {
        let key = PrivateKey::from_bytes([1; 32]);
        let vote = sample_vote(&key, block_id());
        assert!(matches!(
            vote.verify("other-chain", &key.public_key()),
            Err(VoteError::InvalidSignature)
        ));
    }

    #[test]
    fn zero_hash_block_id_canonicalizes_to_nil() {
        let key = PrivateKey::from_bytes([1; 32]);

        // A block id with an absent hash but a non-zero part set header must
        // produce the same sign bytes as the plain nil block id.
        let weird = BlockId {
            hash: Hash::None,
            part_set_header: PartSetHeader::new(7, Hash::sha3_of(b"junk")),
        };
        let nil = BlockId::zero();

        let a = sample_vote(&key, weird);
        let b = sample_vote(&key, nil);

        assert_eq!(
            a.sign_bytes("baron-chain").unwrap(),
            b.sign_bytes("baron-chain").unwrap()
        );
    }
}
