use core::fmt;

use baronbft_proto::canonical::CanonicalProposal;
use baronbft_proto::prost::Message;
use baronbft_proto::{self as proto, SignedMsgType};

use crate::proto::canonical_block_id;
use crate::{Address, BlockId, Height, PublicKey, Round, Signature, Timestamp, VoteError};

/// A block proposal for a (height, round), signed by the round's proposer.
///
/// `pol_round` is the round of the proof-of-lock the proposer is re-proposing
/// from, or nil when the value is fresh.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Proposal {
    pub height: Height,
    pub round: Round,
    pub pol_round: Round,
    pub block_id: BlockId,
    pub timestamp: Timestamp,
    pub signature: Signature,
}

impl Proposal {
    /// Canonical sign-bytes: identical shape to a vote's, with the proposal
    /// type tag and the additional POL round.
    pub fn sign_bytes(&self, chain_id: &str) -> Result<Vec<u8>, proto::Error> {
        let timestamp = self
            .timestamp
            .to_rfc3339()
            .map_err(|e| proto::Error::invalid_field("CanonicalProposal", "timestamp", e))?;

        let canonical = CanonicalProposal {
            msg_type: SignedMsgType::Proposal as i32,
            height: self.height.as_u64() as i64,
            round: i64::from(self.round.as_i32()),
            pol_round: i64::from(self.pol_round.as_i32()),
            block_id: canonical_block_id(&self.block_id),
            timestamp,
            chain_id: chain_id.to_string(),
        };

        Ok(canonical.encode_length_delimited_to_vec())
    }

    pub fn verify(
        &self,
        chain_id: &str,
        proposer_address: &Address,
        public_key: &PublicKey,
    ) -> Result<(), VoteError> {
        let expected = Address::from_public_key(public_key);
        if proposer_address != &expected {
            return Err(VoteError::AddressMismatch {
                got: *proposer_address,
                expected,
            });
        }

        let sign_bytes = self.sign_bytes(chain_id)?;
        public_key
            .verify(&sign_bytes, &self.signature)
            .map_err(|_| VoteError::InvalidSignature)
    }
}

impl fmt::Display for Proposal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Proposal{{{}/{} (pol {}) {}}}",
            self.height, self.round, self.pol_round, self.block_id
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Hash, PartSetHeader, PrivateKey, VoteType};

    #[test]
    fn proposal_sign_bytes_differ_from_vote_sign_bytes() {
        let key = PrivateKey::from_bytes([3; 32]);
        let block_id = BlockId::new(
            Hash::sha3_of(b"block"),
            PartSetHeader::new(1, Hash::sha3_of(b"parts")),
        );
        let timestamp = Timestamp::from_unix_parts(1_700_000_000, 0).unwrap();

        let proposal = Proposal {
            height: Height::new(2),
            round: Round::new(0),
            pol_round: Round::NIL,
            block_id,
            timestamp,
            signature: Signature::zero(),
        };

        let vote = crate::Vote {
            vote_type: VoteType::Precommit,
            height: Height::new(2),
            round: Round::new(0),
            block_id,
            timestamp,
            validator_address: Address::from_public_key(&key.public_key()),
            validator_index: 0,
            signature: Signature::zero(),
        };

        assert_ne!(
            proposal.sign_bytes("baron-chain").unwrap(),
            vote.sign_bytes("baron-chain").unwrap()
        );
    }

    #[test]
    fn signed_proposal_verifies() {
        let key = PrivateKey::from_bytes([4; 32]);
        let address = Address::from_public_key(&key.public_key());

        let mut proposal = Proposal {
            height: Height::new(2),
            round: Round::new(1),
            pol_round: Round::new(0),
            block_id: BlockId::zero(),
            timestamp: Timestamp::from_unix_parts(1_700_000_000, 42).unwrap(),
            signature: Signature::zero(),
        };

        let sign_bytes = proposal.sign_bytes("baron-chain").unwrap();
        proposal.signature = key.sign(&sign_bytes);

        assert!(proposal
            .verify("baron-chain", &address, &key.public_key())
            .is_ok());
    }
}
