use core::cmp::Reverse;
use core::fmt;

use thiserror::Error;

use baronbft_proto as proto;

use crate::{merkle_root, Address, BlockId, Commit, CommitSig, Hash, Height, PublicKey};

pub type VotingPower = u64;

/// A validator: a public key, the address derived from it, and a voting
/// power.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Validator {
    pub address: Address,
    pub public_key: PublicKey,
    pub voting_power: VotingPower,
}

impl Validator {
    pub fn new(public_key: PublicKey, voting_power: VotingPower) -> Self {
        Self {
            address: Address::from_public_key(&public_key),
            public_key,
            voting_power,
        }
    }

    /// The bytes this validator contributes to the validator-set hash.
    fn hash_bytes(&self) -> Vec<u8> {
        use baronbft_proto::prost::Message;

        let update = proto::abci::ValidatorUpdate {
            pub_key: self.public_key.to_bytes().to_vec(),
            power: self.voting_power,
        };

        update.encode_to_vec()
    }
}

impl fmt::Display for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.address, self.voting_power)
    }
}

#[derive(Debug, Error)]
pub enum VerifyCommitError {
    #[error("commit is for height {got}, expected {expected}")]
    HeightMismatch { got: Height, expected: Height },

    #[error("commit is for block {got}, expected {expected}")]
    BlockIdMismatch {
        got: Box<BlockId>,
        expected: Box<BlockId>,
    },

    #[error("commit has {got} signatures, validator set has {expected} entries")]
    SignatureCountMismatch { got: usize, expected: usize },

    #[error("commit entry {index} is from {got}, validator at that index is {expected}")]
    AddressMismatch {
        index: usize,
        got: Address,
        expected: Address,
    },

    #[error("invalid signature on commit entry {index} from {address}")]
    InvalidSignature { index: usize, address: Address },

    #[error(
        "not enough voting power signed the commit: \
         signed={signed}, total={total}, need more than {needed}"
    )]
    NotEnoughVotingPower {
        signed: VotingPower,
        total: VotingPower,
        needed: VotingPower,
    },

    #[error("failed to encode sign bytes: {0}")]
    SignBytes(#[from] proto::Error),
}

/// The ordered set of validators for a height, with cached total power.
///
/// Validators are ordered by descending voting power, then ascending
/// address, and deduplicated by address. Commit entries are positional
/// against this order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidatorSet {
    validators: Vec<Validator>,
    total_voting_power: VotingPower,
}

impl ValidatorSet {
    pub fn new(validators: impl IntoIterator<Item = Validator>) -> Self {
        let mut validators: Vec<_> = validators.into_iter().collect();

        validators.sort_unstable_by_key(|v| (Reverse(v.voting_power), v.address));
        validators.dedup_by_key(|v| v.address);

        let total_voting_power = validators.iter().map(|v| v.voting_power).sum();

        Self {
            validators,
            total_voting_power,
        }
    }

    pub fn len(&self) -> usize {
        self.validators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }

    pub fn validators(&self) -> &[Validator] {
        &self.validators
    }

    pub fn total_voting_power(&self) -> VotingPower {
        self.total_voting_power
    }

    pub fn get_by_index(&self, index: u32) -> Option<&Validator> {
        self.validators.get(index as usize)
    }

    pub fn get_by_address(&self, address: &Address) -> Option<(u32, &Validator)> {
        self.validators
            .iter()
            .enumerate()
            .find(|(_, v)| &v.address == address)
            .map(|(i, v)| (i as u32, v))
    }

    /// Merkle root over the (pubkey, power) entries in set order.
    pub fn hash(&self) -> Hash {
        let entries: Vec<Vec<u8>> = self.validators.iter().map(Validator::hash_bytes).collect();
        merkle_root(&entries)
    }

    /// Verify that `commit` is a valid +2/3 certificate from this set over
    /// `block_id` at `height`.
    ///
    /// Only entries flagged as committed-for-block are counted and have
    /// their signatures checked; counting stops early once the tally passes
    /// two thirds.
    pub fn verify_commit_light(
        &self,
        chain_id: &str,
        block_id: &BlockId,
        height: Height,
        commit: &Commit,
    ) -> Result<(), VerifyCommitError> {
        if commit.height != height {
            return Err(VerifyCommitError::HeightMismatch {
                got: commit.height,
                expected: height,
            });
        }

        if &commit.block_id != block_id {
            return Err(VerifyCommitError::BlockIdMismatch {
                got: Box::new(commit.block_id),
                expected: Box::new(*block_id),
            });
        }

        if commit.signatures.len() != self.validators.len() {
            return Err(VerifyCommitError::SignatureCountMismatch {
                got: commit.signatures.len(),
                expected: self.validators.len(),
            });
        }

        let total = self.total_voting_power;
        let needed = total * 2 / 3;
        let mut signed: VotingPower = 0;

        for (index, sig) in commit.signatures.iter().enumerate() {
            let CommitSig::Commit {
                validator_address,
                signature,
                ..
            } = sig
            else {
                continue;
            };

            let validator = &self.validators[index];
            if validator_address != &validator.address {
                return Err(VerifyCommitError::AddressMismatch {
                    index,
                    got: *validator_address,
                    expected: validator.address,
                });
            }

            let Some(sign_bytes) = commit.vote_sign_bytes(chain_id, index)? else {
                continue;
            };

            validator
                .public_key
                .verify(&sign_bytes, signature)
                .map_err(|_| VerifyCommitError::InvalidSignature {
                    index,
                    address: validator.address,
                })?;

            signed += validator.voting_power;

            if signed > needed {
                return Ok(());
            }
        }

        Err(VerifyCommitError::NotEnoughVotingPower {
            signed,
            total,
            needed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PrivateKey;

    fn validator(seed: u8, power: VotingPower) -> Validator {
        Validator::new(PrivateKey::from_bytes([seed; 32]).public_key(), power)
    }

    #[test]
    fn orders_by_power_then_address() {
        let set = ValidatorSet::new([validator(1, 5), validator(2, 10), validator(3, 10)]);

        let powers: Vec<_> = set.validators().iter().map(|v| v.voting_power).collect();
        assert_eq!(powers, [10, 10, 5]);
        assert!(set.validators()[0].address < set.validators()[1].address);
        assert_eq!(set.total_voting_power(), 25);
    }

    #[test]
    fn dedups_by_address() {
        let set = ValidatorSet::new([validator(1, 5), validator(1, 5), validator(2, 3)]);
        assert_eq!(set.len(), 2);
        assert_eq!(set.total_voting_power(), 8);
    }

    #[test]
    fn hash_changes_with_membership() {
        let a = ValidatorSet::new([validator(1, 1), validator(2, 1)]);
        let b = ValidatorSet::new([validator(1, 1), validator(3, 1)]);
        assert_ne!(a.hash(), b.hash());
    }
}
