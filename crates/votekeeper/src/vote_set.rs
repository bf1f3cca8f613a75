use std::collections::BTreeMap;
use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use baronbft_core_types::{
    BlockId, Commit, CommitSig, Hash, Height, PeerId, Round, ValidatorSet, Vote, VoteType,
    VotingPower,
};

use crate::{is_quorum, BitArray, EvidenceMap};

/// A conflicting pair: the vote already held for a validator and the vote
/// that contradicts it.
#[derive(Clone, Debug, PartialEq)]
pub struct VoteConflict {
    pub existing: Vote,
    pub conflicting: Vote,
}

#[derive(Debug, Error)]
pub enum VoteSetError {
    #[error("vote is for height {got}, this set is for height {expected}")]
    HeightMismatch { got: Height, expected: Height },

    #[error("vote is for round {got}, this set is for round {expected}")]
    RoundMismatch { got: Round, expected: Round },

    #[error("vote is a {got}, this set holds {expected}s")]
    TypeMismatch { got: VoteType, expected: VoteType },

    #[error("validator index {index} out of range (validator set size {len})")]
    IndexOutOfRange { index: u32, len: usize },

    #[error("vote address does not match validator {index}: {reason}")]
    AddressMismatch { index: u32, reason: String },

    /// The offending vote is carried so callers can hold it as evidence.
    #[error("invalid vote signature from validator {index}")]
    InvalidSignature { index: u32, vote: Box<Vote> },

    /// The second vote of an equivocating pair. The pair is retained as
    /// evidence; the original vote keeps its place in the tally.
    #[error("conflicting vote from validator {}", .0.conflicting.validator_address)]
    ConflictingVote(Box<VoteConflict>),

    #[error("peer {peer} already claimed +2/3 for {existing}, now claims {claimed}")]
    ConflictingPeerClaim {
        peer: PeerId,
        existing: Box<BlockId>,
        claimed: Box<BlockId>,
    },
}

#[derive(Debug, Error)]
pub enum MakeCommitError {
    #[error("cannot make a commit from a {0} vote set")]
    NotPrecommits(VoteType),

    #[error("no +2/3 majority reached")]
    NoMajority,
}

/// Per-block-id tally within a vote set.
///
/// Keyed in the parent map by the block id's hash, with the absent hash as
/// the nil sentinel; the representative full block id is kept here.
#[derive(Clone, Debug)]
struct BlockVotes {
    block_id: BlockId,
    /// A peer has claimed +2/3 for this block id, so conflicting votes for
    /// it are tracked too.
    peer_maj23: bool,
    bit_array: BitArray,
    votes: Vec<Option<Vote>>,
    sum: VotingPower,
}

impl BlockVotes {
    fn new(block_id: BlockId, peer_maj23: bool, len: usize) -> Self {
        Self {
            block_id,
            peer_maj23,
            bit_array: BitArray::new(len),
            votes: vec![None; len],
            sum: 0,
        }
    }

    fn add_verified(&mut self, index: u32, vote: Vote, power: VotingPower) {
        let index = index as usize;
        if self.votes[index].is_none() {
            self.bit_array.set(index, true);
            self.votes[index] = Some(vote);
            self.sum += power;
        }
    }
}

/// All votes of one (chain, height, round, type) tuple.
///
/// Every vote stored here has been signature-verified against the validator
/// set. At most one tallied vote per validator is kept; an equivocating
/// second vote is preserved as evidence but never displaces the first. Once
/// a +2/3 majority is recorded it is final for this set: later votes can
/// raise tallies but never change the winner.
#[derive(Clone, Debug)]
pub struct VoteSet {
    chain_id: String,
    height: Height,
    round: Round,
    vote_type: VoteType,
    validator_set: Arc<ValidatorSet>,

    votes_bit_array: BitArray,
    votes: Vec<Option<Vote>>,
    sum: VotingPower,
    maj23: Option<BlockId>,
    votes_by_block: BTreeMap<Hash, BlockVotes>,
    peer_maj23s: BTreeMap<PeerId, BlockId>,
    evidence: EvidenceMap,
}

impl VoteSet {
    pub fn new(
        chain_id: impl Into<String>,
        height: Height,
        round: Round,
        vote_type: VoteType,
        validator_set: Arc<ValidatorSet>,
    ) -> Self {
        let len = validator_set.len();

        Self {
            chain_id: chain_id.into(),
            height,
            round,
            vote_type,
            validator_set,
            votes_bit_array: BitArray::new(len),
            votes: vec![None; len],
            sum: 0,
            maj23: None,
            votes_by_block: BTreeMap::new(),
            peer_maj23s: BTreeMap::new(),
            evidence: EvidenceMap::new(),
        }
    }

    pub fn height(&self) -> Height {
        self.height
    }

    pub fn round(&self) -> Round {
        self.round
    }

    pub fn vote_type(&self) -> VoteType {
        self.vote_type
    }

    pub fn size(&self) -> usize {
        self.validator_set.len()
    }

    /// Add a signature-checked vote to the tally.
    ///
    /// Returns `Ok(true)` if the vote was added, `Ok(false)` for an exact
    /// duplicate of a vote already held. A vote that contradicts the
    /// validator's earlier vote is retained as evidence and surfaced through
    /// [`VoteSetError::ConflictingVote`] without entering the tally.
    pub fn add_vote(&mut self, vote: Vote) -> Result<bool, VoteSetError> {
        if vote.height != self.height {
            return Err(VoteSetError::HeightMismatch {
                got: vote.height,
                expected: self.height,
            });
        }

        if vote.round != self.round {
            return Err(VoteSetError::RoundMismatch {
                got: vote.round,
                expected: self.round,
            });
        }

        if vote.vote_type != self.vote_type {
            return Err(VoteSetError::TypeMismatch {
                got: vote.vote_type,
                expected: self.vote_type,
            });
        }

        let index = vote.validator_index;
        let Some(validator) = self.validator_set.get_by_index(index) else {
            return Err(VoteSetError::IndexOutOfRange {
                index,
                len: self.validator_set.len(),
            });
        };

        if vote.validator_address != validator.address {
            return Err(VoteSetError::AddressMismatch {
                index,
                reason: format!(
                    "got {}, expected {}",
                    vote.validator_address, validator.address
                ),
            });
        }

        // Verify before looking at prior votes, so a forged "conflicting"
        // vote cannot fabricate evidence against an honest validator.
        if vote.verify(&self.chain_id, &validator.public_key).is_err() {
            return Err(VoteSetError::InvalidSignature {
                index,
                vote: Box::new(vote),
            });
        }

        if let Some(existing) = &self.votes[index as usize] {
            if existing.block_id == vote.block_id {
                return Ok(false);
            }

            debug!(
                validator = %vote.validator_address,
                height = %self.height,
                round = %self.round,
                "Conflicting vote detected"
            );

            let power = validator.voting_power;
            let conflict = VoteConflict {
                existing: existing.clone(),
                conflicting: vote.clone(),
            };

            self.evidence.add(conflict.existing.clone(), vote.clone());

            // Track the conflicting vote only toward a block some peer has
            // claimed +2/3 for; this bounds memory while still letting a
            // claimed majority be validated.
            let key = vote_hash_key(&vote);
            let mut tracked = false;
            if let Some(block_votes) = self.votes_by_block.get_mut(&key) {
                if block_votes.peer_maj23 {
                    block_votes.add_verified(index, vote, power);
                    tracked = true;
                }
            }
            if tracked {
                self.update_maj23(key);
            }

            return Err(VoteSetError::ConflictingVote(Box::new(conflict)));
        }

        let power = validator.voting_power;
        let key = vote_hash_key(&vote);

        self.votes[index as usize] = Some(vote.clone());
        self.votes_bit_array.set(index as usize, true);
        self.sum += power;

        let len = self.validator_set.len();
        let block_votes = self
            .votes_by_block
            .entry(key)
            .or_insert_with(|| BlockVotes::new(vote.block_id, false, len));

        block_votes.add_verified(index, vote, power);
        self.update_maj23(key);

        Ok(true)
    }

    fn update_maj23(&mut self, key: Hash) {
        if self.maj23.is_some() {
            // The winning block id is final for this set.
            return;
        }

        let Some(block_votes) = self.votes_by_block.get(&key) else {
            return;
        };

        if is_quorum(block_votes.sum, self.validator_set.total_voting_power()) {
            debug!(
                height = %self.height,
                round = %self.round,
                vote_type = %self.vote_type,
                block_id = %block_votes.block_id,
                "+2/3 majority reached"
            );

            self.maj23 = Some(block_votes.block_id);
        }
    }

    /// The winning block id, once +2/3 of the voting power has voted for a
    /// single block id (possibly nil).
    pub fn two_thirds_majority(&self) -> Option<BlockId> {
        self.maj23
    }

    pub fn has_two_thirds_majority(&self) -> bool {
        self.maj23.is_some()
    }

    /// Whether +2/3 of the total power has voted at all, regardless of for
    /// what.
    pub fn has_two_thirds_any(&self) -> bool {
        is_quorum(self.sum, self.validator_set.total_voting_power())
    }

    /// Record a peer's claim of an observed +2/3 majority for `block_id`.
    ///
    /// A peer gets one claim per vote set; a different second claim is an
    /// error. The claimed block id is tracked even if the local tally has
    /// not reached +2/3 for it.
    pub fn set_peer_maj23(&mut self, peer: PeerId, block_id: BlockId) -> Result<(), VoteSetError> {
        if let Some(existing) = self.peer_maj23s.get(&peer) {
            if existing != &block_id {
                return Err(VoteSetError::ConflictingPeerClaim {
                    peer,
                    existing: Box::new(*existing),
                    claimed: Box::new(block_id),
                });
            }
            return Ok(());
        }

        self.peer_maj23s.insert(peer, block_id);

        let len = self.validator_set.len();
        self.votes_by_block
            .entry(block_id.hash)
            .or_insert_with(|| BlockVotes::new(block_id, true, len))
            .peer_maj23 = true;

        Ok(())
    }

    /// Which validator indices have a tallied vote.
    pub fn bit_array(&self) -> &BitArray {
        &self.votes_bit_array
    }

    /// The tallied vote of the validator at `index`, if any.
    pub fn get_by_index(&self, index: u32) -> Option<&Vote> {
        self.votes.get(index as usize).and_then(Option::as_ref)
    }

    /// Every vote seen from the validator at `index`: the tallied one plus
    /// any retained conflicting votes.
    pub fn votes_by_index(&self, index: u32) -> Vec<Vote> {
        let mut votes = Vec::new();

        if let Some(vote) = self.get_by_index(index) {
            votes.push(vote.clone());
        }

        if let Some(validator) = self.validator_set.get_by_index(index) {
            if let Some(pairs) = self.evidence.get(&validator.address) {
                for (_, conflicting) in pairs {
                    if !votes.contains(conflicting) {
                        votes.push(conflicting.clone());
                    }
                }
            }
        }

        votes
    }

    /// The retained equivocation evidence.
    pub fn evidence(&self) -> &EvidenceMap {
        &self.evidence
    }

    /// Materialize the +2/3 certificate of a decided precommit set.
    ///
    /// The signatures list has one entry per validator in positional order:
    /// absent where no precommit was seen, committed-for-block where the
    /// validator precommitted the winning block id, and nil otherwise.
    pub fn make_commit(&self) -> Result<Commit, MakeCommitError> {
        if self.vote_type != VoteType::Precommit {
            return Err(MakeCommitError::NotPrecommits(self.vote_type));
        }

        let Some(maj23) = self.maj23 else {
            return Err(MakeCommitError::NoMajority);
        };

        let signatures = self
            .votes
            .iter()
            .map(|vote| match vote {
                None => CommitSig::Absent,
                Some(vote) if vote.block_id == maj23 => CommitSig::Commit {
                    validator_address: vote.validator_address,
                    timestamp: vote.timestamp,
                    signature: vote.signature,
                },
                Some(vote) => CommitSig::Nil {
                    validator_address: vote.validator_address,
                    timestamp: vote.timestamp,
                    signature: vote.signature,
                },
            })
            .collect();

        Ok(Commit {
            height: self.height,
            round: self.round,
            block_id: maj23,
            signatures,
        })
    }
}

/// Tally key of a vote: its block id hash, with the absent hash standing in
/// for nil votes.
fn vote_hash_key(vote: &Vote) -> Hash {
    vote.block_id.hash
}
