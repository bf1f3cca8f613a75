use std::collections::BTreeMap;
use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use baronbft_core_types::{BlockId, Height, PeerId, Round, ValidatorSet, Vote, VoteType};

use crate::{VoteSet, VoteSetError};

/// How many rounds beyond the current one a single peer may cause this
/// replica to allocate.
const MAX_CATCHUP_ROUNDS_PER_PEER: usize = 2;

#[derive(Debug, Error)]
pub enum HeightVoteError {
    /// The peer asked for a future round it is not entitled to allocate.
    #[error("unwanted round {round} from peer {peer}")]
    UnwantedRound { peer: PeerId, round: Round },

    #[error(transparent)]
    VoteSet(#[from] VoteSetError),
}

#[derive(Clone, Debug)]
struct RoundVoteSet {
    prevotes: VoteSet,
    precommits: VoteSet,
}

/// The vote sets of every round of one height: one (prevote, precommit)
/// pair per allocated round.
///
/// Rounds advance monotonically via [`HeightVoteSet::set_round`]. Peers can
/// force allocation of a bounded number of future rounds by relaying votes
/// for them; past that bound their votes are refused, which caps the memory
/// a peer can make this replica commit to.
#[derive(Clone, Debug)]
pub struct HeightVoteSet {
    chain_id: String,
    height: Height,
    validator_set: Arc<ValidatorSet>,

    round: Round,
    round_vote_sets: BTreeMap<Round, RoundVoteSet>,
    peer_catchup_rounds: BTreeMap<PeerId, Vec<Round>>,
}

impl HeightVoteSet {
    pub fn new(
        chain_id: impl Into<String>,
        height: Height,
        validator_set: Arc<ValidatorSet>,
    ) -> Self {
        let mut hvs = Self {
            chain_id: chain_id.into(),
            height,
            validator_set,
            round: Round::ZERO,
            round_vote_sets: BTreeMap::new(),
            peer_catchup_rounds: BTreeMap::new(),
        };

        hvs.add_round(Round::ZERO);
        hvs
    }

    pub fn height(&self) -> Height {
        self.height
    }

    pub fn round(&self) -> Round {
        self.round
    }

    fn add_round(&mut self, round: Round) {
        if self.round_vote_sets.contains_key(&round) {
            return;
        }

        let round_vote_set = RoundVoteSet {
            prevotes: VoteSet::new(
                self.chain_id.clone(),
                self.height,
                round,
                VoteType::Prevote,
                Arc::clone(&self.validator_set),
            ),
            precommits: VoteSet::new(
                self.chain_id.clone(),
                self.height,
                round,
                VoteType::Precommit,
                Arc::clone(&self.validator_set),
            ),
        };

        self.round_vote_sets.insert(round, round_vote_set);
    }

    /// Advance to `round`, allocating vote sets for every round up to it.
    ///
    /// Rounds only move forward; a lower round is a caller error and panics.
    pub fn set_round(&mut self, round: Round) {
        assert!(
            round >= self.round,
            "set_round({round}) called with round lower than current round {}",
            self.round
        );

        let mut r = self.round;
        while r <= round {
            self.add_round(r);
            r = r.increment();
        }

        self.round = round;
    }

    /// Dispatch a vote to the vote set of its (round, type).
    ///
    /// `peer` is the relaying peer, or `None` for votes the local replica
    /// produced itself. A peer-relayed vote for an unallocated future round
    /// allocates it only while the peer stays under its catch-up allowance.
    pub fn add_vote(&mut self, vote: Vote, peer: Option<&PeerId>) -> Result<bool, HeightVoteError> {
        let round = vote.round;

        if !self.round_vote_sets.contains_key(&round) {
            match peer {
                None => self.add_round(round),
                Some(peer) => {
                    let rounds = self.peer_catchup_rounds.entry(peer.clone()).or_default();

                    if !rounds.contains(&round) {
                        if rounds.len() >= MAX_CATCHUP_ROUNDS_PER_PEER {
                            return Err(HeightVoteError::UnwantedRound {
                                peer: peer.clone(),
                                round,
                            });
                        }
                        rounds.push(round);
                    }

                    debug!(%peer, %round, "Allocating catch-up round for peer vote");
                    self.add_round(round);
                }
            }
        }

        let vote_type = vote.vote_type;
        let vote_set = self
            .round_vote_sets
            .get_mut(&round)
            .map(|rvs| match vote_type {
                VoteType::Prevote => &mut rvs.prevotes,
                VoteType::Precommit => &mut rvs.precommits,
            });

        match vote_set {
            Some(vote_set) => Ok(vote_set.add_vote(vote)?),
            // Unreachable in practice: the round was just allocated.
            None => Ok(false),
        }
    }

    pub fn prevotes(&self, round: Round) -> Option<&VoteSet> {
        self.round_vote_sets.get(&round).map(|rvs| &rvs.prevotes)
    }

    pub fn precommits(&self, round: Round) -> Option<&VoteSet> {
        self.round_vote_sets.get(&round).map(|rvs| &rvs.precommits)
    }

    pub fn prevotes_mut(&mut self, round: Round) -> Option<&mut VoteSet> {
        self.round_vote_sets
            .get_mut(&round)
            .map(|rvs| &mut rvs.prevotes)
    }

    pub fn precommits_mut(&mut self, round: Round) -> Option<&mut VoteSet> {
        self.round_vote_sets
            .get_mut(&round)
            .map(|rvs| &mut rvs.precommits)
    }

    /// Record a peer's +2/3 claim on the vote set it designates.
    pub fn set_peer_maj23(
        &mut self,
        round: Round,
        vote_type: VoteType,
        peer: PeerId,
        block_id: BlockId,
    ) -> Result<(), HeightVoteError> {
        let vote_set = match vote_type {
            VoteType::Prevote => self.prevotes_mut(round),
            VoteType::Precommit => self.precommits_mut(round),
        };

        if let Some(vote_set) = vote_set {
            vote_set.set_peer_maj23(peer, block_id)?;
        }

        Ok(())
    }

    /// The highest round at or below the current round with a prevote +2/3
    /// majority, with the majority's block id; `(Round::NIL, zero)` if none.
    pub fn pol_info(&self) -> (Round, BlockId) {
        let mut r = self.round;

        while r.is_defined() {
            if let Some(prevotes) = self.prevotes(r) {
                if let Some(block_id) = prevotes.two_thirds_majority() {
                    return (r, block_id);
                }
            }

            match r.as_i32() {
                0 => break,
                n => r = Round::new(n - 1),
            }
        }

        (Round::NIL, BlockId::zero())
    }
}
