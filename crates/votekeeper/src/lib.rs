//! Vote aggregation for the baronbft engine.
//!
//! A [`VoteSet`] tallies signed votes for one (height, round, vote type) and
//! detects +2/3 majorities, conflicting votes, and peer-claimed majorities.
//! A [`HeightVoteSet`] owns the vote sets of every round of one height and
//! bounds how far ahead peers can force round allocation.

mod bit_array;
mod evidence;
mod height_vote_set;
mod vote_set;

pub use bit_array::BitArray;
pub use evidence::{DoubleVote, EvidenceMap};
pub use height_vote_set::{HeightVoteError, HeightVoteSet};
pub use vote_set::{MakeCommitError, VoteConflict, VoteSet, VoteSetError};

use baronbft_core_types::VotingPower;

/// Whether `value` is a strict +2/3 super-majority of `total`.
pub fn is_quorum(value: VotingPower, total: VotingPower) -> bool {
    3 * value > 2 * total
}
