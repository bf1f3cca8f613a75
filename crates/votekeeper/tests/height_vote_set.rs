use std::sync::Arc;

use baronbft_core_types::{BlockId, Height, PeerId, Round, VoteType};
use baronbft_votekeeper::{HeightVoteError, HeightVoteSet};

use baronbft_test::{make_block_id, make_validators, sign_vote, CHAIN_ID};

fn height_vote_set(powers: &[u64]) -> (HeightVoteSet, Vec<baronbft_core_types::PrivateKey>) {
    let (validators, keys) = make_validators(powers);
    let hvs = HeightVoteSet::new(CHAIN_ID, Height::new(1), Arc::new(validators));
    (hvs, keys)
}

#[test]
fn dispatches_by_round_and_type() {
    let (mut hvs, keys) = height_vote_set(&[1, 1, 1, 1]);
    let block = make_block_id(b"block");

    let prevote = sign_vote(
        &keys[0],
        VoteType::Prevote,
        Height::new(1),
        Round::ZERO,
        block,
        0,
    );
    let precommit = sign_vote(
        &keys[1],
        VoteType::Precommit,
        Height::new(1),
        Round::ZERO,
        block,
        1,
    );

    assert!(hvs.add_vote(prevote, None).unwrap());
    assert!(hvs.add_vote(precommit, None).unwrap());

    assert!(hvs.prevotes(Round::ZERO).unwrap().get_by_index(0).is_some());
    assert!(hvs.precommits(Round::ZERO).unwrap().get_by_index(1).is_some());
}

#[test]
fn set_round_allocates_up_to_round() {
    let (mut hvs, _) = height_vote_set(&[1, 1, 1, 1]);

    hvs.set_round(Round::new(3));

    for r in 0..=3 {
        assert!(hvs.prevotes(Round::new(r)).is_some());
        assert!(hvs.precommits(Round::new(r)).is_some());
    }

    assert!(hvs.prevotes(Round::new(4)).is_none());
}

#[test]
#[should_panic(expected = "lower than current round")]
fn set_round_cannot_go_backwards() {
    let (mut hvs, _) = height_vote_set(&[1, 1, 1, 1]);

    hvs.set_round(Round::new(2));
    hvs.set_round(Round::new(1));
}

#[test]
fn peer_future_round_allocation_is_bounded() {
    let (mut hvs, keys) = height_vote_set(&[1, 1, 1, 1]);
    let peer = PeerId::new("peer-1");
    let block = make_block_id(b"block");

    // Two catch-up rounds per peer are allowed.
    for (index, round) in [(0u32, 5), (1u32, 7)] {
        let vote = sign_vote(
            &keys[index as usize],
            VoteType::Prevote,
            Height::new(1),
            Round::new(round),
            block,
            index,
        );
        assert!(hvs.add_vote(vote, Some(&peer)).unwrap());
    }

    // The third future round from the same peer is refused.
    let vote = sign_vote(
        &keys[2],
        VoteType::Prevote,
        Height::new(1),
        Round::new(9),
        block,
        2,
    );
    assert!(matches!(
        hvs.add_vote(vote, Some(&peer)),
        Err(HeightVoteError::UnwantedRound { .. })
    ));

    // But a vote for an already-allocated round still lands.
    let vote = sign_vote(
        &keys[2],
        VoteType::Prevote,
        Height::new(1),
        Round::new(5),
        block,
        2,
    );
    assert!(hvs.add_vote(vote, Some(&peer)).unwrap());

    // And another peer has its own allowance.
    let other = PeerId::new("peer-2");
    let vote = sign_vote(
        &keys[3],
        VoteType::Prevote,
        Height::new(1),
        Round::new(9),
        block,
        3,
    );
    assert!(hvs.add_vote(vote, Some(&other)).unwrap());
}

#[test]
fn pol_info_finds_highest_prevote_majority() {
    let (mut hvs, keys) = height_vote_set(&[1, 1, 1, 1]);
    let block = make_block_id(b"polka");

    // No POL yet.
    assert_eq!(hvs.pol_info(), (Round::NIL, BlockId::zero()));

    hvs.set_round(Round::new(2));

    // 3 of 4 prevote the block at round 1.
    for index in 0..3u32 {
        let vote = sign_vote(
            &keys[index as usize],
            VoteType::Prevote,
            Height::new(1),
            Round::new(1),
            block,
            index,
        );
        hvs.add_vote(vote, None).unwrap();
    }

    assert_eq!(hvs.pol_info(), (Round::new(1), block));
}
