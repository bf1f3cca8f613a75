use std::sync::Arc;

use baronbft_core_types::{BlockId, Height, PeerId, Round, VoteType};
use baronbft_votekeeper::{MakeCommitError, VoteSet, VoteSetError};

use baronbft_test::{make_block_id, make_validators, sign_vote, CHAIN_ID};

fn precommit_set(powers: &[u64]) -> (VoteSet, Vec<baronbft_core_types::PrivateKey>) {
    let (validators, keys) = make_validators(powers);
    let set = VoteSet::new(
        CHAIN_ID,
        Height::new(2),
        Round::ZERO,
        VoteType::Precommit,
        Arc::new(validators),
    );
    (set, keys)
}

#[test]
fn conflicting_vote_is_surfaced_and_retained() {
    let (validators, keys) = make_validators(&[1, 1, 1, 1]);
    let mut set = VoteSet::new(
        CHAIN_ID,
        Height::new(1),
        Round::ZERO,
        VoteType::Prevote,
        Arc::new(validators),
    );

    let block_a = make_block_id(b"block-a");
    let block_b = make_block_id(b"block-b");

    let first = sign_vote(
        &keys[0],
        VoteType::Prevote,
        Height::new(1),
        Round::ZERO,
        block_a,
        0,
    );
    assert!(set.add_vote(first.clone()).unwrap());

    let second = sign_vote(
        &keys[0],
        VoteType::Prevote,
        Height::new(1),
        Round::ZERO,
        block_b,
        0,
    );

    let err = set.add_vote(second.clone()).unwrap_err();
    let VoteSetError::ConflictingVote(conflict) = err else {
        panic!("expected conflicting vote error, got {err}");
    };

    assert_eq!(conflict.existing, first);
    assert_eq!(conflict.conflicting, second);

    // Both votes are exposed when queried by validator index.
    let votes = set.votes_by_index(0);
    assert!(votes.contains(&first));
    assert!(votes.contains(&second));

    // The original keeps its place in the tally.
    assert_eq!(set.get_by_index(0), Some(&first));
    assert!(!set.evidence().is_empty());
}

#[test]
fn seven_of_ten_reach_majority_and_make_commit() {
    let (mut set, keys) = precommit_set(&[1; 10]);
    let block_x = make_block_id(b"block-x");

    for index in 0..7u32 {
        // No majority until the 7th vote lands.
        assert!(set.two_thirds_majority().is_none());

        let vote = sign_vote(
            &keys[index as usize],
            VoteType::Precommit,
            Height::new(2),
            Round::ZERO,
            block_x,
            index,
        );
        assert!(set.add_vote(vote).unwrap());
    }

    // 7 of 10 is strictly more than 2/3.
    assert_eq!(set.two_thirds_majority(), Some(block_x));

    let commit = set.make_commit().unwrap();
    assert_eq!(commit.height, Height::new(2));
    assert_eq!(commit.block_id, block_x);
    assert_eq!(commit.signatures.len(), 10);

    let committed = commit.signatures.iter().filter(|s| s.is_commit()).count();
    let absent = commit.signatures.iter().filter(|s| s.is_absent()).count();
    assert_eq!(committed, 7);
    assert_eq!(absent, 3);
}

#[test]
fn six_of_ten_is_not_a_majority() {
    let (mut set, keys) = precommit_set(&[1; 10]);
    let block_x = make_block_id(b"block-x");

    for index in 0..6u32 {
        let vote = sign_vote(
            &keys[index as usize],
            VoteType::Precommit,
            Height::new(2),
            Round::ZERO,
            block_x,
            index,
        );
        set.add_vote(vote).unwrap();
    }

    assert_eq!(set.two_thirds_majority(), None);
    assert!(matches!(
        set.make_commit(),
        Err(MakeCommitError::NoMajority)
    ));
}

#[test]
fn majority_is_final_once_reached() {
    let (mut set, keys) = precommit_set(&[1; 10]);
    let block_x = make_block_id(b"block-x");
    let block_y = make_block_id(b"block-y");

    for index in 0..7u32 {
        let vote = sign_vote(
            &keys[index as usize],
            VoteType::Precommit,
            Height::new(2),
            Round::ZERO,
            block_x,
            index,
        );
        set.add_vote(vote).unwrap();
    }

    assert_eq!(set.two_thirds_majority(), Some(block_x));

    // Late votes for another block raise tallies but cannot change the
    // winner.
    for index in 7..10u32 {
        let vote = sign_vote(
            &keys[index as usize],
            VoteType::Precommit,
            Height::new(2),
            Round::ZERO,
            block_y,
            index,
        );
        set.add_vote(vote).unwrap();
    }

    assert_eq!(set.two_thirds_majority(), Some(block_x));
}

#[test]
fn nil_votes_tally_separately_from_blocks() {
    let (mut set, keys) = precommit_set(&[1, 1, 1, 1]);

    for index in 0..3u32 {
        let vote = sign_vote(
            &keys[index as usize],
            VoteType::Precommit,
            Height::new(2),
            Round::ZERO,
            BlockId::zero(),
            index,
        );
        set.add_vote(vote).unwrap();
    }

    // 3 of 4 nil precommits: a nil majority.
    assert_eq!(set.two_thirds_majority(), Some(BlockId::zero()));
    assert!(set.has_two_thirds_any());
}

#[test]
fn two_thirds_any_counts_split_votes() {
    let (mut set, keys) = precommit_set(&[1, 1, 1, 1]);

    let ids = [
        make_block_id(b"a"),
        make_block_id(b"b"),
        make_block_id(b"c"),
    ];

    for (index, id) in ids.iter().enumerate() {
        let vote = sign_vote(
            &keys[index],
            VoteType::Precommit,
            Height::new(2),
            Round::ZERO,
            *id,
            index as u32,
        );
        set.add_vote(vote).unwrap();
    }

    // 3 of 4 voted, but for three different blocks.
    assert!(set.has_two_thirds_any());
    assert_eq!(set.two_thirds_majority(), None);
}

#[test]
fn rejects_mismatched_and_forged_votes() {
    let (mut set, keys) = precommit_set(&[1, 1, 1, 1]);
    let block = make_block_id(b"block");

    // Wrong height.
    let vote = sign_vote(
        &keys[0],
        VoteType::Precommit,
        Height::new(3),
        Round::ZERO,
        block,
        0,
    );
    assert!(matches!(
        set.add_vote(vote),
        Err(VoteSetError::HeightMismatch { .. })
    ));

    // Wrong type.
    let vote = sign_vote(
        &keys[0],
        VoteType::Prevote,
        Height::new(2),
        Round::ZERO,
        block,
        0,
    );
    assert!(matches!(
        set.add_vote(vote),
        Err(VoteSetError::TypeMismatch { .. })
    ));

    // Index out of range.
    let vote = sign_vote(
        &keys[0],
        VoteType::Precommit,
        Height::new(2),
        Round::ZERO,
        block,
        9,
    );
    assert!(matches!(
        set.add_vote(vote),
        Err(VoteSetError::IndexOutOfRange { .. })
    ));

    // Signed by the wrong key for the claimed index.
    let mut vote = sign_vote(
        &keys[1],
        VoteType::Precommit,
        Height::new(2),
        Round::ZERO,
        block,
        1,
    );
    vote.validator_index = 0;
    vote.validator_address = baronbft_core_types::Address::from_public_key(&keys[0].public_key());
    assert!(matches!(
        set.add_vote(vote),
        Err(VoteSetError::InvalidSignature { .. })
    ));

    // Exact duplicate is not an error, just not added again.
    let vote = sign_vote(
        &keys[0],
        VoteType::Precommit,
        Height::new(2),
        Round::ZERO,
        block,
        0,
    );
    assert!(set.add_vote(vote.clone()).unwrap());
    assert!(!set.add_vote(vote).unwrap());
}

#[test]
fn peer_maj23_claims_are_single_shot() {
    let (mut set, _keys) = precommit_set(&[1, 1, 1, 1]);
    let peer = PeerId::new("peer-1");

    let block_a = make_block_id(b"a");
    let block_b = make_block_id(b"b");

    set.set_peer_maj23(peer.clone(), block_a).unwrap();

    // Same claim again is fine.
    set.set_peer_maj23(peer.clone(), block_a).unwrap();

    // A different claim from the same peer is not.
    assert!(matches!(
        set.set_peer_maj23(peer, block_b),
        Err(VoteSetError::ConflictingPeerClaim { .. })
    ));
}
