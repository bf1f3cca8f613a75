//! Deterministic fixtures shared by the workspace's tests: seeded validator
//! sets, signed-vote builders, and a chain builder producing blocks whose
//! commits verify against their validator set.

use baronbft_core_types::{
    merkle_root, Address, Block, BlockId, Commit, CommitSig, Hash, Header, Height, PartSetHeader,
    PrivateKey, Round, Signature, Timestamp, Transaction, ValidatorSet, Validator, Vote, VoteType,
};

/// The chain id used across the test suite.
pub const CHAIN_ID: &str = "baron-chain";

/// A fixed epoch all test timestamps derive from, so signatures are
/// reproducible across runs.
const TIME_BASE: i64 = 1_700_000_000;

pub fn test_timestamp(offset: u64) -> Timestamp {
    Timestamp::from_unix_parts(TIME_BASE + offset as i64, 0)
        .expect("test timestamp in range")
}

/// Build a validator set with the given powers.
///
/// Keys are derived from fixed seeds, and the returned keys are aligned
/// with the *sorted* validator-set order, so `keys[i]` signs for the
/// validator at index `i`.
pub fn make_validators(powers: &[u64]) -> (ValidatorSet, Vec<PrivateKey>) {
    let keyed: Vec<(PrivateKey, Validator)> = powers
        .iter()
        .enumerate()
        .map(|(i, &power)| {
            let key = PrivateKey::from_bytes([i as u8 + 1; 32]);
            let validator = Validator::new(key.public_key(), power);
            (key, validator)
        })
        .collect();

    let set = ValidatorSet::new(keyed.iter().map(|(_, v)| v.clone()));

    let keys = set
        .validators()
        .iter()
        .map(|v| {
            keyed
                .iter()
                .find(|(_, candidate)| candidate.address == v.address)
                .map(|(key, _)| key.clone())
                .expect("every validator has a key")
        })
        .collect();

    (set, keys)
}

/// A deterministic non-zero block id derived from a seed.
pub fn make_block_id(seed: &[u8]) -> BlockId {
    BlockId::new(
        Hash::sha3_of(seed),
        PartSetHeader::new(1, Hash::sha3_of([seed, &b"-parts"[..]].concat())),
    )
}

/// Build and sign a vote from the validator at `index`.
pub fn sign_vote(
    key: &PrivateKey,
    vote_type: VoteType,
    height: Height,
    round: Round,
    block_id: BlockId,
    index: u32,
) -> Vote {
    let mut vote = Vote {
        vote_type,
        height,
        round,
        block_id,
        timestamp: test_timestamp(height.as_u64()),
        validator_address: Address::from_public_key(&key.public_key()),
        validator_index: index,
        signature: Signature::zero(),
    };

    let sign_bytes = vote
        .sign_bytes(CHAIN_ID)
        .expect("vote sign bytes are encodable");
    vote.signature = key.sign(&sign_bytes);
    vote
}

/// Build a +2/3 commit over `block_id` signed by every validator whose
/// index appears in `signers`.
pub fn make_commit(
    height: Height,
    round: Round,
    block_id: BlockId,
    set: &ValidatorSet,
    keys: &[PrivateKey],
    signers: &[u32],
) -> Commit {
    let signatures = (0..set.len() as u32)
        .map(|index| {
            if !signers.contains(&index) {
                return CommitSig::Absent;
            }

            let vote = sign_vote(
                &keys[index as usize],
                VoteType::Precommit,
                height,
                round,
                block_id,
                index,
            );

            CommitSig::Commit {
                validator_address: vote.validator_address,
                timestamp: vote.timestamp,
                signature: vote.signature,
            }
        })
        .collect();

    Commit {
        height,
        round,
        block_id,
        signatures,
    }
}

/// A deterministic chain of valid blocks with the certificates that
/// finalize them.
///
/// Block `h`'s certificate travels inside block `h + 1` as its last-commit;
/// `seen_commit(h)` exposes it directly for saving the chain tip.
pub struct TestChain {
    pub validator_set: ValidatorSet,
    pub keys: Vec<PrivateKey>,
    blocks: Vec<Block>,
    commits: Vec<Commit>,
}

impl TestChain {
    /// Build `length` blocks signed by `powers.len()` validators.
    pub fn build(length: u64, powers: &[u64]) -> Self {
        let (validator_set, keys) = make_validators(powers);
        let all_signers: Vec<u32> = (0..validator_set.len() as u32).collect();

        let mut blocks: Vec<Block> = Vec::with_capacity(length as usize);
        let mut commits: Vec<Commit> = Vec::with_capacity(length as usize);

        let mut last_block_id = BlockId::zero();
        let mut last_commit: Option<Commit> = None;

        for h in 1..=length {
            let height = Height::new(h);
            let data = vec![Transaction::new(format!("tx-{h}").into_bytes())];

            let last_commit_hash = match &last_commit {
                Some(commit) => commit.hash(),
                None => merkle_root::<Vec<u8>>(&[]),
            };

            let header = Header {
                chain_id: CHAIN_ID.to_string(),
                height,
                time: test_timestamp(h),
                last_block_id,
                last_commit_hash,
                data_hash: merkle_root(&data),
                validators_hash: validator_set.hash(),
                next_validators_hash: validator_set.hash(),
                app_hash: Hash::sha3_of(format!("app-{h}")),
                last_results_hash: merkle_root::<Vec<u8>>(&[]),
                evidence_hash: merkle_root::<Vec<u8>>(&[]),
                proposer_address: validator_set.validators()[0].address,
            };

            let block = Block {
                header,
                data,
                evidence: vec![],
                last_commit: last_commit.take(),
            };

            let block_id = block.block_id().expect("block is encodable");
            let commit = make_commit(
                height,
                Round::ZERO,
                block_id,
                &validator_set,
                &keys,
                &all_signers,
            );

            last_block_id = block_id;
            last_commit = Some(commit.clone());

            blocks.push(block);
            commits.push(commit);
        }

        Self {
            validator_set,
            keys,
            blocks,
            commits,
        }
    }

    pub fn len(&self) -> u64 {
        self.blocks.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// The block at `height` (1-based).
    pub fn block(&self, height: u64) -> &Block {
        &self.blocks[height as usize - 1]
    }

    /// The +2/3 certificate over the block at `height`.
    pub fn seen_commit(&self, height: u64) -> &Commit {
        &self.commits[height as usize - 1]
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_blocks_validate() {
        let chain = TestChain::build(3, &[1, 1, 1, 1]);

        for block in chain.blocks() {
            block.validate_basic(CHAIN_ID).expect("block is valid");
        }
    }

    #[test]
    fn chain_commits_verify() {
        let chain = TestChain::build(3, &[1, 1, 1, 1]);

        for h in 1..=3 {
            let block = chain.block(h);
            let block_id = block.block_id().unwrap();

            chain
                .validator_set
                .verify_commit_light(CHAIN_ID, &block_id, Height::new(h), chain.seen_commit(h))
                .expect("commit verifies");
        }
    }

    #[test]
    fn keys_align_with_sorted_validators() {
        let (set, keys) = make_validators(&[5, 10, 1]);

        for (i, validator) in set.validators().iter().enumerate() {
            let derived = Address::from_public_key(&keys[i].public_key());
            assert_eq!(derived, validator.address);
        }
    }
}
