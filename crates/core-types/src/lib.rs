//! Core data types for the baronbft replication engine.
//!
//! Everything consensus-critical lives here: heights, rounds, hashes,
//! addresses, votes and their canonical sign-bytes, commits, blocks and
//! part-sets, and validator sets with commit verification.

mod address;
mod block;
mod block_id;
mod commit;
mod hash;
mod height;
mod merkle;
mod part_set;
mod peer_id;
mod proposal;
mod proto;
mod round;
mod signing;
mod timestamp;
mod transaction;
mod validator_set;
mod vote;

pub use address::{Address, InvalidAddressLength};
pub use block::{Block, BlockError, BlockMeta, Header};
pub use block_id::{BlockId, BlockIdError, PartSetHeader};
pub use commit::{BlockIdFlag, Commit, CommitError, CommitSig};
pub use hash::{Hash, InvalidHashLength};
pub use height::Height;
pub use merkle::merkle_root;
pub use part_set::{Part, PartSet, DEFAULT_PART_SIZE};
pub use peer_id::PeerId;
pub use proposal::Proposal;
pub use round::Round;
pub use signing::{PrivateKey, PublicKey, Signature, SigningError};
pub use timestamp::{Timestamp, TimestampError};
pub use transaction::Transaction;
pub use validator_set::{Validator, ValidatorSet, VerifyCommitError, VotingPower};
pub use vote::{Vote, VoteError, VoteType};
