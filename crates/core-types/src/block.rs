use core::fmt;

use thiserror::Error;

use baronbft_proto::{self as proto, Protobuf};

use crate::block_id::BlockIdError;
use crate::commit::CommitError;
use crate::proto::{block_id_to_proto, timestamp_to_proto};
use crate::{
    merkle_root, Address, BlockId, Commit, Hash, Height, PartSet, Timestamp, Transaction,
    DEFAULT_PART_SIZE,
};

/// A block header: everything needed to chain, verify, and index the block
/// without its transactions.
#[derive(Clone, Debug, PartialEq)]
pub struct Header {
    pub chain_id: String,
    pub height: Height,
    pub time: Timestamp,
    /// Id of the previous block; zero only at height 1.
    pub last_block_id: BlockId,
    pub last_commit_hash: Hash,
    pub data_hash: Hash,
    pub validators_hash: Hash,
    pub next_validators_hash: Hash,
    pub app_hash: Hash,
    pub last_results_hash: Hash,
    pub evidence_hash: Hash,
    pub proposer_address: Address,
}

impl Header {
    /// The block hash: a Merkle root over the encoded header fields.
    pub fn hash(&self) -> Hash {
        use baronbft_proto::prost::Message;

        let fields: Vec<Vec<u8>> = vec![
            self.chain_id.as_bytes().to_vec(),
            self.height.as_u64().to_be_bytes().to_vec(),
            timestamp_to_proto(&self.time).encode_to_vec(),
            block_id_to_proto(&self.last_block_id).encode_to_vec(),
            self.last_commit_hash.to_vec(),
            self.data_hash.to_vec(),
            self.validators_hash.to_vec(),
            self.next_validators_hash.to_vec(),
            self.app_hash.to_vec(),
            self.last_results_hash.to_vec(),
            self.evidence_hash.to_vec(),
            self.proposer_address.to_vec(),
        ];

        merkle_root(&fields)
    }
}

impl fmt::Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Header{{{} #{} @ {}}}", self.chain_id, self.height, self.time)
    }
}

#[derive(Debug, Error)]
pub enum BlockError {
    #[error("block is for chain `{got}`, expected `{expected}`")]
    ChainIdMismatch { got: String, expected: String },

    #[error("block height must be at least 1, got {0}")]
    InvalidHeight(Height),

    #[error("data hash {got} does not match transactions root {expected}")]
    DataHashMismatch { got: Hash, expected: Hash },

    #[error("last commit hash {got} does not match last commit {expected}")]
    LastCommitHashMismatch { got: Hash, expected: Hash },

    #[error("block at height {0} has no last commit")]
    MissingLastCommit(Height),

    #[error("block at height 1 must not carry a last commit")]
    UnexpectedLastCommit,

    #[error("last commit is for height {got}, expected {expected}")]
    LastCommitHeightMismatch { got: Height, expected: Height },

    #[error("invalid last commit: {0}")]
    InvalidLastCommit(#[from] CommitError),

    #[error("invalid last block id: {0}")]
    InvalidLastBlockId(#[from] BlockIdError),

    #[error("failed to encode block: {0}")]
    Encoding(#[from] proto::Error),
}

/// The unit of replicated state transition.
#[derive(Clone, Debug, PartialEq)]
pub struct Block {
    pub header: Header,
    pub data: Vec<Transaction>,
    /// Opaque evidence records; consumed by the (external) evidence pool.
    pub evidence: Vec<Vec<u8>>,
    /// The +2/3 certificate over the previous block. `None` only at height 1.
    pub last_commit: Option<Commit>,
}

impl Block {
    pub fn height(&self) -> Height {
        self.header.height
    }

    pub fn hash(&self) -> Hash {
        self.header.hash()
    }

    /// Root over the transaction bytes, as committed by `header.data_hash`.
    pub fn data_hash(&self) -> Hash {
        merkle_root(&self.data)
    }

    /// Hash of the carried last commit; the empty-commit root at height 1.
    pub fn last_commit_hash(&self) -> Hash {
        match &self.last_commit {
            Some(commit) => commit.hash(),
            None => merkle_root::<Vec<u8>>(&[]),
        }
    }

    /// Structural validation: internal hashes line up and the last commit
    /// matches the chained height. Does not verify commit signatures; that
    /// requires the validator set.
    pub fn validate_basic(&self, chain_id: &str) -> Result<(), BlockError> {
        if self.header.chain_id != chain_id {
            return Err(BlockError::ChainIdMismatch {
                got: self.header.chain_id.clone(),
                expected: chain_id.to_string(),
            });
        }

        let height = self.header.height;
        if height < Height::new(1) {
            return Err(BlockError::InvalidHeight(height));
        }

        self.header.last_block_id.validate_basic()?;

        let expected_data = self.data_hash();
        if self.header.data_hash != expected_data {
            return Err(BlockError::DataHashMismatch {
                got: self.header.data_hash,
                expected: expected_data,
            });
        }

        match &self.last_commit {
            None => {
                if height > Height::new(1) {
                    return Err(BlockError::MissingLastCommit(height));
                }
            }
            Some(commit) => {
                if height == Height::new(1) {
                    return Err(BlockError::UnexpectedLastCommit);
                }

                commit.validate_basic()?;

                let expected = height.decrement().unwrap_or(Height::ZERO);
                if commit.height != expected {
                    return Err(BlockError::LastCommitHeightMismatch {
                        got: commit.height,
                        expected,
                    });
                }
            }
        }

        let expected_commit_hash = self.last_commit_hash();
        if self.header.last_commit_hash != expected_commit_hash {
            return Err(BlockError::LastCommitHashMismatch {
                got: self.header.last_commit_hash,
                expected: expected_commit_hash,
            });
        }

        Ok(())
    }

    /// Serialize and split into gossip parts.
    pub fn make_part_set(&self) -> Result<PartSet, proto::Error> {
        let bytes = self.to_bytes()?;
        Ok(PartSet::from_bytes(&bytes, DEFAULT_PART_SIZE))
    }

    /// The id of this block: header hash plus part-set header.
    pub fn block_id(&self) -> Result<BlockId, proto::Error> {
        let parts = self.make_part_set()?;
        Ok(BlockId::new(self.hash(), *parts.header()))
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Block{{#{} {} txs, hash {}}}",
            self.header.height,
            self.data.len(),
            self.hash()
        )
    }
}

/// Per-height metadata kept by the block store, servable without
/// reassembling the block from its parts.
#[derive(Clone, Debug, PartialEq)]
pub struct BlockMeta {
    pub block_id: BlockId,
    pub block_size: u64,
    pub header: Header,
    pub num_txs: u64,
}

impl BlockMeta {
    pub fn new(block_id: BlockId, block_size: u64, header: Header, num_txs: u64) -> Self {
        Self {
            block_id,
            block_size,
            header,
            num_txs,
        }
    }
}
