//! Durable, append-only persistence for finalized blocks.
//!
//! One redb table holds a single logical key space with prefixed keys:
//!
//! ```text
//! H:<height>       block meta
//! P:<height>:<i>   block part i
//! C:<height>       the block's own last-commit (certifies height - 1)
//! SC:<height>      seen commit (certifies this very height)
//! BH:<hex hash>    ASCII height, the hash index
//! blockStore       the marshaled (base, height) pair
//! ```
//!
//! Every save is one write transaction, so a failed save leaves no partial
//! state visible; the singleton state key is rewritten in that same
//! transaction.

mod keys;

use std::path::Path;
use std::sync::Mutex;

use redb::{Database, ReadableTable, TableDefinition};
use thiserror::Error;
use tracing::{debug, info};

use baronbft_core_types::{Block, BlockId, BlockMeta, Commit, Hash, Height, Part, PartSet};
use baronbft_proto::{self as proto, Protobuf};

const STORE_TABLE: TableDefinition<&[u8], &[u8]> = TableDefinition::new("blockstore");

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Database(#[from] redb::DatabaseError),

    #[error(transparent)]
    Transaction(#[from] redb::TransactionError),

    #[error(transparent)]
    Table(#[from] redb::TableError),

    #[error(transparent)]
    Storage(#[from] redb::StorageError),

    #[error(transparent)]
    Commit(#[from] redb::CommitError),

    #[error("corrupted record `{key}`: {source}")]
    Corruption {
        key: String,
        source: proto::Error,
    },

    #[error("failed to encode record: {0}")]
    Encoding(proto::Error),

    #[error("block at height 0 cannot be saved")]
    ZeroHeight,

    #[error("non-contiguous save: got height {got}, expected {expected}")]
    NonContiguous { got: Height, expected: Height },

    #[error("cannot prune to {requested}: store covers [{base}, {height}]")]
    PruneBeyondHeight {
        requested: Height,
        base: Height,
        height: Height,
    },

    #[error("part {index} of block {height} is missing")]
    MissingPart { height: Height, index: u32 },
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
struct StoreState {
    base: u64,
    height: u64,
}

impl StoreState {
    fn is_empty(&self) -> bool {
        self.height == 0
    }

    fn contains(&self, height: Height) -> bool {
        let h = height.as_u64();
        !self.is_empty() && self.base <= h && h <= self.height
    }
}

/// The block store: monotonically growing, addressable by height and by
/// block hash.
///
/// Writers are serialized through the state lock; readers run concurrently
/// against redb's snapshot isolation and see either the pre-save or the
/// post-save state, never a mix.
pub struct BlockStore {
    db: Database,
    state: Mutex<StoreState>,
}

impl BlockStore {
    /// Open (or create) a block store at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let db = Database::create(path)?;

        // Make sure the table exists so reads never race its creation.
        let txn = db.begin_write()?;
        let state = {
            let table = txn.open_table(STORE_TABLE)?;
            let result = match table.get(keys::STATE_KEY)? {
                Some(guard) => decode_state(guard.value())?,
                None => StoreState::default(),
            };
            result
        };
        txn.commit()?;

        info!(base = state.base, height = state.height, "Opened block store");

        Ok(Self {
            db,
            state: Mutex::new(state),
        })
    }

    /// The lowest stored height, or 0 when empty.
    pub fn base(&self) -> Height {
        Height::new(self.lock_state().base)
    }

    /// The highest stored height, or 0 when empty.
    pub fn height(&self) -> Height {
        Height::new(self.lock_state().height)
    }

    /// Number of stored blocks.
    pub fn size(&self) -> u64 {
        let state = self.lock_state();
        if state.is_empty() {
            0
        } else {
            state.height - state.base + 1
        }
    }

    fn lock_state(&self) -> StoreState {
        *self.state.lock().expect("store state lock poisoned")
    }

    /// Atomically persist a block: its meta, every part, its last-commit,
    /// the locally seen commit over it, and the hash index entry.
    ///
    /// `parts` must be the part set of `block`; `seen_commit` is a +2/3
    /// certificate over this very block, held for gossip.
    pub fn save_block(
        &self,
        block: &Block,
        parts: &PartSet,
        seen_commit: &Commit,
    ) -> Result<(), StoreError> {
        let height = block.height();
        if height == Height::ZERO {
            return Err(StoreError::ZeroHeight);
        }

        let mut state = self.state.lock().expect("store state lock poisoned");

        if !state.is_empty() && height.as_u64() != state.height + 1 {
            return Err(StoreError::NonContiguous {
                got: height,
                expected: Height::new(state.height + 1),
            });
        }

        let h = height.as_u64();
        let block_id = BlockId::new(block.hash(), *parts.header());
        let block_size: u64 = parts.parts().iter().map(|p| p.bytes.len() as u64).sum();
        let meta = BlockMeta::new(block_id, block_size, block.header.clone(), block.data.len() as u64);

        let new_state = StoreState {
            base: if state.is_empty() { h } else { state.base },
            height: h,
        };

        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(STORE_TABLE)?;

            let meta_bytes = meta.to_bytes().map_err(StoreError::Encoding)?;
            table.insert(keys::block_meta(h).as_slice(), meta_bytes.as_slice())?;

            for part in parts.parts() {
                let part_bytes = encode_part(part);
                table.insert(
                    keys::block_part(h, part.index).as_slice(),
                    part_bytes.as_slice(),
                )?;
            }

            if let Some(last_commit) = &block.last_commit {
                let commit_bytes = last_commit.to_bytes().map_err(StoreError::Encoding)?;
                table.insert(keys::block_commit(h).as_slice(), commit_bytes.as_slice())?;
            }

            let seen_bytes = seen_commit.to_bytes().map_err(StoreError::Encoding)?;
            table.insert(keys::seen_commit(h).as_slice(), seen_bytes.as_slice())?;

            table.insert(
                keys::block_hash(&block_id.hash).as_slice(),
                h.to_string().as_bytes(),
            )?;

            let state_bytes = encode_state(new_state);
            table.insert(keys::STATE_KEY, state_bytes.as_slice())?;
        }
        txn.commit()?;

        *state = new_state;

        debug!(height = h, block_id = %block_id, "Saved block");

        Ok(())
    }

    /// The block meta at `height`, or `None` outside `[base, height]`.
    pub fn load_block_meta(&self, height: Height) -> Result<Option<BlockMeta>, StoreError> {
        if !self.lock_state().contains(height) {
            return Ok(None);
        }

        self.read_decoded::<BlockMeta>(&keys::block_meta(height.as_u64()))
    }

    /// The full block at `height`, reassembled from its parts, or `None`
    /// outside `[base, height]`.
    pub fn load_block(&self, height: Height) -> Result<Option<Block>, StoreError> {
        let Some(meta) = self.load_block_meta(height)? else {
            return Ok(None);
        };

        let h = height.as_u64();
        let total = meta.block_id.part_set_header.total;

        let txn = self.db.begin_read()?;
        let table = txn.open_table(STORE_TABLE)?;

        let mut bytes = Vec::with_capacity(meta.block_size as usize);
        for index in 0..total {
            let key = keys::block_part(h, index);
            let Some(guard) = table.get(key.as_slice())? else {
                return Err(StoreError::MissingPart { height, index });
            };

            let part = decode_part(guard.value(), &key)?;
            bytes.extend_from_slice(&part.bytes);
        }

        let block = Block::from_bytes(&bytes).map_err(|source| StoreError::Corruption {
            key: format!("P:{h}:*"),
            source,
        })?;

        Ok(Some(block))
    }

    /// The commit carried inside the block at `height` (a certificate over
    /// `height - 1`), or `None` outside range or at the chain's first block.
    pub fn load_block_commit(&self, height: Height) -> Result<Option<Commit>, StoreError> {
        if !self.lock_state().contains(height) {
            return Ok(None);
        }

        self.read_decoded::<Commit>(&keys::block_commit(height.as_u64()))
    }

    /// The locally observed +2/3 certificate over the block at `height`.
    pub fn load_seen_commit(&self, height: Height) -> Result<Option<Commit>, StoreError> {
        if !self.lock_state().contains(height) {
            return Ok(None);
        }

        self.read_decoded::<Commit>(&keys::seen_commit(height.as_u64()))
    }

    /// Look a block up by its header hash.
    pub fn load_block_by_hash(&self, hash: &Hash) -> Result<Option<Block>, StoreError> {
        let key = keys::block_hash(hash);

        let height = {
            let txn = self.db.begin_read()?;
            let table = txn.open_table(STORE_TABLE)?;

            match table.get(key.as_slice())? {
                None => return Ok(None),
                Some(guard) => parse_ascii_height(guard.value(), &key)?,
            }
        };

        self.load_block(Height::new(height))
    }

    /// Remove all blocks strictly below `retain_height`, raising the base.
    /// Idempotent; returns the number of blocks pruned.
    pub fn prune_blocks(&self, retain_height: Height) -> Result<u64, StoreError> {
        let mut state = self.state.lock().expect("store state lock poisoned");

        let retain = retain_height.as_u64();
        if state.is_empty() || retain <= state.base {
            return Ok(0);
        }

        if retain > state.height {
            return Err(StoreError::PruneBeyondHeight {
                requested: retain_height,
                base: Height::new(state.base),
                height: Height::new(state.height),
            });
        }

        let new_state = StoreState {
            base: retain,
            height: state.height,
        };

        let mut pruned = 0;

        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(STORE_TABLE)?;

            for h in state.base..retain {
                let meta_key = keys::block_meta(h);
                let meta = match table.get(meta_key.as_slice())? {
                    Some(guard) => decode_meta(guard.value(), &meta_key)?,
                    None => continue,
                };

                table.remove(meta_key.as_slice())?;
                for index in 0..meta.block_id.part_set_header.total {
                    table.remove(keys::block_part(h, index).as_slice())?;
                }
                table.remove(keys::block_commit(h).as_slice())?;
                table.remove(keys::seen_commit(h).as_slice())?;
                table.remove(keys::block_hash(&meta.block_id.hash).as_slice())?;

                pruned += 1;
            }

            let state_bytes = encode_state(new_state);
            table.insert(keys::STATE_KEY, state_bytes.as_slice())?;
        }
        txn.commit()?;

        *state = new_state;

        info!(retain = retain, pruned, "Pruned block store");

        Ok(pruned)
    }

    fn read_decoded<T: Protobuf>(&self, key: &[u8]) -> Result<Option<T>, StoreError> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(STORE_TABLE)?;

        match table.get(key)? {
            None => Ok(None),
            Some(guard) => T::from_bytes(guard.value())
                .map(Some)
                .map_err(|source| StoreError::Corruption {
                    key: String::from_utf8_lossy(key).into_owned(),
                    source,
                }),
        }
    }
}

fn encode_state(state: StoreState) -> Vec<u8> {
    use baronbft_proto::prost::Message;

    proto::BlockStoreState {
        base: state.base,
        height: state.height,
    }
    .encode_to_vec()
}

fn encode_part(part: &Part) -> Vec<u8> {
    use baronbft_proto::prost::Message;

    proto::Part {
        index: part.index,
        bytes: part.bytes.clone(),
    }
    .encode_to_vec()
}

fn decode_part(bytes: &[u8], key: &[u8]) -> Result<Part, StoreError> {
    use baronbft_proto::prost::Message;

    let part = proto::Part::decode(bytes).map_err(|e| StoreError::Corruption {
        key: String::from_utf8_lossy(key).into_owned(),
        source: e.into(),
    })?;

    Ok(Part {
        index: part.index,
        bytes: part.bytes,
    })
}

fn decode_meta(bytes: &[u8], key: &[u8]) -> Result<BlockMeta, StoreError> {
    BlockMeta::from_bytes(bytes).map_err(|source| StoreError::Corruption {
        key: String::from_utf8_lossy(key).into_owned(),
        source,
    })
}

fn parse_ascii_height(bytes: &[u8], key: &[u8]) -> Result<u64, StoreError> {
    std::str::from_utf8(bytes)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| StoreError::Corruption {
            key: String::from_utf8_lossy(key).into_owned(),
            source: proto::Error::Other("hash index entry is not an ASCII height".to_string()),
        })
}

fn decode_state(bytes: &[u8]) -> Result<StoreState, StoreError> {
    use baronbft_proto::prost::Message;

    let decoded =
        proto::BlockStoreState::decode(bytes).map_err(|e| StoreError::Corruption {
            key: "blockStore".to_string(),
            source: e.into(),
        })?;

    Ok(StoreState {
        base: decoded.base,
        height: decoded.height,
    })
}
