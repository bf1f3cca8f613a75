use core::fmt;

use thiserror::Error;

use crate::Hash;

/// Identifies a block's part-set: how many parts, and the Merkle root over
/// their bytes.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PartSetHeader {
    pub total: u32,
    pub hash: Hash,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BlockIdError {
    #[error("part set header has {total} parts but no hash")]
    PartsWithoutHash { total: u32 },

    #[error("part set header has a hash but zero parts")]
    HashWithoutParts,

    #[error("block id has a part set header but no block hash")]
    PartsWithoutBlockHash,
}

impl PartSetHeader {
    pub const fn new(total: u32, hash: Hash) -> Self {
        Self { total, hash }
    }

    pub const fn zero() -> Self {
        Self {
            total: 0,
            hash: Hash::None,
        }
    }

    pub const fn is_zero(&self) -> bool {
        self.total == 0 && self.hash.is_none()
    }

    pub fn validate_basic(&self) -> Result<(), BlockIdError> {
        match (self.total, self.hash) {
            (0, Hash::None) => Ok(()),
            (0, _) => Err(BlockIdError::HashWithoutParts),
            (total, Hash::None) => Err(BlockIdError::PartsWithoutHash { total }),
            (_, _) => Ok(()),
        }
    }
}

impl fmt::Display for PartSetHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.total, self.hash)
    }
}

/// Identifies a block by its header hash and its part-set header.
///
/// The zero block id (absent hash, zero part-set header) is the nil vote
/// marker and is distinguishable from the id of any real block.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockId {
    pub hash: Hash,
    pub part_set_header: PartSetHeader,
}

impl BlockId {
    pub const fn new(hash: Hash, part_set_header: PartSetHeader) -> Self {
        Self {
            hash,
            part_set_header,
        }
    }

    pub const fn zero() -> Self {
        Self {
            hash: Hash::None,
            part_set_header: PartSetHeader::zero(),
        }
    }

    pub const fn is_zero(&self) -> bool {
        self.hash.is_none() && self.part_set_header.is_zero()
    }

    pub fn validate_basic(&self) -> Result<(), BlockIdError> {
        self.part_set_header.validate_basic()?;

        if self.hash.is_none() && !self.part_set_header.is_zero() {
            return Err(BlockIdError::PartsWithoutBlockHash);
        }

        Ok(())
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.hash, self.part_set_header)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_block_id_is_distinct() {
        let zero = BlockId::zero();
        assert!(zero.is_zero());

        let real = BlockId::new(
            Hash::sha3_of(b"block"),
            PartSetHeader::new(1, Hash::sha3_of(b"parts")),
        );
        assert!(!real.is_zero());
        assert_ne!(zero, real);
    }

    #[test]
    fn validate_rejects_lopsided_part_set_header() {
        let header = PartSetHeader::new(3, Hash::None);
        assert_eq!(
            header.validate_basic(),
            Err(BlockIdError::PartsWithoutHash { total: 3 })
        );

        let header = PartSetHeader::new(0, Hash::sha3_of(b"x"));
        assert_eq!(
            header.validate_basic(),
            Err(BlockIdError::HashWithoutParts)
        );
    }
}
