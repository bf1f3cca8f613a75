//! A block's serialization split into fixed-size chunks for gossip.

use crate::{merkle_root, Hash, PartSetHeader};

/// Size of a block part in bytes.
pub const DEFAULT_PART_SIZE: usize = 65536;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Part {
    pub index: u32,
    pub bytes: Vec<u8>,
}

/// The complete set of parts of one block, together with the header
/// committing to them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PartSet {
    header: PartSetHeader,
    parts: Vec<Part>,
}

impl PartSet {
    /// Split serialized block bytes into parts of at most `part_size` bytes.
    ///
    /// An empty input yields a single empty part so that every block has at
    /// least one part and a non-zero header.
    pub fn from_bytes(data: &[u8], part_size: usize) -> Self {
        assert!(part_size > 0, "part size must be positive");

        let chunks: Vec<Vec<u8>> = if data.is_empty() {
            vec![Vec::new()]
        } else {
            data.chunks(part_size).map(<[u8]>::to_vec).collect()
        };

        let hash = merkle_root(&chunks);
        let total = chunks.len() as u32;

        let parts = chunks
            .into_iter()
            .enumerate()
            .map(|(index, bytes)| Part {
                index: index as u32,
                bytes,
            })
            .collect();

        Self {
            header: PartSetHeader::new(total, hash),
            parts,
        }
    }

    pub fn header(&self) -> &PartSetHeader {
        &self.header
    }

    pub fn total(&self) -> u32 {
        self.header.total
    }

    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    pub fn part(&self, index: u32) -> Option<&Part> {
        self.parts.get(index as usize)
    }

    /// Concatenate part bytes back into the serialized block.
    pub fn join(&self) -> Vec<u8> {
        let len = self.parts.iter().map(|p| p.bytes.len()).sum();
        let mut data = Vec::with_capacity(len);
        for part in &self.parts {
            data.extend_from_slice(&part.bytes);
        }
        data
    }

    /// Recompute the Merkle root over the given part bytes, e.g. when
    /// reassembling a part set received piecewise.
    pub fn hash_parts(parts: &[Vec<u8>]) -> Hash {
        merkle_root(parts)
    }
}
