//! Merkle root over a list of byte slices (RFC 6962 shape, SHA3-256).
//!
//! Leaves are domain-separated from inner nodes so a leaf can never be
//! reinterpreted as an inner node.

use sha3::{Digest, Sha3_256};

use crate::Hash;

const LEAF_PREFIX: u8 = 0x00;
const INNER_PREFIX: u8 = 0x01;

/// Compute the Merkle root of the given items.
///
/// The empty list hashes to the digest of the empty string.
pub fn merkle_root<T: AsRef<[u8]>>(items: &[T]) -> Hash {
    match items.len() {
        0 => Hash::sha3_of([]),
        1 => leaf_hash(items[0].as_ref()),
        n => {
            // Largest power of two strictly smaller than n.
            let split = n.next_power_of_two() / 2;
            let left = merkle_root(&items[..split]);
            let right = merkle_root(&items[split..]);
            inner_hash(&left, &right)
        }
    }
}

fn leaf_hash(leaf: &[u8]) -> Hash {
    let mut hasher = Sha3_256::new();
    hasher.update([LEAF_PREFIX]);
    hasher.update(leaf);
    digest_to_hash(hasher)
}

fn inner_hash(left: &Hash, right: &Hash) -> Hash {
    let mut hasher = Sha3_256::new();
    hasher.update([INNER_PREFIX]);
    hasher.update(left.as_bytes());
    hasher.update(right.as_bytes());
    digest_to_hash(hasher)
}

fn digest_to_hash(hasher: Sha3_256) -> Hash {
    let digest = hasher.finalize();
    let mut hash = [0; Hash::LENGTH];
    hash.copy_from_slice(&digest);
    Hash::Sha3(hash)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_list_has_a_root() {
        assert!(merkle_root::<&[u8]>(&[]).is_some());
    }

    #[test]
    fn single_leaf_is_leaf_hash() {
        let root = merkle_root(&[b"tx".as_slice()]);
        assert_eq!(root, leaf_hash(b"tx"));
    }

    #[test]
    fn root_depends_on_order() {
        let ab = merkle_root(&[b"a".as_slice(), b"b".as_slice()]);
        let ba = merkle_root(&[b"b".as_slice(), b"a".as_slice()]);
        assert_ne!(ab, ba);
    }

    #[test]
    fn leaf_cannot_pose_as_inner_node() {
        let leaf = leaf_hash(b"x");
        let inner = inner_hash(&leaf, &leaf);
        assert_ne!(leaf, inner);
    }
}
