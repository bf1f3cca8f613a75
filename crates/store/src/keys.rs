//! Prefixed keys of the block store's single logical key space.

use baronbft_core_types::Hash;

/// Singleton key holding the marshaled (base, height) pair.
pub const STATE_KEY: &[u8] = b"blockStore";

pub fn block_meta(height: u64) -> Vec<u8> {
    format!("H:{height}").into_bytes()
}

pub fn block_part(height: u64, index: u32) -> Vec<u8> {
    format!("P:{height}:{index}").into_bytes()
}

pub fn block_commit(height: u64) -> Vec<u8> {
    format!("C:{height}").into_bytes()
}

pub fn seen_commit(height: u64) -> Vec<u8> {
    format!("SC:{height}").into_bytes()
}

pub fn block_hash(hash: &Hash) -> Vec<u8> {
    format!("BH:{hash}").into_bytes()
}
