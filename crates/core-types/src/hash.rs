use core::fmt;

use sha3::{Digest, Sha3_256};
use thiserror::Error;

/// A 32-byte hash, or the absent hash.
///
/// The absent hash is a first-class value distinct from any 32-byte digest,
/// including the all-zeros one. It is what a zero block id carries and what
/// keys the nil tally in vote sets, so the raw empty byte string never
/// doubles as a sentinel.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Hash {
    None,
    Sha3([u8; Self::LENGTH]),
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid hash length: expected {expected} or 0, got {got}")]
pub struct InvalidHashLength {
    pub expected: usize,
    pub got: usize,
}

impl Hash {
    pub const LENGTH: usize = 32;

    /// Hash arbitrary bytes with SHA3-256.
    pub fn sha3_of(bytes: impl AsRef<[u8]>) -> Self {
        let digest = Sha3_256::digest(bytes.as_ref());
        let mut hash = [0; Self::LENGTH];
        hash.copy_from_slice(&digest);
        Self::Sha3(hash)
    }

    pub const fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    pub const fn is_some(&self) -> bool {
        !self.is_none()
    }

    /// The digest bytes, empty for the absent hash.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::None => &[],
            Self::Sha3(bytes) => bytes,
        }
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.as_bytes().to_vec()
    }

    /// Parse from wire bytes: empty means absent, anything else must be
    /// exactly 32 bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, InvalidHashLength> {
        if bytes.is_empty() {
            return Ok(Self::None);
        }

        if bytes.len() != Self::LENGTH {
            return Err(InvalidHashLength {
                expected: Self::LENGTH,
                got: bytes.len(),
            });
        }

        let mut hash = [0; Self::LENGTH];
        hash.copy_from_slice(bytes);
        Ok(Self::Sha3(hash))
    }
}

impl Default for Hash {
    fn default() -> Self {
        Self::None
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.as_bytes() {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_is_distinct_from_zero_digest() {
        let zero = Hash::Sha3([0; Hash::LENGTH]);
        assert_ne!(Hash::None, zero);
        assert!(Hash::None.is_none());
        assert!(zero.is_some());
    }

    #[test]
    fn from_bytes_round_trip() {
        let hash = Hash::sha3_of(b"baron-chain");
        assert_eq!(Hash::from_bytes(hash.as_bytes()), Ok(hash));
        assert_eq!(Hash::from_bytes(&[]), Ok(Hash::None));
        assert!(Hash::from_bytes(&[1, 2, 3]).is_err());
    }
}
