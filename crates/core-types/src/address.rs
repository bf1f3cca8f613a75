use core::fmt;

use thiserror::Error;

use crate::signing::PublicKey;

/// A validator address: the first 20 bytes of the SHA3-256 of the public key.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address([u8; Self::LENGTH]);

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid address length: expected {expected}, got {got}")]
pub struct InvalidAddressLength {
    pub expected: usize,
    pub got: usize,
}

impl Address {
    pub const LENGTH: usize = 20;

    pub const fn new(value: [u8; Self::LENGTH]) -> Self {
        Self(value)
    }

    pub fn from_public_key(public_key: &PublicKey) -> Self {
        let hash = public_key.hash();
        let mut address = [0; Self::LENGTH];
        address.copy_from_slice(&hash[..Self::LENGTH]);
        Self(address)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.0.to_vec()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, InvalidAddressLength> {
        if bytes.len() != Self::LENGTH {
            return Err(InvalidAddressLength {
                expected: Self::LENGTH,
                got: bytes.len(),
            });
        }

        let mut address = [0; Self::LENGTH];
        address.copy_from_slice(bytes);
        Ok(Self(address))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0.iter() {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}
