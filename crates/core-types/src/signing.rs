//! Ed25519 signing scheme.

use core::fmt;
use std::cmp::Ordering;

use rand::{CryptoRng, RngCore};
use sha3::{Digest, Sha3_256};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SigningError {
    #[error("invalid public key")]
    InvalidPublicKey,

    #[error("invalid signature encoding")]
    InvalidSignature,

    #[error("signature verification failed")]
    VerificationFailed,
}

#[derive(Clone)]
pub struct PrivateKey(ed25519_consensus::SigningKey);

impl PrivateKey {
    pub fn generate<R>(rng: R) -> Self
    where
        R: RngCore + CryptoRng,
    {
        Self(ed25519_consensus::SigningKey::new(rng))
    }

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(ed25519_consensus::SigningKey::from(bytes))
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey(self.0.verification_key())
    }

    pub fn sign(&self, msg: &[u8]) -> Signature {
        Signature(self.0.sign(msg))
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PrivateKey(..)")
    }
}

impl signature::Signer<Signature> for PrivateKey {
    fn try_sign(&self, msg: &[u8]) -> Result<Signature, signature::Error> {
        Ok(self.sign(msg))
    }
}

#[derive(Clone)]
pub struct PublicKey(ed25519_consensus::VerificationKey);

impl PublicKey {
    pub const LENGTH: usize = 32;

    pub fn to_bytes(&self) -> [u8; Self::LENGTH] {
        self.0.to_bytes()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SigningError> {
        let bytes: [u8; Self::LENGTH] = bytes
            .try_into()
            .map_err(|_| SigningError::InvalidPublicKey)?;

        ed25519_consensus::VerificationKey::try_from(bytes)
            .map(Self)
            .map_err(|_| SigningError::InvalidPublicKey)
    }

    /// SHA3-256 of the key bytes; addresses are derived from this.
    pub fn hash(&self) -> [u8; 32] {
        let digest = Sha3_256::digest(self.to_bytes());
        let mut hash = [0; 32];
        hash.copy_from_slice(&digest);
        hash
    }

    pub fn verify(&self, msg: &[u8], signature: &Signature) -> Result<(), SigningError> {
        self.0
            .verify(&signature.0, msg)
            .map_err(|_| SigningError::VerificationFailed)
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", hex::encode(self.to_bytes()))
    }
}

impl PartialEq for PublicKey {
    fn eq(&self, other: &Self) -> bool {
        self.to_bytes() == other.to_bytes()
    }
}

impl Eq for PublicKey {}

impl PartialOrd for PublicKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PublicKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.to_bytes().cmp(&other.to_bytes())
    }
}

impl signature::Verifier<Signature> for PublicKey {
    fn verify(&self, msg: &[u8], signature: &Signature) -> Result<(), signature::Error> {
        PublicKey::verify(self, msg, signature).map_err(|_| signature::Error::new())
    }
}

#[derive(Copy, Clone)]
pub struct Signature(ed25519_consensus::Signature);

impl Signature {
    pub const LENGTH: usize = 64;

    /// The all-zeros signature, used as a placeholder before signing.
    pub fn zero() -> Self {
        Self(ed25519_consensus::Signature::from([0; Self::LENGTH]))
    }

    pub fn to_bytes(&self) -> [u8; Self::LENGTH] {
        self.0.to_bytes()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SigningError> {
        let bytes: [u8; Self::LENGTH] = bytes
            .try_into()
            .map_err(|_| SigningError::InvalidSignature)?;

        Ok(Self(ed25519_consensus::Signature::from(bytes)))
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({})", hex::encode(self.to_bytes()))
    }
}

impl PartialEq for Signature {
    fn eq(&self, other: &Self) -> bool {
        self.to_bytes() == other.to_bytes()
    }
}

impl Eq for Signature {}
