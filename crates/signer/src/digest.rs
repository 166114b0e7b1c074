use std::fmt;

use alloy_primitives::keccak256;
use clap::ValueEnum;
use sha2::{Digest as _, Sha256};

pub const DIGEST_SIZE: usize = 32;

/// A 32-byte message digest, the only thing ever sent to the authority.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct Digest([u8; DIGEST_SIZE]);

impl Digest {
    pub fn as_bytes(&self) -> &[u8; DIGEST_SIZE] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl From<[u8; DIGEST_SIZE]> for Digest {
    fn from(bytes: [u8; DIGEST_SIZE]) -> Self {
        Self(bytes)
    }
}

impl TryFrom<&[u8]> for Digest {
    type Error = usize;

    /// Fails with the offending length.
    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        <[u8; DIGEST_SIZE]>::try_from(bytes)
            .map(Self)
            .map_err(|_| bytes.len())
    }
}

impl AsRef<[u8]> for Digest {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", self.to_hex())
    }
}

/// Hash function applied to a payload before it goes to the authority.
///
/// The ledger verifies secp256k1 signatures over the Keccak-256 of the
/// transaction body, so that is the default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum DigestAlgorithm {
    #[default]
    #[value(name = "keccak256")]
    Keccak256,
    #[value(name = "sha256")]
    Sha256,
}

impl DigestAlgorithm {
    pub fn hash(self, payload: &[u8]) -> Digest {
        match self {
            DigestAlgorithm::Keccak256 => Digest(keccak256(payload).0),
            DigestAlgorithm::Sha256 => Digest(Sha256::digest(payload).into()),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            DigestAlgorithm::Keccak256 => "keccak256",
            DigestAlgorithm::Sha256 => "sha256",
        }
    }
}

/// Keccak-256 of `payload`.
pub fn hash(payload: &[u8]) -> Digest {
    DigestAlgorithm::Keccak256.hash(payload)
}
