//! Transcoding between the authority's DER responses and the raw forms the
//! ledger accepts.

mod public_key;
mod signature;

use std::fmt;

pub use public_key::{SPKI_PREFIX, UNCOMPRESSED_POINT_SIZE, decode_public_key, encode_public_key};
pub use signature::{decode_signature, normalize_low_s};

/// Width of one signature scalar (and of a field element) on secp256k1.
pub const SCALAR_SIZE: usize = 32;
pub const SIGNATURE_SIZE: usize = 2 * SCALAR_SIZE;
pub const COMPRESSED_POINT_SIZE: usize = SCALAR_SIZE + 1;

/// Fixed-width `r‖s` signature, both halves big-endian.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct RawSignature([u8; SIGNATURE_SIZE]);

impl RawSignature {
    pub fn from_scalars(r: [u8; SCALAR_SIZE], s: [u8; SCALAR_SIZE]) -> Self {
        let mut bytes = [0u8; SIGNATURE_SIZE];
        bytes[..SCALAR_SIZE].copy_from_slice(&r);
        bytes[SCALAR_SIZE..].copy_from_slice(&s);
        Self(bytes)
    }

    pub fn r(&self) -> &[u8] {
        &self.0[..SCALAR_SIZE]
    }

    pub fn s(&self) -> &[u8] {
        &self.0[SCALAR_SIZE..]
    }

    pub fn as_bytes(&self) -> &[u8; SIGNATURE_SIZE] {
        &self.0
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.0.to_vec()
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl From<[u8; SIGNATURE_SIZE]> for RawSignature {
    fn from(bytes: [u8; SIGNATURE_SIZE]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for RawSignature {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for RawSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RawSignature({})", self.to_hex())
    }
}

/// SEC1 compressed point: parity byte followed by the x-coordinate.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct CompressedPublicKey([u8; COMPRESSED_POINT_SIZE]);

impl CompressedPublicKey {
    pub fn as_bytes(&self) -> &[u8; COMPRESSED_POINT_SIZE] {
        &self.0
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.0.to_vec()
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl AsRef<[u8]> for CompressedPublicKey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for CompressedPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CompressedPublicKey({})", self.to_hex())
    }
}

impl fmt::Display for CompressedPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}
