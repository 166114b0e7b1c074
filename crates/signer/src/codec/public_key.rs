use super::{COMPRESSED_POINT_SIZE, CompressedPublicKey, SCALAR_SIZE};
use crate::error::SigningError;

/// SubjectPublicKeyInfo header for an id-ecPublicKey on secp256k1:
/// `SEQUENCE { SEQUENCE { OID 1.2.840.10045.2.1, OID 1.3.132.0.10 }, BIT STRING (66 bytes, 0 unused) }`.
pub const SPKI_PREFIX: [u8; 23] = [
    0x30, 0x56, 0x30, 0x10, 0x06, 0x07, 0x2a, 0x86, 0x48, 0xce, 0x3d, 0x02, 0x01, 0x06, 0x05,
    0x2b, 0x81, 0x04, 0x00, 0x0a, 0x03, 0x42, 0x00,
];

pub const UNCOMPRESSED_POINT_SIZE: usize = 2 * SCALAR_SIZE + 1;

const UNCOMPRESSED_TAG: u8 = 0x04;
const EVEN_Y_TAG: u8 = 0x02;
const ODD_Y_TAG: u8 = 0x03;

/// Strips the fixed SPKI header and compresses the uncompressed point behind it.
pub fn decode_public_key(der: &[u8]) -> Result<CompressedPublicKey, SigningError> {
    let point = der.strip_prefix(&SPKI_PREFIX[..]).ok_or_else(|| {
        SigningError::MalformedPublicKey(format!(
            "SubjectPublicKeyInfo prefix mismatch: {}",
            hex::encode(&der[..der.len().min(SPKI_PREFIX.len())])
        ))
    })?;

    if point.len() != UNCOMPRESSED_POINT_SIZE {
        return Err(SigningError::MalformedPublicKey(format!(
            "expected {UNCOMPRESSED_POINT_SIZE}-byte uncompressed point, found {} bytes",
            point.len()
        )));
    }
    if point[0] != UNCOMPRESSED_TAG {
        return Err(SigningError::MalformedPublicKey(format!(
            "expected uncompressed point tag 0x04, found 0x{:02x}",
            point[0]
        )));
    }

    let x = &point[1..=SCALAR_SIZE];
    let y_last = point[UNCOMPRESSED_POINT_SIZE - 1];

    let mut compressed = [0u8; COMPRESSED_POINT_SIZE];
    compressed[0] = if y_last & 1 == 0 { EVEN_Y_TAG } else { ODD_Y_TAG };
    compressed[1..].copy_from_slice(x);
    Ok(CompressedPublicKey(compressed))
}

/// Wraps a 65-byte uncompressed point in the secp256k1 SPKI header.
pub fn encode_public_key(point: &[u8; UNCOMPRESSED_POINT_SIZE]) -> Vec<u8> {
    let mut der = Vec::with_capacity(SPKI_PREFIX.len() + UNCOMPRESSED_POINT_SIZE);
    der.extend_from_slice(&SPKI_PREFIX);
    der.extend_from_slice(point);
    der
}
