use k256::ecdsa::Signature;

use super::{RawSignature, SCALAR_SIZE};
use crate::error::SigningError;

const SEQUENCE_TAG: u8 = 0x30;
const INTEGER_TAG: u8 = 0x02;
/// Long-form length with one length octet.
const LONG_FORM_ONE_BYTE: u8 = 0x81;

/// Decodes a DER `ECDSA-Sig-Value` (RFC 3279 §2.2.3) into `r‖s`.
///
/// Only the fixed `SEQUENCE { INTEGER, INTEGER }` shape is accepted. Each
/// integer loses at most one sign-pad zero and is left-padded to
/// [`SCALAR_SIZE`] bytes.
pub fn decode_signature(der: &[u8]) -> Result<RawSignature, SigningError> {
    let mut outer = DerReader::new(der);
    let body = outer.read_tlv(SEQUENCE_TAG, "signature sequence")?;
    outer.finish("after signature sequence")?;

    let mut fields = DerReader::new(body);
    let r = fields.read_tlv(INTEGER_TAG, "r")?;
    let s = fields.read_tlv(INTEGER_TAG, "s")?;
    fields.finish("after s inside signature sequence")?;

    Ok(RawSignature::from_scalars(
        fixed_width(r, "r")?,
        fixed_width(s, "s")?,
    ))
}

/// Flips `s` to `n - s` when it lies in the upper half of the curve order.
///
/// Also rejects scalars outside `[1, n)`, which no verifier accepts.
pub fn normalize_low_s(signature: &RawSignature) -> Result<RawSignature, SigningError> {
    let parsed = Signature::from_slice(signature.as_bytes())
        .map_err(|e| SigningError::MalformedSignature(format!("scalar out of range: {e}")))?;
    let normalized = parsed.normalize_s().unwrap_or(parsed);

    let mut bytes = [0u8; 2 * SCALAR_SIZE];
    bytes.copy_from_slice(&normalized.to_bytes());
    Ok(RawSignature::from(bytes))
}

fn fixed_width(integer: &[u8], name: &str) -> Result<[u8; SCALAR_SIZE], SigningError> {
    let (first, rest) = integer
        .split_first()
        .ok_or_else(|| SigningError::MalformedSignature(format!("{name} is empty")))?;
    if first & 0x80 != 0 {
        return Err(SigningError::MalformedSignature(format!("{name} is negative")));
    }

    // 0x00 only counts as sign padding when the next byte has its high bit set.
    let magnitude = match rest.first() {
        Some(next) if *first == 0 && next & 0x80 != 0 => rest,
        _ => integer,
    };
    if magnitude.len() > SCALAR_SIZE {
        return Err(SigningError::MalformedSignature(format!(
            "{name} is {} bytes, wider than {SCALAR_SIZE}",
            magnitude.len()
        )));
    }

    let mut out = [0u8; SCALAR_SIZE];
    out[SCALAR_SIZE - magnitude.len()..].copy_from_slice(magnitude);
    Ok(out)
}

struct DerReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> DerReader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn read_byte(&mut self, what: &str) -> Result<u8, SigningError> {
        let byte = *self.bytes.get(self.pos).ok_or_else(|| {
            SigningError::MalformedSignature(format!("unexpected end of input reading {what}"))
        })?;
        self.pos += 1;
        Ok(byte)
    }

    fn read_length(&mut self, what: &str) -> Result<usize, SigningError> {
        match self.read_byte(what)? {
            short if short < 0x80 => Ok(short as usize),
            LONG_FORM_ONE_BYTE => {
                let long = self.read_byte(what)?;
                if long < 0x80 {
                    return Err(SigningError::MalformedSignature(format!(
                        "non-minimal length encoding for {what}"
                    )));
                }
                Ok(long as usize)
            }
            other => Err(SigningError::MalformedSignature(format!(
                "unsupported length octet 0x{other:02x} for {what}"
            ))),
        }
    }

    /// Reads one tag-length-value element and returns its contents.
    fn read_tlv(&mut self, tag: u8, what: &str) -> Result<&'a [u8], SigningError> {
        let found = self.read_byte(what)?;
        if found != tag {
            return Err(SigningError::MalformedSignature(format!(
                "expected tag 0x{tag:02x} for {what}, found 0x{found:02x}"
            )));
        }
        let len = self.read_length(what)?;
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.bytes.len())
            .ok_or_else(|| {
                SigningError::MalformedSignature(format!("{what} length {len} overruns input"))
            })?;
        let value = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(value)
    }

    fn finish(&self, what: &str) -> Result<(), SigningError> {
        let remaining = self.bytes.len() - self.pos;
        if remaining != 0 {
            return Err(SigningError::MalformedSignature(format!(
                "{remaining} trailing bytes {what}"
            )));
        }
        Ok(())
    }
}
