use anyhow::Result;
use async_trait::async_trait;
use k256::ecdsa::{Signature, SigningKey, signature::hazmat::PrehashSigner};
use sha2::{Digest as _, Sha256};
use tracing::debug;

use super::SigningAuthority;
use crate::codec::{UNCOMPRESSED_POINT_SIZE, encode_public_key};
use crate::digest::Digest;
use crate::error::SigningError;

/// In-process custody authority backed by a secp256k1 key.
///
/// Created from a seed string; the SHA-256 hash of the seed becomes the
/// 32-byte private key. Answers in the same DER encodings a cloud KMS
/// does, so it can stand in for one behind the authority daemon.
pub struct LocalAuthority {
    key_id: String,
    signing_key: SigningKey,
}

impl LocalAuthority {
    pub fn from_seed(key_id: impl Into<String>, seed: &str) -> Result<Self> {
        let hash = Sha256::digest(seed.as_bytes());
        let signing_key = SigningKey::from_bytes(&hash)
            .map_err(|e| anyhow::anyhow!("invalid seed: {e}"))?;
        Ok(Self {
            key_id: key_id.into(),
            signing_key,
        })
    }
}

#[async_trait]
impl SigningAuthority for LocalAuthority {
    async fn sign(&self, digest: &Digest) -> Result<Vec<u8>, SigningError> {
        let signature: Signature = self
            .signing_key
            .sign_prehash(digest.as_ref())
            .map_err(|e| SigningError::AuthorityRejected(format!("sign_prehash failed: {e}")))?;
        debug!(key_id = %self.key_id, digest = %digest.to_hex(), "signed digest");
        Ok(signature.to_der().as_bytes().to_vec())
    }

    async fn public_key(&self) -> Result<Vec<u8>, SigningError> {
        let encoded = self.signing_key.verifying_key().to_encoded_point(false);
        let point: &[u8; UNCOMPRESSED_POINT_SIZE] = encoded
            .as_bytes()
            .try_into()
            .map_err(|_| SigningError::AuthorityRejected("public key is not an uncompressed point".into()))?;
        Ok(encode_public_key(point))
    }

    fn key_id(&self) -> &str {
        &self.key_id
    }
}
