//! The external signing authority, seen only through two operations.

mod local;
mod remote;

use std::sync::Arc;

use async_trait::async_trait;

pub use local::LocalAuthority;
pub use remote::RemoteAuthority;

use crate::digest::Digest;
use crate::error::SigningError;

/// Signing algorithm label sent with every request: ECDSA over a
/// 256-bit digest.
pub const SIGNING_ALGORITHM: &str = "ECDSA_SHA_256";

/// A custody service holding a secp256k1 key it never releases.
///
/// Implementations perform I/O and must not cache signatures. Failures are
/// reported as [`SigningError::AuthorityUnavailable`] or
/// [`SigningError::AuthorityRejected`] and never retried here.
#[async_trait]
pub trait SigningAuthority: Send + Sync {
    /// Signs an already-hashed digest. Returns a DER `ECDSA-Sig-Value`.
    async fn sign(&self, digest: &Digest) -> Result<Vec<u8>, SigningError>;

    /// DER SubjectPublicKeyInfo of the key handle.
    async fn public_key(&self) -> Result<Vec<u8>, SigningError>;

    /// Identifier of the key handle this authority signs with.
    fn key_id(&self) -> &str;
}

#[async_trait]
impl<T: SigningAuthority + ?Sized> SigningAuthority for Arc<T> {
    async fn sign(&self, digest: &Digest) -> Result<Vec<u8>, SigningError> {
        (**self).sign(digest).await
    }

    async fn public_key(&self) -> Result<Vec<u8>, SigningError> {
        (**self).public_key().await
    }

    fn key_id(&self) -> &str {
        (**self).key_id()
    }
}
