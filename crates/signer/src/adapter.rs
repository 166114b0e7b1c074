use std::sync::Arc;

use futures::future::BoxFuture;
use tokio::sync::OnceCell;
use tracing::debug;

use crate::authority::SigningAuthority;
use crate::codec::{CompressedPublicKey, RawSignature, decode_public_key, decode_signature, normalize_low_s};
use crate::digest::DigestAlgorithm;
use crate::error::SigningError;

/// What happens to `s` after decoding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Normalization {
    /// Return `s` exactly as the authority produced it.
    #[default]
    Preserve,
    /// Replace a high `s` with `n - s`.
    LowS,
}

/// Signature callback handed to a ledger client: payload in, `r‖s` out.
pub type SignatureProvider =
    Arc<dyn Fn(Vec<u8>) -> BoxFuture<'static, Result<RawSignature, SigningError>> + Send + Sync>;

/// Turns an opaque custody authority into the two operations a ledger
/// transaction layer needs.
///
/// Holds no mutable state besides the write-once public key, so one adapter
/// can serve any number of concurrent signing calls.
pub struct SigningAdapter<A> {
    authority: A,
    digest_algorithm: DigestAlgorithm,
    normalization: Normalization,
    public_key: OnceCell<CompressedPublicKey>,
}

impl<A: SigningAuthority> SigningAdapter<A> {
    pub fn new(authority: A) -> Self {
        Self {
            authority,
            digest_algorithm: DigestAlgorithm::default(),
            normalization: Normalization::default(),
            public_key: OnceCell::new(),
        }
    }

    pub fn with_digest_algorithm(mut self, digest_algorithm: DigestAlgorithm) -> Self {
        self.digest_algorithm = digest_algorithm;
        self
    }

    pub fn with_normalization(mut self, normalization: Normalization) -> Self {
        self.normalization = normalization;
        self
    }

    pub fn authority(&self) -> &A {
        &self.authority
    }

    /// Hashes `payload`, has the authority sign the digest and returns the
    /// signature as 64 raw bytes.
    pub async fn sign_digest(&self, payload: &[u8]) -> Result<RawSignature, SigningError> {
        let digest = self.digest_algorithm.hash(payload);
        debug!(
            algorithm = self.digest_algorithm.name(),
            digest = %digest.to_hex(),
            payload_len = payload.len(),
            "signing payload"
        );

        let der = self.authority.sign(&digest).await?;
        let signature = decode_signature(&der)?;
        match self.normalization {
            Normalization::Preserve => Ok(signature),
            Normalization::LowS => normalize_low_s(&signature),
        }
    }

    /// Compressed public key of the authority's key handle.
    ///
    /// Fetched on first use and cached; failures are not cached.
    pub async fn derive_public_key(&self) -> Result<CompressedPublicKey, SigningError> {
        self.public_key
            .get_or_try_init(|| async {
                let der = self.authority.public_key().await?;
                let key = decode_public_key(&der)?;
                debug!(key_id = %self.authority.key_id(), public_key = %key, "derived public key");
                Ok::<_, SigningError>(key)
            })
            .await
            .copied()
    }
}

impl<A: SigningAuthority + 'static> SigningAdapter<A> {
    /// Wraps [`sign_digest`](Self::sign_digest) as an owned callback.
    pub fn signature_provider(self: &Arc<Self>) -> SignatureProvider {
        let adapter = Arc::clone(self);
        Arc::new(move |payload: Vec<u8>| -> BoxFuture<'static, Result<RawSignature, SigningError>> {
            let adapter = Arc::clone(&adapter);
            Box::pin(async move { adapter.sign_digest(&payload).await })
        })
    }
}
