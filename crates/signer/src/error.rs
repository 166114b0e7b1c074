/// Everything that can go wrong while signing through a custody authority.
///
/// Authority failures are opaque upstream errors and are passed through
/// unchanged. Malformed responses are never corrected locally.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SigningError {
    #[error("Signing authority unavailable: {0}")]
    AuthorityUnavailable(String),
    #[error("Signing authority rejected the request: {0}")]
    AuthorityRejected(String),
    #[error("Malformed DER signature from authority: {0}")]
    MalformedSignature(String),
    #[error("Malformed DER public key from authority: {0}")]
    MalformedPublicKey(String),
}

impl SigningError {
    /// Whether the caller may retry the whole operation.
    pub fn is_transient(&self) -> bool {
        matches!(self, SigningError::AuthorityUnavailable(_))
    }
}

impl From<std::io::Error> for SigningError {
    fn from(error: std::io::Error) -> Self {
        Self::AuthorityUnavailable(error.to_string())
    }
}

impl From<tokio::time::error::Elapsed> for SigningError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        Self::AuthorityUnavailable("request to signing authority timed out".into())
    }
}
