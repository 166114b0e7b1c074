use async_trait::async_trait;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_util::compat::TokioAsyncReadCompatExt;
use tracing::{debug, warn};

use super::{SIGNING_ALGORITHM, SigningAuthority};
use crate::config::AuthorityConfig;
use crate::digest::Digest;
use crate::error::SigningError;
use crate::protocol::{
    AuthorityCall, AuthorityRequest, AuthorityResponse, MessageType, read_message, write_message,
};

/// Client for an authority daemon speaking the length-prefixed JSON protocol.
///
/// Every request uses a fresh connection bounded by the configured timeout.
/// Dropping a pending call drops the connection with it.
pub struct RemoteAuthority {
    config: AuthorityConfig,
}

impl RemoteAuthority {
    pub fn new(config: AuthorityConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AuthorityConfig {
        &self.config
    }

    /// Liveness check; not part of the signing path.
    pub async fn ping(&self) -> Result<(), SigningError> {
        match self.request(AuthorityRequest::Ping).await? {
            AuthorityResponse::Pong => Ok(()),
            other => Err(unexpected(&other)),
        }
    }

    async fn request(&self, request: AuthorityRequest) -> Result<AuthorityResponse, SigningError> {
        let call = AuthorityCall {
            access_key_id: self.config.credentials.access_key_id.clone(),
            secret_access_key: self.config.credentials.secret_access_key.clone(),
            request,
        };
        let response = timeout(self.config.timeout, self.exchange(&call)).await??;
        match response {
            AuthorityResponse::Rejected { reason } => {
                warn!(endpoint = %self.config.endpoint, %reason, "authority rejected request");
                Err(SigningError::AuthorityRejected(reason))
            }
            AuthorityResponse::Error { message } => {
                warn!(endpoint = %self.config.endpoint, %message, "authority failed request");
                Err(SigningError::AuthorityUnavailable(message))
            }
            AuthorityResponse::Unauthorized { reason } => {
                warn!(
                    endpoint = %self.config.endpoint,
                    access_key_id = %self.config.credentials.access_key_id,
                    %reason,
                    "authority refused credentials"
                );
                Err(SigningError::AuthorityUnavailable(format!("not authorized: {reason}")))
            }
            response => Ok(response),
        }
    }

    async fn exchange(&self, call: &AuthorityCall) -> Result<AuthorityResponse, SigningError> {
        let stream = TcpStream::connect(&self.config.endpoint).await?;
        let mut io = stream.compat();
        write_message(&mut io, call)
            .await
            .map_err(|e| SigningError::AuthorityUnavailable(format!("{e:#}")))?;
        read_message(&mut io)
            .await
            .map_err(|e| SigningError::AuthorityUnavailable(format!("{e:#}")))
    }
}

#[async_trait]
impl SigningAuthority for RemoteAuthority {
    async fn sign(&self, digest: &Digest) -> Result<Vec<u8>, SigningError> {
        debug!(key_id = %self.config.key_id, digest = %digest.to_hex(), "requesting signature");
        let request = AuthorityRequest::Sign {
            key_id: self.config.key_id.clone(),
            message: digest.to_hex(),
            signing_algorithm: SIGNING_ALGORITHM.to_string(),
            message_type: MessageType::Digest,
        };
        match self.request(request).await? {
            AuthorityResponse::Signature { signature, .. } => hex::decode(&signature)
                .map_err(|e| SigningError::MalformedSignature(format!("signature is not hex: {e}"))),
            other => Err(unexpected(&other)),
        }
    }

    async fn public_key(&self) -> Result<Vec<u8>, SigningError> {
        debug!(key_id = %self.config.key_id, "requesting public key");
        let request = AuthorityRequest::GetPublicKey {
            key_id: self.config.key_id.clone(),
        };
        match self.request(request).await? {
            AuthorityResponse::PublicKey { public_key, .. } => hex::decode(&public_key)
                .map_err(|e| SigningError::MalformedPublicKey(format!("public key is not hex: {e}"))),
            other => Err(unexpected(&other)),
        }
    }

    fn key_id(&self) -> &str {
        &self.config.key_id
    }
}

fn unexpected(response: &AuthorityResponse) -> SigningError {
    SigningError::AuthorityRejected(format!("unexpected response from authority: {response:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::SigningAdapter;
    use crate::config::Credentials;
    use futures::io::AsyncReadExt;
    use std::time::Duration;
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;

    /// Accepts one connection, reads the call and answers with `response`.
    async fn scripted(response: AuthorityResponse) -> (String, tokio::task::JoinHandle<AuthorityCall>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let handle = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut io = stream.compat();
            let call: AuthorityCall = read_message(&mut io).await.unwrap();
            write_message(&mut io, &response).await.unwrap();
            call
        });
        (addr, handle)
    }

    fn config(endpoint: String) -> AuthorityConfig {
        AuthorityConfig::new(endpoint, "alias/ledger", Credentials::new("AKIDLEDGER", "s3cret"))
            .with_timeout(Duration::from_secs(2))
    }

    fn client(endpoint: String) -> RemoteAuthority {
        RemoteAuthority::new(config(endpoint))
    }

    #[tokio::test]
    async fn sign_sends_digest_with_algorithm_label() {
        let (addr, server) = scripted(AuthorityResponse::Signature {
            key_id: "alias/ledger".to_string(),
            signature: "3006020101020102".to_string(),
        })
        .await;

        let digest = Digest::from([0xab; 32]);
        let der = client(addr).sign(&digest).await.unwrap();
        assert_eq!(der, vec![0x30, 0x06, 0x02, 0x01, 0x01, 0x02, 0x01, 0x02]);

        let call = server.await.unwrap();
        assert_eq!(call.access_key_id, "AKIDLEDGER");
        assert_eq!(call.secret_access_key, "s3cret");
        assert_eq!(
            call.request,
            AuthorityRequest::Sign {
                key_id: "alias/ledger".to_string(),
                message: "ab".repeat(32),
                signing_algorithm: "ECDSA_SHA_256".to_string(),
                message_type: MessageType::Digest,
            }
        );
    }

    #[tokio::test]
    async fn rejected_maps_to_authority_rejected() {
        let (addr, _server) = scripted(AuthorityResponse::Rejected {
            reason: "unknown key id".to_string(),
        })
        .await;
        let error = client(addr).public_key().await.unwrap_err();
        assert_eq!(error, SigningError::AuthorityRejected("unknown key id".to_string()));
    }

    #[tokio::test]
    async fn error_maps_to_authority_unavailable() {
        let (addr, _server) = scripted(AuthorityResponse::Error {
            message: "throttled".to_string(),
        })
        .await;
        let error = client(addr).sign(&Digest::from([0; 32])).await.unwrap_err();
        assert_eq!(error, SigningError::AuthorityUnavailable("throttled".to_string()));
    }

    #[tokio::test]
    async fn unauthorized_maps_to_authority_unavailable() {
        let (addr, _server) = scripted(AuthorityResponse::Unauthorized {
            reason: "unknown access key".to_string(),
        })
        .await;
        let error = client(addr).sign(&Digest::from([0; 32])).await.unwrap_err();
        assert!(matches!(error, SigningError::AuthorityUnavailable(_)), "{error:?}");
        assert!(error.is_transient());
    }

    #[tokio::test]
    async fn non_hex_signature_is_malformed() {
        let (addr, _server) = scripted(AuthorityResponse::Signature {
            key_id: "alias/ledger".to_string(),
            signature: "not hex".to_string(),
        })
        .await;
        let error = client(addr).sign(&Digest::from([0; 32])).await.unwrap_err();
        assert!(matches!(error, SigningError::MalformedSignature(_)));
    }

    #[tokio::test]
    async fn wrong_response_kind_is_rejected() {
        let (addr, _server) = scripted(AuthorityResponse::Pong).await;
        let error = client(addr).public_key().await.unwrap_err();
        assert!(matches!(error, SigningError::AuthorityRejected(_)));
    }

    #[tokio::test]
    async fn refused_connection_is_unavailable() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);

        let error = client(addr).sign(&Digest::from([0; 32])).await.unwrap_err();
        assert!(error.is_transient(), "{error:?}");
    }

    #[tokio::test]
    async fn silent_authority_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let _hold = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(30)).await;
            drop(stream);
        });

        let authority = RemoteAuthority::new(config(addr).with_timeout(Duration::from_millis(100)));
        let error = authority.sign(&Digest::from([0; 32])).await.unwrap_err();
        assert!(matches!(error, SigningError::AuthorityUnavailable(_)));
    }

    #[tokio::test]
    async fn ping_expects_pong() {
        let (addr, server) = scripted(AuthorityResponse::Pong).await;
        client(addr).ping().await.unwrap();
        assert_eq!(server.await.unwrap().request, AuthorityRequest::Ping);
    }

    #[tokio::test]
    async fn dropping_pending_sign_closes_the_connection() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let (received_tx, received_rx) = oneshot::channel();
        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut io = stream.compat();
            let call: AuthorityCall = read_message(&mut io).await.unwrap();
            received_tx.send(call.request).unwrap();
            // Never answer; the next read only returns once the client is gone.
            let mut byte = [0u8; 1];
            io.read(&mut byte).await.unwrap()
        });

        let adapter = SigningAdapter::new(client(addr));
        let mut pending = Box::pin(adapter.sign_digest(b"payload"));
        tokio::select! {
            result = &mut pending => panic!("sign finished without an answer: {result:?}"),
            request = received_rx => {
                assert!(matches!(request.unwrap(), AuthorityRequest::Sign { .. }));
            }
        }
        drop(pending);

        let read = tokio::time::timeout(Duration::from_secs(1), server)
            .await
            .expect("connection still open after the call was dropped")
            .unwrap();
        assert_eq!(read, 0);
    }
}
