use std::sync::Arc;

use anyhow::{Context, Result};
use futures::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio::time::timeout;
use tokio_util::compat::TokioAsyncReadCompatExt;
use tracing::{debug, error, info, warn};

use crate::authority::{SIGNING_ALGORITHM, SigningAuthority};
use crate::config::{Credentials, ServerConfig};
use crate::digest::Digest;
use crate::error::SigningError;
use crate::protocol::{
    AuthorityCall, AuthorityRequest, AuthorityResponse, MessageType, read_message, write_message,
};

pub async fn run(
    host: String,
    port: u16,
    authority: Arc<dyn SigningAuthority>,
    config: ServerConfig,
) -> Result<()> {
    let listener = TcpListener::bind((host.as_str(), port))
        .await
        .with_context(|| format!("binding {host}:{port}"))?;
    serve(listener, authority, config).await
}

/// Accepts connections forever, one task per connection.
pub async fn serve(
    listener: TcpListener,
    authority: Arc<dyn SigningAuthority>,
    config: ServerConfig,
) -> Result<()> {
    let config = Arc::new(config);
    info!(
        addr = %listener.local_addr().context("reading listener address")?,
        key_id = %authority.key_id(),
        idle_timeout_ms = config.idle_timeout.as_millis() as u64,
        "authority listening"
    );

    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                error!("Error accepting connection: {e}");
                continue;
            }
        };
        debug!(%peer, "new connection");

        let authority = Arc::clone(&authority);
        let config = Arc::clone(&config);
        tokio::spawn(async move {
            if let Err(e) = serve_connection(stream.compat(), authority.as_ref(), &config).await {
                warn!(%peer, "connection failed: {e:#}");
            }
        });
    }
}

/// Answers a single call on `io`.
///
/// Gives up, dropping the connection, when no call arrives within the idle
/// timeout.
pub async fn serve_connection<T>(
    mut io: T,
    authority: &dyn SigningAuthority,
    config: &ServerConfig,
) -> Result<()>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    let call: AuthorityCall = timeout(config.idle_timeout, read_message(&mut io))
        .await
        .context("connection idle")?
        .context("reading request")?;
    let response = match authorize(&config.credentials, &call) {
        Some(refusal) => refusal,
        None => handle_request(authority, call.request).await,
    };
    write_message(&mut io, &response).await.context("sending response")
}

fn authorize(expected: &Credentials, call: &AuthorityCall) -> Option<AuthorityResponse> {
    if call.access_key_id == expected.access_key_id
        && call.secret_access_key == expected.secret_access_key
    {
        return None;
    }
    warn!(access_key_id = %call.access_key_id, "refusing credentials");
    Some(AuthorityResponse::Unauthorized {
        reason: format!("access key {} is not authorized", call.access_key_id),
    })
}

pub async fn handle_request(
    authority: &dyn SigningAuthority,
    request: AuthorityRequest,
) -> AuthorityResponse {
    match request {
        AuthorityRequest::Sign {
            key_id,
            message,
            signing_algorithm,
            message_type,
        } => {
            if let Some(rejection) = check_key(authority, &key_id) {
                return rejection;
            }
            if signing_algorithm != SIGNING_ALGORITHM {
                return rejected(format!("unsupported signing algorithm {signing_algorithm}"));
            }
            if message_type != MessageType::Digest {
                return rejected("only DIGEST messages are accepted".to_string());
            }
            let digest = match hex::decode(&message) {
                Ok(bytes) => match Digest::try_from(bytes.as_slice()) {
                    Ok(digest) => digest,
                    Err(len) => return rejected(format!("digest must be 32 bytes, got {len}")),
                },
                Err(e) => return rejected(format!("digest is not hex: {e}")),
            };

            match authority.sign(&digest).await {
                Ok(der) => AuthorityResponse::Signature {
                    key_id,
                    signature: hex::encode(der),
                },
                Err(e) => failure(e),
            }
        }
        AuthorityRequest::GetPublicKey { key_id } => {
            if let Some(rejection) = check_key(authority, &key_id) {
                return rejection;
            }
            match authority.public_key().await {
                Ok(der) => AuthorityResponse::PublicKey {
                    key_id,
                    public_key: hex::encode(der),
                },
                Err(e) => failure(e),
            }
        }
        AuthorityRequest::Ping => AuthorityResponse::Pong,
    }
}

fn check_key(authority: &dyn SigningAuthority, key_id: &str) -> Option<AuthorityResponse> {
    (key_id != authority.key_id()).then(|| rejected(format!("unknown key id {key_id}")))
}

fn rejected(reason: String) -> AuthorityResponse {
    warn!(%reason, "rejecting request");
    AuthorityResponse::Rejected { reason }
}

fn failure(error: SigningError) -> AuthorityResponse {
    match error {
        SigningError::AuthorityUnavailable(_) => {
            error!("Signing failed: {error}");
            AuthorityResponse::Error {
                message: error.to_string(),
            }
        }
        SigningError::AuthorityRejected(reason) => rejected(reason),
        malformed @ (SigningError::MalformedSignature(_) | SigningError::MalformedPublicKey(_)) => {
            error!("Backend produced a malformed answer: {malformed}");
            rejected(malformed.to_string())
        }
    }
}
