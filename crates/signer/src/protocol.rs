use anyhow::{Context, Result, bail};
use futures::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

const MAX_MESSAGE_SIZE: u32 = 1024 * 1024; // 1 MiB

/// Whether `message` is the payload itself or a digest of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageType {
    Raw,
    Digest,
}

/// Client → authority messages. Binary fields travel as lowercase hex.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum AuthorityRequest {
    Sign {
        key_id: String,
        message: String,
        signing_algorithm: String,
        message_type: MessageType,
    },
    GetPublicKey {
        key_id: String,
    },
    Ping,
}

/// One request frame: the caller's access key pair and the request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorityCall {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub request: AuthorityRequest,
}

/// Authority → client messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum AuthorityResponse {
    /// DER `ECDSA-Sig-Value`.
    Signature { key_id: String, signature: String },
    /// DER SubjectPublicKeyInfo.
    PublicKey { key_id: String, public_key: String },
    /// Permanent refusal: unknown key, bad digest, unsupported algorithm.
    Rejected { reason: String },
    /// The authority could not serve the request right now.
    Error { message: String },
    /// The presented credentials were not accepted.
    Unauthorized { reason: String },
    Pong,
}

/// Write a length-prefixed JSON message.
pub async fn write_message<W, T>(writer: &mut W, msg: &T) -> Result<()>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let payload = serde_json::to_vec(msg).context("serializing message")?;
    let len = u32::try_from(payload.len()).context("message length overflows u32")?;
    if len > MAX_MESSAGE_SIZE {
        bail!("message too large: {len} bytes (max {MAX_MESSAGE_SIZE})");
    }
    writer.write_all(&len.to_be_bytes()).await.context("writing length prefix")?;
    writer.write_all(&payload).await.context("writing payload")?;
    writer.flush().await.context("flushing writer")?;
    Ok(())
}

/// Read a length-prefixed JSON message.
pub async fn read_message<R, T>(reader: &mut R) -> Result<T>
where
    R: AsyncRead + Unpin,
    T: DeserializeOwned,
{
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf).await.context("reading length prefix")?;
    let len = u32::from_be_bytes(len_buf);

    if len > MAX_MESSAGE_SIZE {
        bail!("message too large: {len} bytes (max {MAX_MESSAGE_SIZE})");
    }

    let mut payload = vec![0u8; len as usize];
    reader.read_exact(&mut payload).await.context("reading payload")?;
    serde_json::from_slice(&payload).context("deserializing message")
}
