use std::sync::Arc;
use std::time::Duration;

use custody_signer::digest::hash;
use custody_signer::{
    AuthorityConfig, Credentials, LocalAuthority, RemoteAuthority, ServerConfig, SigningAdapter,
    SigningAuthority, SigningError, serve,
};
use k256::ecdsa::{Signature, VerifyingKey, signature::hazmat::PrehashVerifier};
use tokio::net::TcpListener;

const KEY_ID: &str = "alias/ledger-operator";
const ACCESS_KEY_ID: &str = "AKIDOPERATOR";
const SECRET_ACCESS_KEY: &str = "operator-secret";

async fn spawn_authority(seed: &str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    let authority: Arc<dyn SigningAuthority> =
        Arc::new(LocalAuthority::from_seed(KEY_ID, seed).unwrap());
    let config = ServerConfig::new(Credentials::new(ACCESS_KEY_ID, SECRET_ACCESS_KEY));
    tokio::spawn(serve(listener, authority, config));
    addr
}

fn remote_as(addr: &str, key_id: &str, credentials: Credentials) -> RemoteAuthority {
    RemoteAuthority::new(
        AuthorityConfig::new(addr, key_id, credentials).with_timeout(Duration::from_secs(5)),
    )
}

fn remote(addr: &str, key_id: &str) -> RemoteAuthority {
    remote_as(addr, key_id, Credentials::new(ACCESS_KEY_ID, SECRET_ACCESS_KEY))
}

#[tokio::test]
async fn sign_and_verify_through_daemon() {
    let addr = spawn_authority("daemon-seed").await;
    let adapter = SigningAdapter::new(remote(&addr, KEY_ID));

    let public_key = adapter.derive_public_key().await.unwrap();
    let signature = adapter.sign_digest(b"transfer 10000 tinybar").await.unwrap();

    let verifying_key = VerifyingKey::from_sec1_bytes(public_key.as_bytes()).unwrap();
    let signature = Signature::from_slice(signature.as_bytes()).unwrap();
    verifying_key
        .verify_prehash(hash(b"transfer 10000 tinybar").as_ref(), &signature)
        .unwrap();
}

#[tokio::test]
async fn remote_and_local_agree() {
    let addr = spawn_authority("agree-seed").await;
    let remote = SigningAdapter::new(remote(&addr, KEY_ID));
    let local = SigningAdapter::new(LocalAuthority::from_seed(KEY_ID, "agree-seed").unwrap());

    assert_eq!(
        remote.derive_public_key().await.unwrap(),
        local.derive_public_key().await.unwrap()
    );
    assert_eq!(
        remote.sign_digest(b"same bytes").await.unwrap(),
        local.sign_digest(b"same bytes").await.unwrap()
    );
}

#[tokio::test]
async fn unknown_key_is_rejected_by_daemon() {
    let addr = spawn_authority("reject-seed").await;
    let adapter = SigningAdapter::new(remote(&addr, "alias/someone-else"));

    let error = adapter.sign_digest(b"payload").await.unwrap_err();
    assert!(matches!(error, SigningError::AuthorityRejected(_)), "{error:?}");
    assert!(!error.is_transient());
}

#[tokio::test]
async fn wrong_credentials_leave_authority_unavailable() {
    let addr = spawn_authority("auth-seed").await;
    let adapter = SigningAdapter::new(remote_as(
        &addr,
        KEY_ID,
        Credentials::new(ACCESS_KEY_ID, "not-the-secret"),
    ));

    let error = adapter.sign_digest(b"payload").await.unwrap_err();
    assert!(matches!(error, SigningError::AuthorityUnavailable(_)), "{error:?}");
    let error = adapter.derive_public_key().await.unwrap_err();
    assert!(error.is_transient(), "{error:?}");
}

#[tokio::test]
async fn parallel_requests_against_daemon() {
    let addr = spawn_authority("parallel-seed").await;
    let adapter = Arc::new(SigningAdapter::new(remote(&addr, KEY_ID)));
    let provider = adapter.signature_provider();

    let signatures = futures::future::join_all(
        (0..8u8).map(|i| provider(vec![i; 16])),
    )
    .await;
    for signature in signatures {
        assert_eq!(signature.unwrap().as_bytes().len(), 64);
    }
}

#[tokio::test]
async fn ping_reaches_daemon() {
    let addr = spawn_authority("ping-seed").await;
    remote(&addr, KEY_ID).ping().await.unwrap();
}
