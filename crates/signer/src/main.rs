use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use custody_signer::config::{Credentials, ServerConfig};
use custody_signer::{LocalAuthority, SigningAdapter, SigningAuthority, run};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Custody authority daemon holding a seeded secp256k1 key.
///
/// Speaks the same request shapes as a cloud KMS so that signing clients
/// can be exercised without one.
#[derive(Parser)]
#[command(name = "custody-authority", version)]
struct Args {
    #[clap(long, default_value = "127.0.0.1")]
    host: String,
    #[clap(long, default_value = "7300")]
    port: u16,
    /// Key handle clients must name in their requests.
    #[clap(long, env = "CUSTODY_KEY_ID", default_value = "alias/ledger-operator")]
    key_id: String,
    /// Seed whose SHA-256 becomes the private key.
    #[clap(long, env = "CUSTODY_KEY_SEED")]
    key_seed: String,
    /// Access key id clients must present.
    #[clap(long, env = "CUSTODY_ACCESS_KEY_ID")]
    access_key_id: String,
    /// Secret that goes with the access key id.
    #[clap(long, env = "CUSTODY_SECRET_ACCESS_KEY", hide_env_values = true)]
    secret_access_key: String,
    /// Close connections that send no request within this many milliseconds.
    #[clap(long, env = "CUSTODY_IDLE_TIMEOUT_MS", default_value = "10000")]
    idle_timeout_ms: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let authority: Arc<dyn SigningAuthority> = Arc::new(
        LocalAuthority::from_seed(args.key_id, &args.key_seed)
            .context("creating local authority")?,
    );

    let public_key = SigningAdapter::new(Arc::clone(&authority))
        .derive_public_key()
        .await
        .context("deriving public key")?;
    info!(key_id = %authority.key_id(), %public_key, "loaded signing key");

    let config = ServerConfig::new(Credentials::new(args.access_key_id, args.secret_access_key))
        .with_idle_timeout(Duration::from_millis(args.idle_timeout_ms));
    run(args.host, args.port, authority, config).await
}
