use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use custody_signer::config::Credentials;
use custody_signer::{
    AuthorityConfig, DigestAlgorithm, Normalization, RemoteAuthority, SigningAdapter,
};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Subcommand)]
enum Command {
    /// Print the 33-byte compressed public key of the key handle.
    PublicKey,
    /// Sign a payload and print the 64-byte r||s signature.
    Sign {
        #[clap(long, conflicts_with = "payload_hex")]
        payload: Option<String>,
        #[clap(long)]
        payload_hex: Option<String>,
    },
    /// Check that the authority answers.
    Ping,
}

#[derive(Parser)]
struct Args {
    #[clap(long, env = "CUSTODY_ENDPOINT", default_value = "127.0.0.1:7300")]
    endpoint: String,
    #[clap(long, env = "CUSTODY_KEY_ID", default_value = "alias/ledger-operator")]
    key_id: String,
    #[clap(long, env = "CUSTODY_ACCESS_KEY_ID")]
    access_key_id: String,
    #[clap(long, env = "CUSTODY_SECRET_ACCESS_KEY", hide_env_values = true)]
    secret_access_key: String,
    #[clap(long, env = "CUSTODY_TIMEOUT_MS", default_value = "5000")]
    timeout_ms: u64,
    #[clap(long, value_enum, default_value = "keccak256")]
    digest: DigestAlgorithm,
    /// Normalize signatures to low-s form.
    #[clap(long)]
    low_s: bool,
    #[command(subcommand)]
    command: Command,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let credentials = Credentials::new(args.access_key_id, args.secret_access_key);
    let config = AuthorityConfig::new(args.endpoint, args.key_id, credentials)
        .with_timeout(Duration::from_millis(args.timeout_ms));
    debug!(?config, digest = args.digest.name(), low_s = args.low_s, "client configured");
    let normalization = if args.low_s {
        Normalization::LowS
    } else {
        Normalization::Preserve
    };
    let adapter = SigningAdapter::new(RemoteAuthority::new(config))
        .with_digest_algorithm(args.digest)
        .with_normalization(normalization);

    match args.command {
        Command::PublicKey => {
            let public_key = adapter
                .derive_public_key()
                .await
                .context("deriving public key")?;
            println!("{public_key}");
        }
        Command::Sign {
            payload,
            payload_hex,
        } => {
            let payload = match (payload, payload_hex) {
                (Some(text), None) => text.into_bytes(),
                (None, Some(hex_payload)) => {
                    hex::decode(hex_payload.trim_start_matches("0x")).context("decoding --payload-hex")?
                }
                _ => bail!("exactly one of --payload or --payload-hex is required"),
            };
            info!(payload_len = payload.len(), "signing payload");
            let signature = adapter.sign_digest(&payload).await.context("signing payload")?;
            println!("{}", signature.to_hex());
        }
        Command::Ping => {
            adapter.authority().ping().await.context("pinging authority")?;
            println!("ok");
        }
    }

    Ok(())
}
