pub mod adapter;
pub mod authority;
pub mod codec;
pub mod config;
pub mod digest;
pub mod error;
pub mod protocol;
pub mod server;

pub use adapter::{Normalization, SignatureProvider, SigningAdapter};
pub use authority::{LocalAuthority, RemoteAuthority, SigningAuthority};
pub use codec::{CompressedPublicKey, RawSignature};
pub use config::{AuthorityConfig, Credentials, ServerConfig};
pub use digest::{Digest, DigestAlgorithm};
pub use error::SigningError;
pub use server::{run, serve};
