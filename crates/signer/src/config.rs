use std::fmt;
use std::time::Duration;

pub const DEFAULT_ENDPOINT: &str = "127.0.0.1:7300";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(10);

/// Access key pair presented with every request to the authority.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
}

impl Credentials {
    pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .finish()
    }
}

/// Where the signing authority lives, how to authenticate to it and which
/// key it should use.
///
/// Built once at process start by the binaries and handed to
/// [`RemoteAuthority::new`](crate::RemoteAuthority::new).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorityConfig {
    /// `host:port` of the authority daemon.
    pub endpoint: String,
    pub key_id: String,
    pub credentials: Credentials,
    /// Upper bound on one request, connect included.
    pub timeout: Duration,
}

impl AuthorityConfig {
    pub fn new(
        endpoint: impl Into<String>,
        key_id: impl Into<String>,
        credentials: Credentials,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            key_id: key_id.into(),
            credentials,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Settings of the authority daemon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Credentials every request must carry.
    pub credentials: Credentials,
    /// How long a connection may stay silent before its request arrives.
    pub idle_timeout: Duration,
}

impl ServerConfig {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
        }
    }

    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }
}
