/// Configuration management for the W3CP signer
use crate::error::{SignerError, SignerResult};
use std::env;
use std::fmt;
use std::time::Duration;

/// Main server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub service: ServiceConfig,
    pub credentials: CredentialConfig,
    pub ledger: LedgerConfig,
    pub attestation: AttestationConfig,
}

/// Service-level configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub hostname: String,
    pub port: u16,
}

/// Attester credential configuration
#[derive(Clone)]
pub struct CredentialConfig {
    /// Secret URI: BIP39 phrase with optional `//hard` junctions and `///password`
    pub secret_uri: String,
    /// SS58 address the secret must derive to
    pub expected_address: String,
}

// Keep the secret phrase out of logs
impl fmt::Debug for CredentialConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialConfig")
            .field("secret_uri", &"<redacted>")
            .field("expected_address", &self.expected_address)
            .finish()
    }
}

/// Ledger connection configuration
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    pub endpoint: String,
    /// Startup blocks at most this long for the first handshake
    pub connect_timeout: Duration,
    pub reconnect_interval: Duration,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            endpoint: "wss://westend-rpc.polkadot.io".to_string(),
            connect_timeout: Duration::from_secs(30),
            reconnect_interval: Duration::from_secs(5),
        }
    }
}

/// Attestation pipeline configuration
#[derive(Debug, Clone)]
pub struct AttestationConfig {
    /// Network name reported in receipts
    pub network: String,
    /// Block explorer base URL, receipts link to `{explorer_url}/extrinsic/{txHash}`
    pub explorer_url: String,
    pub submission_timeout: Duration,
}

impl Default for AttestationConfig {
    fn default() -> Self {
        Self {
            network: "westend".to_string(),
            explorer_url: "https://westend.subscan.io".to_string(),
            submission_timeout: Duration::from_secs(120),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> SignerResult<Self> {
        dotenv::dotenv().ok();

        let hostname = env::var("W3CP_SIGNER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = env::var("W3CP_SIGNER_PORT")
            .unwrap_or_else(|_| "9999".to_string())
            .parse()
            .map_err(|_| SignerError::Config("Invalid port number".to_string()))?;

        let secret_uri = env::var("W3CP_ATTESTER_MNEMONIC")
            .map_err(|_| SignerError::Config("W3CP_ATTESTER_MNEMONIC is required".to_string()))?;
        let expected_address = env::var("W3CP_SIGNER_PUB_KEY")
            .map_err(|_| SignerError::Config("W3CP_SIGNER_PUB_KEY is required".to_string()))?;

        let ledger_defaults = LedgerConfig::default();
        let endpoint = env::var("W3CP_BLOCKCHAIN_ENDPOINT").unwrap_or(ledger_defaults.endpoint);
        let connect_timeout = secs_from_env("W3CP_CONNECT_TIMEOUT_SECS", 30)?;
        let reconnect_interval = secs_from_env("W3CP_RECONNECT_INTERVAL_SECS", 5)?;

        let attestation_defaults = AttestationConfig::default();
        let network = env::var("W3CP_NETWORK").unwrap_or(attestation_defaults.network);
        let explorer_url = env::var("W3CP_EXPLORER_URL")
            .unwrap_or(attestation_defaults.explorer_url)
            .trim_end_matches('/')
            .to_string();
        let submission_timeout = secs_from_env("W3CP_SUBMISSION_TIMEOUT_SECS", 120)?;

        Ok(ServerConfig {
            service: ServiceConfig { hostname, port },
            credentials: CredentialConfig {
                secret_uri,
                expected_address,
            },
            ledger: LedgerConfig {
                endpoint,
                connect_timeout,
                reconnect_interval,
            },
            attestation: AttestationConfig {
                network,
                explorer_url,
                submission_timeout,
            },
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> SignerResult<()> {
        if self.credentials.secret_uri.trim().is_empty() {
            return Err(SignerError::Config(
                "W3CP_ATTESTER_MNEMONIC cannot be empty".to_string(),
            ));
        }

        if self.credentials.expected_address.trim().is_empty() {
            return Err(SignerError::Config(
                "W3CP_SIGNER_PUB_KEY cannot be empty".to_string(),
            ));
        }

        if !self.ledger.endpoint.starts_with("ws://") && !self.ledger.endpoint.starts_with("wss://")
        {
            return Err(SignerError::Config(format!(
                "Blockchain endpoint must be a ws:// or wss:// URL, got {}",
                self.ledger.endpoint
            )));
        }

        if self.attestation.submission_timeout.is_zero() {
            return Err(SignerError::Config(
                "Submission timeout must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

/// Whole seconds from `name`, or `default` when unset
fn secs_from_env(name: &str, default: u64) -> SignerResult<Duration> {
    match env::var(name) {
        Ok(value) => value.trim().parse().map(Duration::from_secs).map_err(|_| {
            SignerError::Config(format!("{} must be a whole number of seconds, got {:?}", name, value))
        }),
        Err(_) => Ok(Duration::from_secs(default)),
    }
}
