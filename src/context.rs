/// Application context and dependency injection
use crate::{
    attestation::{AttestationCache, Attester},
    config::ServerConfig,
    crypto::{load_signing_identity, SigningIdentity},
    error::SignerResult,
    ledger::{ChainClient, ConnectionHealth, LedgerClient},
};
use std::sync::Arc;
use tracing::info;

/// Application context holding all shared services
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    pub attester: Arc<Attester>,
    pub cache: Arc<AttestationCache>,
    pub health: Arc<ConnectionHealth>,
}

impl AppContext {
    /// Load the credential, connect to the ledger and wire the pipeline
    ///
    /// Fails when the credential does not match the expected address or the
    /// ledger cannot be reached within the connect timeout.
    pub async fn new(config: ServerConfig) -> SignerResult<Self> {
        config.validate()?;

        let identity = load_signing_identity(&config.credentials)?;

        let (ledger, events) = ChainClient::connect(&config.ledger).await?;

        // The handshake completed, so the tracker starts ready
        let health = Arc::new(ConnectionHealth::ready());
        health.spawn_listener(events);

        let cache = Arc::new(AttestationCache::new());
        info!("Starting with empty attestation cache, lifts populate it at runtime");

        Ok(Self::with_ledger(config, identity, ledger, health, cache))
    }

    /// Wire the pipeline around an existing ledger client
    pub fn with_ledger(
        config: ServerConfig,
        identity: SigningIdentity,
        ledger: Arc<dyn LedgerClient>,
        health: Arc<ConnectionHealth>,
        cache: Arc<AttestationCache>,
    ) -> Self {
        let attester = Arc::new(Attester::new(
            ledger,
            Arc::new(identity),
            Arc::clone(&cache),
            Arc::clone(&health),
            config.attestation.clone(),
        ));

        Self {
            config: Arc::new(config),
            attester,
            cache,
            health,
        }
    }
}
