/// Substrate ledger client built on subxt
///
/// One `OnlineClient` is shared by every request. A supervisor task follows
/// best blocks to notice a lost connection, then reconnects on an interval
/// and swaps the fresh client in, reporting each step as a [`LedgerEvent`].
use super::{LedgerClient, LedgerEvent, TxStatus, TxSubscription};
use crate::{
    config::LedgerConfig,
    crypto::SigningIdentity,
    error::{SignerError, SignerResult},
};
use async_trait::async_trait;
use futures::{future, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use subxt::{
    dynamic::Value,
    tx::TxStatus as ChainTxStatus,
    utils::H256,
    OnlineClient, PolkadotConfig,
};
use tokio::sync::{broadcast, Mutex, RwLock};
use tracing::{debug, error, info, warn};

type Api = OnlineClient<PolkadotConfig>;

/// Ledger client for a Substrate node
pub struct ChainClient {
    api: Arc<RwLock<Api>>,
    /// Held from nonce lookup until the node accepted the extrinsic
    submission: Mutex<()>,
}

impl ChainClient {
    /// Connect to `config.endpoint` and start the reconnect supervisor
    ///
    /// Fails when the first handshake does not complete within
    /// `config.connect_timeout`.
    pub async fn connect(
        config: &LedgerConfig,
    ) -> SignerResult<(Arc<Self>, broadcast::Receiver<LedgerEvent>)> {
        info!("Connecting to ledger: {}", config.endpoint);

        let api = tokio::time::timeout(config.connect_timeout, open(&config.endpoint))
            .await
            .map_err(|_| {
                SignerError::Ledger(format!(
                    "Timed out connecting to {} after {:?}",
                    config.endpoint, config.connect_timeout
                ))
            })?
            .map_err(|e| SignerError::Ledger(format!("Failed to connect to {}: {}", config.endpoint, e)))?;

        info!(
            "✓ Connected to ledger: {} (spec version {})",
            config.endpoint,
            api.runtime_version().spec_version
        );

        let (events, receiver) = broadcast::channel(16);
        let api = Arc::new(RwLock::new(api));

        tokio::spawn(supervise(
            config.endpoint.clone(),
            Arc::clone(&api),
            events,
            config.reconnect_interval,
        ));

        let client = Arc::new(Self {
            api,
            submission: Mutex::new(()),
        });

        Ok((client, receiver))
    }

    async fn api(&self) -> Api {
        self.api.read().await.clone()
    }
}

#[async_trait]
impl LedgerClient for ChainClient {
    async fn sign_and_submit(
        &self,
        remark: Vec<u8>,
        signer: &SigningIdentity,
    ) -> SignerResult<TxSubscription> {
        let api = self.api().await;
        let call = subxt::dynamic::tx("System", "remark", vec![Value::from_bytes(remark)]);

        let progress = {
            let _submitting = self.submission.lock().await;
            api.tx()
                .sign_and_submit_then_watch_default(&call, signer.keypair())
                .await
                .map_err(|e| SignerError::Ledger(e.to_string()))?
        };

        let tx_hash = hex_hash(&progress.extrinsic_hash());
        debug!("Submitted {} from {}", tx_hash, signer.address());

        let watched = tx_hash.clone();
        let updates = progress
            .map(move |update| match update {
                Ok(status) => Some(tx_status(status)),
                Err(e) => {
                    warn!("Status feed for {} ended: {}", watched, e);
                    None
                }
            })
            .take_while(|status| future::ready(status.is_some()))
            .filter_map(future::ready)
            .boxed();

        Ok(TxSubscription::new(tx_hash, updates))
    }

    async fn block_number(&self, block_hash: &str) -> SignerResult<u64> {
        let hash = parse_block_hash(block_hash)?;
        let block = self
            .api()
            .await
            .blocks()
            .at(hash)
            .await
            .map_err(|e| SignerError::Ledger(e.to_string()))?;

        Ok(block.number().into())
    }
}

async fn open(endpoint: &str) -> Result<Api, subxt::Error> {
    if endpoint.starts_with("ws://") {
        Api::from_insecure_url(endpoint).await
    } else {
        Api::from_url(endpoint).await
    }
}

/// Watch the connection and replace the client whenever it is lost
async fn supervise(
    endpoint: String,
    api: Arc<RwLock<Api>>,
    events: broadcast::Sender<LedgerEvent>,
    reconnect_interval: Duration,
) {
    loop {
        let client = api.read().await.clone();

        let updater = {
            let client = client.clone();
            tokio::spawn(async move {
                if let Err(e) = client.updater().perform_runtime_updates().await {
                    warn!("Runtime update feed stopped: {}", e);
                }
            })
        };

        follow_best_blocks(&client).await;
        updater.abort();

        error!("✗ Lost connection to ledger: {}", endpoint);
        let _ = events.send(LedgerEvent::Disconnected);

        loop {
            tokio::time::sleep(reconnect_interval).await;
            info!("Reconnecting to ledger: {}", endpoint);

            match open(&endpoint).await {
                Ok(client) => {
                    *api.write().await = client;
                    let _ = events.send(LedgerEvent::Connected);
                    let _ = events.send(LedgerEvent::Ready);
                    break;
                }
                Err(e) => {
                    warn!("Reconnect to {} failed: {}", endpoint, e);
                    let _ = events.send(LedgerEvent::Error(e.to_string()));
                }
            }
        }
    }
}

/// Returns once the best block feed ends
async fn follow_best_blocks(client: &Api) {
    let mut blocks = match client.blocks().subscribe_best().await {
        Ok(blocks) => blocks,
        Err(e) => {
            warn!("Could not subscribe to best blocks: {}", e);
            return;
        }
    };

    while let Some(block) = blocks.next().await {
        match block {
            Ok(block) => debug!("Best block #{}", block.number()),
            Err(e) => {
                warn!("Best block feed failed: {}", e);
                return;
            }
        }
    }
}

fn tx_status(status: ChainTxStatus<PolkadotConfig, Api>) -> TxStatus {
    match status {
        ChainTxStatus::Validated => TxStatus::Ready,
        ChainTxStatus::Broadcasted { .. } => TxStatus::Broadcast,
        ChainTxStatus::NoLongerInBestBlock => TxStatus::Retracted,
        ChainTxStatus::InBestBlock(block) => TxStatus::InBlock(hex_hash(&block.block_hash())),
        ChainTxStatus::InFinalizedBlock(block) => {
            TxStatus::Finalized(hex_hash(&block.block_hash()))
        }
        ChainTxStatus::Error { message } => TxStatus::Error(message),
        ChainTxStatus::Invalid { message } => TxStatus::Invalid(message),
        ChainTxStatus::Dropped { message } => TxStatus::Dropped(message),
    }
}

fn hex_hash(hash: &H256) -> String {
    format!("0x{}", hex::encode(hash.as_bytes()))
}

/// Parse a `0x`-prefixed 32-byte block hash
pub fn parse_block_hash(block_hash: &str) -> SignerResult<H256> {
    let digits = block_hash.strip_prefix("0x").unwrap_or(block_hash);
    let bytes = hex::decode(digits)
        .map_err(|e| SignerError::Ledger(format!("Malformed block hash {:?}: {}", block_hash, e)))?;
    let bytes: [u8; 32] = bytes.try_into().map_err(|_| {
        SignerError::Ledger(format!("Block hash {:?} is not 32 bytes", block_hash))
    })?;

    Ok(H256::from(bytes))
}
