/// Ledger integration
///
/// The attestation pipeline consumes the ledger as a capability:
/// sign and submit a remark, watch its status until a terminal state,
/// and look up block heights. Connection lifecycle is reported through
/// a broadcast channel of [`LedgerEvent`]s.

pub mod chain;
pub mod health;

pub use chain::ChainClient;
pub use health::{ConnectionHealth, ConnectionState};

use crate::{crypto::SigningIdentity, error::SignerResult};
use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use std::fmt;

/// Ledger client capability consumed by the attestation pipeline
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Sign a `System.remark` carrying `remark` and submit it, watching its status
    async fn sign_and_submit(
        &self,
        remark: Vec<u8>,
        signer: &SigningIdentity,
    ) -> SignerResult<TxSubscription>;

    /// Resolve the height of a block from its hash
    async fn block_number(&self, block_hash: &str) -> SignerResult<u64>;
}

/// Connection lifecycle events emitted by a ledger client
#[derive(Debug, Clone, PartialEq)]
pub enum LedgerEvent {
    /// Transport connected, not yet able to serve requests
    Connected,
    /// Client can serve requests
    Ready,
    /// Transport lost; the client reconnects on its own
    Disconnected,
    /// Transport or protocol error
    Error(String),
}

/// Status updates of a watched transaction
#[derive(Debug, Clone, PartialEq)]
pub enum TxStatus {
    /// Validated and queued in the node's pool
    Ready,
    Broadcast,
    /// Included in the best block with this hash
    InBlock(String),
    /// No longer part of the best chain
    Retracted,
    Finalized(String),
    Dropped(String),
    Invalid(String),
    /// The node gave up watching the transaction
    Error(String),
}

impl TxStatus {
    /// Terminal failure statuses; the transaction will not be included
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            TxStatus::Dropped(_) | TxStatus::Invalid(_) | TxStatus::Error(_)
        )
    }
}

impl fmt::Display for TxStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TxStatus::Ready => write!(f, "Ready"),
            TxStatus::Broadcast => write!(f, "Broadcast"),
            TxStatus::InBlock(hash) => write!(f, "InBlock({})", hash),
            TxStatus::Retracted => write!(f, "Retracted"),
            TxStatus::Finalized(hash) => write!(f, "Finalized({})", hash),
            TxStatus::Dropped(message) => write!(f, "Dropped: {}", message),
            TxStatus::Invalid(message) => write!(f, "Invalid: {}", message),
            TxStatus::Error(message) => write!(f, "Error: {}", message),
        }
    }
}

/// Live status subscription for a submitted transaction
///
/// Dropping the update stream unsubscribes from the node. The subscription
/// is released exactly once: explicitly through [`TxSubscription::release`]
/// or when the value is dropped.
pub struct TxSubscription {
    tx_hash: String,
    updates: Option<BoxStream<'static, TxStatus>>,
    on_release: Option<Box<dyn FnOnce() + Send>>,
}

impl TxSubscription {
    pub fn new(tx_hash: String, updates: BoxStream<'static, TxStatus>) -> Self {
        Self {
            tx_hash,
            updates: Some(updates),
            on_release: None,
        }
    }

    /// Run `hook` once when the subscription is released
    pub fn on_release(mut self, hook: impl FnOnce() + Send + 'static) -> Self {
        self.on_release = Some(Box::new(hook));
        self
    }

    /// Hex hash of the submitted transaction
    pub fn tx_hash(&self) -> &str {
        &self.tx_hash
    }

    /// Next status update; `None` once the stream ended or was released
    pub async fn next_status(&mut self) -> Option<TxStatus> {
        match self.updates.as_mut() {
            Some(updates) => updates.next().await,
            None => None,
        }
    }

    pub fn is_released(&self) -> bool {
        self.updates.is_none()
    }

    /// Stop watching the transaction
    pub fn release(&mut self) {
        if self.updates.take().is_some() {
            if let Some(hook) = self.on_release.take() {
                hook();
            }
        }
    }
}

impl Drop for TxSubscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for TxSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TxSubscription")
            .field("tx_hash", &self.tx_hash)
            .field("released", &self.is_released())
            .finish()
    }
}
