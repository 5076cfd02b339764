/// Attestation pipeline
///
/// gate → validate → dedup → payload → sign & submit → await inclusion →
/// cache → receipt. Every request ends in exactly one outcome and the
/// ledger subscription is released on every exit path. Everything after
/// validation runs on its own task, so a caller that goes away cannot
/// interrupt a submitted attestation before it is cached.
use super::{AttestationCache, AttestationKey, AttestationPayload, AttestationReceipt};
use crate::{
    config::AttestationConfig,
    crypto::SigningIdentity,
    error::{SignerError, SignerResult},
    ledger::{ConnectionHealth, LedgerClient, TxStatus, TxSubscription},
    validation::validate_lift_request,
};
use chrono::{SecondsFormat, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Terminal outcome of a watched submission
#[derive(Debug, Clone, PartialEq)]
pub enum Confirmation {
    /// Included in the block with this hash
    Included { block_hash: String },
    /// Terminal failure status reported by the ledger
    Failed { status: String },
    /// Status feed ended without a terminal status
    Unknown,
    /// No terminal status within the submission timeout
    TimedOut,
}

/// Signs and submits attestations on behalf of charge points
pub struct Attester {
    ledger: Arc<dyn LedgerClient>,
    identity: Arc<SigningIdentity>,
    cache: Arc<AttestationCache>,
    health: Arc<ConnectionHealth>,
    config: AttestationConfig,
}

impl Attester {
    pub fn new(
        ledger: Arc<dyn LedgerClient>,
        identity: Arc<SigningIdentity>,
        cache: Arc<AttestationCache>,
        health: Arc<ConnectionHealth>,
        config: AttestationConfig,
    ) -> Self {
        Self {
            ledger,
            identity,
            cache,
            health,
            config,
        }
    }

    /// SS58 address of the signing identity
    pub fn address(&self) -> &str {
        self.identity.address()
    }

    pub fn cache(&self) -> &Arc<AttestationCache> {
        &self.cache
    }

    /// Attest that `cp_id` controls `did`
    pub async fn attest(
        self: &Arc<Self>,
        cp_id: &str,
        did: &str,
    ) -> SignerResult<AttestationReceipt> {
        if !self.health.is_ready() {
            error!("Refusing lift, blockchain not connected");
            return Err(SignerError::ServiceUnavailable);
        }

        if let Err(e) = validate_lift_request(cp_id, did) {
            warn!("Rejected lift cpId={:?} did={:?}: {}", cp_id, did, e);
            return Err(e);
        }

        let attester = Arc::clone(self);
        let (cp_id, did) = (cp_id.to_string(), did.to_string());

        tokio::spawn(async move { attester.submit(&cp_id, &did).await })
            .await
            .map_err(|e| {
                error!("Attestation task failed: {}", e);
                SignerError::Internal(e.to_string())
            })?
    }

    async fn submit(&self, cp_id: &str, did: &str) -> SignerResult<AttestationReceipt> {
        let key = AttestationKey::new(cp_id, did);
        let _key_guard = self.cache.lock(&key).await;

        if self.cache.contains(&key) {
            warn!("Duplicate attestation for {}", key);
            return Err(SignerError::DuplicateAttestation {
                cp_id: cp_id.to_string(),
                did: did.to_string(),
            });
        }

        info!("Request ok cpId={}, did={}", cp_id, did);

        let payload = AttestationPayload::new(cp_id, did);
        let mut subscription = self
            .ledger
            .sign_and_submit(payload.to_remark(), &self.identity)
            .await
            .map_err(|e| {
                error!("Signing failed for {}: {}", key, e);
                SignerError::submission(e.to_string())
            })?;

        info!("Waiting for chain confirmation of {}", subscription.tx_hash());

        let confirmation =
            await_inclusion(&mut subscription, self.config.submission_timeout).await;
        subscription.release();

        match confirmation {
            Confirmation::Included { block_hash } => {
                let block_number = match self.ledger.block_number(&block_hash).await {
                    Ok(number) => Some(number),
                    Err(e) => {
                        warn!("Could not resolve height of block {}: {}", block_hash, e);
                        None
                    }
                };

                self.cache.insert(key);

                let receipt = self.receipt(subscription.tx_hash(), block_hash, block_number, payload);
                info!(
                    "Lift done: cpId={} tx={} block={:?}",
                    cp_id, receipt.tx_hash, receipt.block_number
                );
                Ok(receipt)
            }
            Confirmation::Failed { status } => {
                error!("Tx {} failed: {}", subscription.tx_hash(), status);
                Err(SignerError::submission_with_detail("tx failed", status))
            }
            Confirmation::Unknown => {
                error!(
                    "Lost status feed for tx {} before a terminal status",
                    subscription.tx_hash()
                );
                Err(SignerError::OutcomeUnknown {
                    tx_hash: subscription.tx_hash().to_string(),
                })
            }
            Confirmation::TimedOut => {
                error!(
                    "Tx {} not included within {:?}",
                    subscription.tx_hash(),
                    self.config.submission_timeout
                );
                Err(SignerError::SubmissionTimeout)
            }
        }
    }

    fn receipt(
        &self,
        tx_hash: &str,
        block_hash: String,
        block_number: Option<u64>,
        payload: AttestationPayload,
    ) -> AttestationReceipt {
        AttestationReceipt {
            network: self.config.network.clone(),
            tx_hash: tx_hash.to_string(),
            explorer_url: format!("{}/extrinsic/{}", self.config.explorer_url, tx_hash),
            block_hash,
            block_number,
            attester: self.identity.address().to_string(),
            lifted_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            payload,
        }
    }
}

/// Follow status updates until inclusion, a failure or the timeout
pub async fn await_inclusion(subscription: &mut TxSubscription, timeout: Duration) -> Confirmation {
    let watch = async {
        while let Some(status) = subscription.next_status().await {
            match status {
                TxStatus::InBlock(block_hash) => return Confirmation::Included { block_hash },
                status if status.is_error() => {
                    return Confirmation::Failed {
                        status: status.to_string(),
                    }
                }
                _ => {}
            }
        }
        Confirmation::Unknown
    };

    tokio::time::timeout(timeout, watch)
        .await
        .unwrap_or(Confirmation::TimedOut)
}
