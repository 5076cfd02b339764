//! Shared fixtures: a scripted in-memory ledger and a server on an ephemeral port
#![allow(dead_code)]

use async_trait::async_trait;
use futures::StreamExt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use w3cp_signer::{
    attestation::AttestationCache,
    config::{AttestationConfig, CredentialConfig, LedgerConfig, ServerConfig, ServiceConfig},
    context::AppContext,
    crypto::SigningIdentity,
    error::{SignerError, SignerResult},
    ledger::{ConnectionHealth, LedgerClient, TxStatus, TxSubscription},
    server::build_router,
    validation::did_from_public_key,
};

pub const BLOCK_HASH: &str = "0x6a9e2b1d3c4f5a6b7c8d9e0f1a2b3c4d5e6f7a8b9c0d1e2f3a4b5c6d7e8f9a0b";
pub const BLOCK_NUMBER: u64 = 1000;

/// What the ledger does with the next submissions
#[derive(Debug, Clone)]
pub enum Script {
    /// Reach `InBlock`; `block_number: None` makes the block lookup fail
    Include { block_number: Option<u64> },
    /// Report a terminal failure status
    Fail(TxStatus),
    /// Never report a terminal status
    Hang,
    /// End the status feed after the pool accepted the transaction
    Vanish,
    /// Refuse the submission outright
    Reject(String),
}

/// Scripted ledger that counts submissions and subscription releases
pub struct MockLedger {
    script: Mutex<Script>,
    /// Delay before each status update
    step_delay: Duration,
    submissions: AtomicUsize,
    releases: Arc<AtomicUsize>,
    remarks: Mutex<Vec<Vec<u8>>>,
}

impl MockLedger {
    pub fn new(script: Script) -> Self {
        Self::with_delay(script, Duration::ZERO)
    }

    pub fn with_delay(script: Script, step_delay: Duration) -> Self {
        Self {
            script: Mutex::new(script),
            step_delay,
            submissions: AtomicUsize::new(0),
            releases: Arc::new(AtomicUsize::new(0)),
            remarks: Mutex::new(Vec::new()),
        }
    }

    pub fn included() -> Self {
        Self::new(Script::Include {
            block_number: Some(BLOCK_NUMBER),
        })
    }

    pub fn set_script(&self, script: Script) {
        *self.script.lock().unwrap() = script;
    }

    pub fn submissions(&self) -> usize {
        self.submissions.load(Ordering::SeqCst)
    }

    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }

    pub fn remarks(&self) -> Vec<Vec<u8>> {
        self.remarks.lock().unwrap().clone()
    }

    fn script(&self) -> Script {
        self.script.lock().unwrap().clone()
    }
}

#[async_trait]
impl LedgerClient for MockLedger {
    async fn sign_and_submit(
        &self,
        remark: Vec<u8>,
        _signer: &SigningIdentity,
    ) -> SignerResult<TxSubscription> {
        let script = self.script();
        if let Script::Reject(message) = &script {
            return Err(SignerError::Ledger(message.clone()));
        }
        let hangs = matches!(script, Script::Hang);

        let n = self.submissions.fetch_add(1, Ordering::SeqCst) + 1;
        self.remarks.lock().unwrap().push(remark);

        let statuses = match script {
            Script::Include { .. } => vec![
                TxStatus::Ready,
                TxStatus::Broadcast,
                TxStatus::InBlock(BLOCK_HASH.to_string()),
            ],
            Script::Fail(status) => vec![TxStatus::Ready, status],
            Script::Vanish => vec![TxStatus::Ready, TxStatus::Broadcast],
            Script::Hang | Script::Reject(_) => vec![TxStatus::Ready],
        };

        let step_delay = self.step_delay;
        let updates = futures::stream::iter(statuses).then(move |status| async move {
            tokio::time::sleep(step_delay).await;
            status
        });
        let updates = if hangs {
            updates.chain(futures::stream::pending()).boxed()
        } else {
            updates.boxed()
        };

        let releases = Arc::clone(&self.releases);
        Ok(
            TxSubscription::new(format!("0x{:064x}", n), updates).on_release(move || {
                releases.fetch_add(1, Ordering::SeqCst);
            }),
        )
    }

    async fn block_number(&self, block_hash: &str) -> SignerResult<u64> {
        match self.script() {
            Script::Include {
                block_number: Some(number),
            } if block_hash == BLOCK_HASH => Ok(number),
            _ => Err(SignerError::Ledger(format!(
                "Unable to decode block {}",
                block_hash
            ))),
        }
    }
}

pub fn test_identity() -> SigningIdentity {
    SigningIdentity::from_secret_uri("//Alice").expect("dev account derives")
}

/// A well-formed DID derived from `seed`
pub fn test_did(seed: u8) -> String {
    did_from_public_key(&[seed; 32])
}

pub fn test_config(submission_timeout: Duration) -> ServerConfig {
    ServerConfig {
        service: ServiceConfig {
            hostname: "127.0.0.1".to_string(),
            port: 0,
        },
        credentials: CredentialConfig {
            secret_uri: "//Alice".to_string(),
            expected_address: test_identity().address().to_string(),
        },
        ledger: LedgerConfig::default(),
        attestation: AttestationConfig {
            submission_timeout,
            ..AttestationConfig::default()
        },
    }
}

pub fn test_context(ledger: Arc<MockLedger>, health: ConnectionHealth) -> AppContext {
    test_context_with_timeout(ledger, health, Duration::from_secs(5))
}

pub fn test_context_with_timeout(
    ledger: Arc<MockLedger>,
    health: ConnectionHealth,
    submission_timeout: Duration,
) -> AppContext {
    AppContext::with_ledger(
        test_config(submission_timeout),
        test_identity(),
        ledger,
        Arc::new(health),
        Arc::new(AttestationCache::new()),
    )
}

/// Serve the router on an ephemeral port and return its base URL
pub async fn spawn_test_server(ctx: AppContext) -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("Listener has no address");

    tokio::spawn(async move {
        axum::serve(listener, build_router(ctx))
            .await
            .expect("Test server failed");
    });

    format!("http://{}", addr)
}
