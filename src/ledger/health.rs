/// Ledger connection health tracking
///
/// Two-state machine fed by ledger lifecycle events. The pipeline reads the
/// state before every submission and never waits for it to change.
use crate::ledger::LedgerEvent;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Connection state as seen by the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Ready,
    NotReady,
}

/// Connection health tracker
#[derive(Debug)]
pub struct ConnectionHealth {
    ready: AtomicBool,
}

impl ConnectionHealth {
    /// Tracker for a client that already completed its initial handshake
    pub fn ready() -> Self {
        Self {
            ready: AtomicBool::new(true),
        }
    }

    /// Tracker starting in the not-ready state
    pub fn not_ready() -> Self {
        Self {
            ready: AtomicBool::new(false),
        }
    }

    pub fn state(&self) -> ConnectionState {
        if self.ready.load(Ordering::SeqCst) {
            ConnectionState::Ready
        } else {
            ConnectionState::NotReady
        }
    }

    pub fn is_ready(&self) -> bool {
        self.state() == ConnectionState::Ready
    }

    /// Apply a lifecycle event
    pub fn handle(&self, event: &LedgerEvent) {
        match event {
            LedgerEvent::Connected => {
                info!("✓ Ledger connected");
            }
            LedgerEvent::Ready => {
                self.ready.store(true, Ordering::SeqCst);
                info!("✓ Ledger ready");
            }
            LedgerEvent::Disconnected => {
                self.ready.store(false, Ordering::SeqCst);
                warn!("Ledger disconnected, will auto-reconnect");
            }
            LedgerEvent::Error(message) => {
                self.ready.store(false, Ordering::SeqCst);
                error!("Ledger error: {}", message);
            }
        }
    }

    /// Follow a stream of lifecycle events in the background
    pub fn spawn_listener(self: &Arc<Self>, mut events: broadcast::Receiver<LedgerEvent>) -> JoinHandle<()> {
        let health = Arc::clone(self);

        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => health.handle(&event),
                    Err(RecvError::Lagged(skipped)) => {
                        // Missed events may include a disconnect
                        warn!("Health tracker lagged behind {} ledger events", skipped);
                        health.ready.store(false, Ordering::SeqCst);
                    }
                    Err(RecvError::Closed) => {
                        warn!("Ledger event channel closed");
                        health.ready.store(false, Ordering::SeqCst);
                        break;
                    }
                }
            }
        })
    }
}
