/// Liveness endpoint
///
/// Reports the attester address and how many attestations this process has
/// recorded. Stays `ok` while the ledger reconnects; lifts report that state.
use crate::context::AppContext;
use axum::{extract::State, response::Json, routing::get, Router};
use serde::{Deserialize, Serialize};

/// Health status response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthStatus {
    pub status: String,
    /// SS58 address of the attester
    pub attester: String,
    pub cache_size: usize,
}

/// Build health check routes
pub fn routes() -> Router<AppContext> {
    Router::new().route("/health", get(health_check))
}

async fn health_check(State(ctx): State<AppContext>) -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "ok".to_string(),
        attester: ctx.attester.address().to_string(),
        cache_size: ctx.cache.len(),
    })
}
