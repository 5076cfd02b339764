/// Chain attestation endpoints
use crate::{
    attestation::AttestationReceipt,
    context::AppContext,
    error::SignerResult,
};
use axum::{
    extract::{rejection::JsonRejection, State},
    response::Json,
    routing::post,
    Router,
};
use serde::Deserialize;
use tracing::debug;

/// Lift request body
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiftRequest {
    pub cp_id: Option<String>,
    pub did: Option<String>,
}

/// Build chain routes
pub fn routes() -> Router<AppContext> {
    Router::new().route("/chain/lift", post(lift))
}

/// Attest a (cpId, did) binding on the ledger
async fn lift(
    State(ctx): State<AppContext>,
    body: Result<Json<LiftRequest>, JsonRejection>,
) -> SignerResult<Json<AttestationReceipt>> {
    // Unparseable or non-string fields count as missing
    let request = match body {
        Ok(Json(request)) => request,
        Err(rejection) => {
            debug!("Unreadable lift body: {}", rejection);
            LiftRequest::default()
        }
    };

    let cp_id = request.cp_id.unwrap_or_default();
    let did = request.did.unwrap_or_default();

    let receipt = ctx.attester.attest(&cp_id, &did).await?;
    Ok(Json(receipt))
}
