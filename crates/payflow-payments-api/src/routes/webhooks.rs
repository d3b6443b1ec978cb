//! Provider webhook ingestion route.

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::{Json, Router, routing::post};
use serde::Serialize;
use tracing::instrument;

use payflow_payments::application::external_updates::handle_external_webhook;
use payflow_payments::domain::commands::HandleExternalWebhook;

use crate::error::ApiError;
use crate::state::AppState;

/// Header carrying the provider signature.
const SIGNATURE_HEADER: &str = "x-webhook-signature";

/// Acknowledgement body for accepted webhooks.
#[derive(Serialize)]
pub struct WebhookAccepted {
    /// Always `accepted`.
    pub status: &'static str,
}

/// POST /webhooks/{provider}
#[instrument(skip(state, headers, body), fields(provider = %provider))]
async fn ingest(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAccepted>, ApiError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);

    let command = HandleExternalWebhook {
        provider,
        payload: body.to_vec(),
        signature,
    };

    handle_external_webhook(
        &command,
        state.clock.as_ref(),
        state.verifier.as_ref(),
        state.publisher.as_ref(),
    )
    .await?;

    Ok(Json(WebhookAccepted { status: "accepted" }))
}

/// Returns the webhooks router.
pub fn router() -> Router<AppState> {
    Router::new().route("/webhooks/{provider}", post(ingest))
}
