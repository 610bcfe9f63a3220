use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::HeaderMap,
    routing::post,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{error::ApiError, state::AppState};

pub const SIGNATURE_HEADER: &str = "stripe-signature";

pub fn routes() -> Router<AppState> {
    Router::new().route("/stripe", post(stripe_webhook))
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct WebhookAck {
    pub received: bool,
}

#[utoipa::path(
    post,
    path = "/api/webhooks/stripe",
    tag = "webhooks",
    request_body(content = String, description = "Raw signed event body"),
    responses(
        (status = 200, description = "Event authenticated and processed", body = WebhookAck),
        (status = 400, description = "Missing or invalid signature"),
        (status = 503, description = "Webhook secret not configured")
    )
)]
#[tracing::instrument(name = "POST /api/webhooks/stripe", skip(state, headers, payload))]
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Bytes,
) -> Result<Json<WebhookAck>, ApiError> {
    let reconciler = state
        .webhooks
        .as_ref()
        .ok_or_else(|| ApiError::service_unavailable("Webhook not configured"))?;

    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());

    let outcome = reconciler.handle(&payload, signature).await?;
    tracing::info!(outcome = ?outcome, "Webhook processed");

    Ok(Json(WebhookAck { received: true }))
}
