use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    routing::post,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{bad_request, error::ApiError, state::AppState};

pub fn routes() -> Router<AppState> {
    Router::new().route("/register", post(register))
}

#[derive(Clone, Debug, Deserialize, ToSchema)]
pub struct RegisterPushRequest {
    pub token: String,
    pub enabled: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct RegisterPushResponse {
    pub ok: bool,
}

#[utoipa::path(
    post,
    path = "/api/push/register",
    tag = "push",
    request_body = RegisterPushRequest,
    responses(
        (status = 200, description = "Token stored", body = RegisterPushResponse),
        (status = 400, description = "Invalid request")
    )
)]
#[tracing::instrument(name = "POST /api/push/register", skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterPushRequest>, JsonRejection>,
) -> Result<Json<RegisterPushResponse>, ApiError> {
    let Ok(Json(request)) = payload else {
        return Err(bad_request!("Invalid request"));
    };
    let token = request.token.trim();
    if token.is_empty() {
        return Err(bad_request!("Token is required"));
    }

    state
        .store
        .upsert_push_token(token, request.enabled, state.clock.now())
        .await?;

    tracing::debug!(enabled = request.enabled, "Push token registered");
    Ok(Json(RegisterPushResponse { ok: true }))
}
