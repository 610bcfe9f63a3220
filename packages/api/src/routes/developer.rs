use antimatter::{billing::is_plausible_email, model::UsageSummary};
use axum::{
    Json, Router,
    extract::{
        Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::{bad_request, error::ApiError, routes::Data, state::AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/usage", get(usage))
        .route("/verify-subscription", post(verify_subscription))
}

#[derive(Clone, Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct UsageQuery {
    pub device_id: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UsageResponse {
    pub upload_count: u64,
    pub is_subscribed: bool,
    pub free_limit: u32,
    pub can_upload: bool,
}

impl From<UsageSummary> for UsageResponse {
    fn from(summary: UsageSummary) -> Self {
        Self {
            upload_count: summary.upload_count,
            is_subscribed: summary.is_subscribed,
            free_limit: summary.free_limit,
            can_upload: summary.can_upload,
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifySubscriptionRequest {
    pub device_id: Option<String>,
    pub email: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifySubscriptionResponse {
    pub success: bool,
    pub current_period_end: Option<DateTime<Utc>>,
    pub can_upload: bool,
}

#[utoipa::path(
    get,
    path = "/api/developer/usage",
    tag = "developer",
    params(UsageQuery),
    responses(
        (status = 200, description = "Upload quota of the device", body = Data<UsageResponse>),
        (status = 400, description = "deviceId missing")
    )
)]
#[tracing::instrument(name = "GET /api/developer/usage", skip(state))]
pub async fn usage(
    State(state): State<AppState>,
    query: Result<Query<UsageQuery>, QueryRejection>,
) -> Result<Json<Data<UsageResponse>>, ApiError> {
    let Query(query) = query?;
    let device_id = antimatter_types::utils::non_empty(query.device_id)
        .ok_or_else(|| bad_request!("deviceId required"))?;

    let summary = state.submissions.usage(&device_id).await?;
    Ok(Json(Data::new(summary.into())))
}

#[utoipa::path(
    post,
    path = "/api/developer/verify-subscription",
    tag = "developer",
    request_body = VerifySubscriptionRequest,
    responses(
        (status = 200, description = "Subscription linked to the device", body = Data<VerifySubscriptionResponse>),
        (status = 400, description = "deviceId or email missing"),
        (status = 404, description = "No active subscription for this email"),
        (status = 503, description = "Payment provider not configured")
    )
)]
#[tracing::instrument(name = "POST /api/developer/verify-subscription", skip(state, payload))]
pub async fn verify_subscription(
    State(state): State<AppState>,
    payload: Result<Json<VerifySubscriptionRequest>, JsonRejection>,
) -> Result<Json<Data<VerifySubscriptionResponse>>, ApiError> {
    let request = payload.map(|Json(r)| r).unwrap_or_default();
    let device_id = antimatter_types::utils::non_empty(request.device_id);
    let email = antimatter_types::utils::non_empty(request.email);
    let (Some(device_id), Some(email)) = (device_id, email.filter(|e| is_plausible_email(e)))
    else {
        return Err(bad_request!("deviceId and email required"));
    };

    let verifier = state
        .verifier
        .as_ref()
        .ok_or_else(|| ApiError::service_unavailable("Subscription verification is not configured"))?;

    let record = verifier.verify(&device_id, &email).await?;
    Ok(Json(Data::new(VerifySubscriptionResponse {
        success: true,
        current_period_end: record.current_period_end,
        can_upload: true,
    })))
}
