use antimatter::{
    model::{AppDraft, AppQuery, AppRecord},
    policy::Availability,
};
use axum::{
    Json, Router,
    body::Bytes,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    routing::get,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::{bad_request, error::ApiError, routes::Data, state::AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_apps).post(submit_app))
        .route("/{id}", get(get_app).delete(delete_app))
        .route("/{id}/download", get(download_app))
}

#[derive(Clone, Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmitAppRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub developer_name: Option<String>,
    pub version: Option<String>,
    /// One of games, entertainment, health, weather, finance, home, music,
    /// sports, education, travel, utilities, social.
    pub category: Option<String>,
    pub ipa_path: Option<String>,
    /// iphone, ipad or both (default).
    pub device: Option<String>,
    pub icon_path: Option<String>,
    pub social_twitter: Option<String>,
    pub social_website: Option<String>,
    pub app_store_link: Option<String>,
    /// Quota and ownership key. Omit to submit anonymously.
    pub device_id: Option<String>,
}

impl From<SubmitAppRequest> for AppDraft {
    fn from(req: SubmitAppRequest) -> Self {
        AppDraft {
            name: req.name,
            description: req.description,
            developer_name: req.developer_name,
            version: req.version,
            category: req.category,
            ipa_path: req.ipa_path,
            device: req.device,
            icon_path: req.icon_path,
            social_twitter: req.social_twitter,
            social_website: req.social_website,
            app_store_link: req.app_store_link,
            device_id: req.device_id,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityResponse {
    pub remaining_ms: i64,
    pub label: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct SocialLinks {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub twitter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AppResponse {
    pub id: String,
    pub name: String,
    pub description: String,
    pub developer_name: String,
    pub version: String,
    pub category: String,
    pub ipa_path: String,
    pub device: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub social_links: Option<SocialLinks>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_store_link: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub can_download: bool,
    pub availability: AvailabilityResponse,
}

impl AppResponse {
    fn new(app: AppRecord, availability: Availability) -> Self {
        let social_links = (app.social_twitter.is_some() || app.social_website.is_some())
            .then(|| SocialLinks {
                twitter: app.social_twitter,
                website: app.social_website,
            });

        Self {
            id: app.id,
            name: app.name,
            description: app.description,
            developer_name: app.developer_name,
            version: app.version,
            category: app.category.to_string(),
            ipa_path: app.ipa_path,
            device: app.device.as_str().to_string(),
            icon_path: app.icon_path,
            social_links,
            app_store_link: app.app_store_link,
            status: app.status.to_string(),
            created_at: app.created_at,
            can_download: availability.can_download,
            availability: AvailabilityResponse {
                remaining_ms: availability.remaining_ms(),
                label: availability.label,
            },
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AppDetailResponse {
    #[serde(flatten)]
    pub app: AppResponse,
    pub can_delete: bool,
}

#[derive(Clone, Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ListAppsQuery {
    /// pending or approved. Ignored when `deviceId` is set.
    pub status: Option<String>,
    /// Only apps uploaded by this device, any status.
    pub device_id: Option<String>,
    /// Default 50, at most 100.
    pub limit: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct DeviceQuery {
    pub device_id: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeleteAppRequest {
    pub device_id: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct DeleteAppResponse {
    pub deleted: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DownloadResponse {
    pub id: String,
    pub ipa_path: String,
}

#[utoipa::path(
    post,
    path = "/api/apps",
    tag = "apps",
    request_body = SubmitAppRequest,
    responses(
        (status = 201, description = "App submitted for review", body = Data<AppResponse>),
        (status = 400, description = "Invalid submission"),
        (status = 402, description = "Free uploads used up, subscription required")
    )
)]
#[tracing::instrument(name = "POST /api/apps", skip(state, payload))]
pub async fn submit_app(
    State(state): State<AppState>,
    payload: Result<Json<SubmitAppRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Data<AppResponse>>), ApiError> {
    let Json(request) = payload?;
    let new_app = AppDraft::from(request).validate()?;
    let app = state.submissions.submit(new_app).await?;
    let availability = state.submissions.availability(&app);
    Ok((
        StatusCode::CREATED,
        Json(Data::new(AppResponse::new(app, availability))),
    ))
}

#[utoipa::path(
    get,
    path = "/api/apps",
    tag = "apps",
    params(ListAppsQuery),
    responses(
        (status = 200, description = "Apps, newest first", body = Data<Vec<AppResponse>>),
        (status = 400, description = "Unknown status")
    )
)]
#[tracing::instrument(name = "GET /api/apps", skip(state))]
pub async fn list_apps(
    State(state): State<AppState>,
    query: Result<Query<ListAppsQuery>, QueryRejection>,
) -> Result<Json<Data<Vec<AppResponse>>>, ApiError> {
    let Query(query) = query?;
    let limit = query.limit.as_deref().and_then(|l| l.trim().parse().ok());
    let query = AppQuery::new(query.status.as_deref(), query.device_id, limit)?;

    let apps = state.submissions.list(&query).await?;
    let data = apps
        .into_iter()
        .map(|app| {
            let availability = state.submissions.availability(&app);
            AppResponse::new(app, availability)
        })
        .collect();
    Ok(Json(Data::new(data)))
}

#[utoipa::path(
    get,
    path = "/api/apps/{id}",
    tag = "apps",
    params(("id" = String, Path, description = "App id"), DeviceQuery),
    responses(
        (status = 200, description = "App with review state", body = Data<AppDetailResponse>),
        (status = 404, description = "App not found")
    )
)]
#[tracing::instrument(name = "GET /api/apps/{id}", skip(state))]
pub async fn get_app(
    State(state): State<AppState>,
    Path(id): Path<String>,
    query: Result<Query<DeviceQuery>, QueryRejection>,
) -> Result<Json<Data<AppDetailResponse>>, ApiError> {
    let Query(query) = query?;
    let app = state
        .submissions
        .get(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("App not found"))?;

    let device_id = antimatter_types::utils::non_empty(query.device_id);
    let can_delete = app.is_owned_by(device_id.as_deref());
    let availability = state.submissions.availability(&app);
    Ok(Json(Data::new(AppDetailResponse {
        app: AppResponse::new(app, availability),
        can_delete,
    })))
}

#[utoipa::path(
    delete,
    path = "/api/apps/{id}",
    tag = "apps",
    params(("id" = String, Path, description = "App id")),
    request_body = DeleteAppRequest,
    responses(
        (status = 200, description = "App deleted", body = Data<DeleteAppResponse>),
        (status = 400, description = "deviceId missing"),
        (status = 403, description = "Not the uploading device"),
        (status = 404, description = "App not found")
    )
)]
#[tracing::instrument(name = "DELETE /api/apps/{id}", skip(state, body))]
pub async fn delete_app(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<Data<DeleteAppResponse>>, ApiError> {
    let request: DeleteAppRequest = serde_json::from_slice(&body).unwrap_or_default();
    let device_id = antimatter_types::utils::non_empty(request.device_id)
        .ok_or_else(|| bad_request!("deviceId required"))?;

    state.submissions.delete(&id, &device_id).await?;
    Ok(Json(Data::new(DeleteAppResponse { deleted: true })))
}

#[utoipa::path(
    get,
    path = "/api/apps/{id}/download",
    tag = "apps",
    params(("id" = String, Path, description = "App id")),
    responses(
        (status = 200, description = "App is downloadable", body = Data<DownloadResponse>),
        (status = 403, description = "App is still under review"),
        (status = 404, description = "App not found")
    )
)]
#[tracing::instrument(name = "GET /api/apps/{id}/download", skip(state))]
pub async fn download_app(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Data<DownloadResponse>>, ApiError> {
    let app = state
        .submissions
        .get(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("App not found"))?;

    let availability = state.submissions.availability(&app);
    if !availability.can_download {
        return Err(ApiError::under_review(availability.label));
    }

    Ok(Json(Data::new(DownloadResponse {
        id: app.id,
        ipa_path: app.ipa_path,
    })))
}
