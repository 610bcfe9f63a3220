use std::sync::Arc;

use axum::{Json, Router, middleware::from_fn, routing::get};
use middleware::error_reporting::error_reporting_middleware;
use state::State;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

mod middleware;
mod routes;

pub mod cors;
pub mod entity;
pub mod error;
pub mod mail;
pub mod notify;
pub mod openapi;
pub mod payments;
pub mod push;
pub mod state;
pub mod store;

pub use axum;
pub use sea_orm;

pub fn construct_router(state: Arc<State>) -> Router {
    let cors = state.cors.layer();

    Router::new()
        .nest("/health", routes::health::routes())
        .nest("/api/apps", routes::apps::routes())
        .nest("/api/developer", routes::developer::routes())
        .nest("/api/webhooks", routes::webhook::routes())
        .nest("/api/push", routes::push::routes())
        .route("/api/openapi.json", get(openapi_json))
        .with_state(state)
        .layer(from_fn(error_reporting_middleware))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
}

#[tracing::instrument(name = "GET /api/openapi.json")]
async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(openapi::ApiDoc::openapi())
}
