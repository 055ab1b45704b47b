// handlers/mod.rs - HTTP entry points
//
// Resource handlers parse the request, hand it to the ResourceHandler
// pipeline and shape the Representation into a response. Everything else
// lives here.
pub mod resource;

pub use resource::{resource_create, resource_delete, resource_get, resource_patch, resource_put};

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

use crate::database::ResourceStore;
use crate::error::ApiError;
use crate::server::AppState;

/// GET /health - storage reachability
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match state.handler.store().health_check().await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "timestamp": now,
                "component": state.config.service.component,
                "database": "ok"
            })),
        ),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "degraded",
                    "timestamp": now,
                    "component": state.config.service.component,
                    "database": "unavailable"
                })),
            )
        }
    }
}

/// Fallback for paths outside the collection
pub async fn not_found() -> ApiError {
    ApiError::not_found("no such route")
}
