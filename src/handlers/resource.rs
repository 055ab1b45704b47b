use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, HeaderMap},
};
use serde_json::Value;

use crate::error::ApiError;
use crate::middleware::ResourceResponse;
use crate::server::AppState;
use crate::types::RequestContext;

fn parse_json(body: &Bytes) -> Result<Value, ApiError> {
    if body.is_empty() {
        return Err(ApiError::invalid_json("request body is empty"));
    }
    serde_json::from_slice(body).map_err(|e| ApiError::invalid_json(format!("invalid JSON body: {}", e)))
}

fn header_str<'a>(headers: &'a HeaderMap, name: header::HeaderName) -> Result<Option<&'a str>, ApiError> {
    headers
        .get(&name)
        .map(|v| v.to_str().map_err(|_| ApiError::bad_request(format!("invalid {} header", name))))
        .transpose()
}

/// POST {collection}
pub async fn resource_create(
    State(state): State<AppState>,
    ctx: RequestContext,
    body: Bytes,
) -> Result<ResourceResponse, ApiError> {
    let body = parse_json(&body)?;
    let representation = state.handler.create(&ctx, body).await?;
    Ok(ResourceResponse::created(representation))
}

/// GET {collection}/:id
pub async fn resource_get(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ctx: RequestContext,
) -> Result<ResourceResponse, ApiError> {
    let representation = state.handler.read(&ctx, &id).await?;
    Ok(ResourceResponse::found(representation))
}

/// DELETE {collection}/:id
pub async fn resource_delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ctx: RequestContext,
) -> Result<ResourceResponse, ApiError> {
    let representation = state.handler.delete(&ctx, &id).await?;
    Ok(ResourceResponse::ok(representation))
}

/// PATCH {collection}/:id - requires If-Match
pub async fn resource_patch(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ctx: RequestContext,
    headers: HeaderMap,
    body: Bytes,
) -> Result<ResourceResponse, ApiError> {
    let if_match = header_str(&headers, header::IF_MATCH)?;
    let content_type = header_str(&headers, header::CONTENT_TYPE)?;
    let patch = parse_json(&body)?;

    let representation = state
        .handler
        .update(&ctx, &id, patch, content_type, if_match)
        .await?;
    Ok(ResourceResponse::ok(representation))
}

/// PUT {collection}/:id - full replacement of an existing resource
pub async fn resource_put(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ctx: RequestContext,
    body: Bytes,
) -> Result<ResourceResponse, ApiError> {
    let body = parse_json(&body)?;
    let representation = state.handler.put(&ctx, &id, body).await?;
    Ok(ResourceResponse::ok(representation))
}
