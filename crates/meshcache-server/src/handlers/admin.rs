//! Front-end value lookup and cache statistics.

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use std::collections::BTreeMap;
use std::sync::Arc;

use meshcache_core::{CacheStats, Error};

use crate::types::{ApiParams, ErrorResponse};
use crate::AppState;

/// Look up a key in the node's front-end group.
#[utoipa::path(
    get,
    path = "/api",
    tag = "cache",
    params(
        ("key" = String, Query, description = "Key to look up")
    ),
    responses(
        (status = 200, description = "Cached value bytes", body = String, content_type = "application/octet-stream"),
        (status = 400, description = "Empty key", body = ErrorResponse),
        (status = 500, description = "Loader failure", body = ErrorResponse)
    )
)]
pub async fn api_get(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ApiParams>,
) -> impl IntoResponse {
    let group = Arc::clone(&state.api_group);

    // Group::get blocks; keep it off the async runtime.
    let result = tokio::task::spawn_blocking(move || group.get(&params.key)).await;

    match result {
        Ok(Ok(chunk)) => (
            [(header::CONTENT_TYPE, "application/octet-stream")],
            chunk.to_vec(),
        )
            .into_response(),
        Ok(Err(e @ Error::KeyRequired)) => (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: e.to_string(),
            }),
        )
            .into_response(),
        Ok(Err(e)) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: e.to_string(),
            }),
        )
            .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: format!("Task panicked: {e}"),
            }),
        )
            .into_response(),
    }
}

/// Cache statistics for every group on this node.
#[utoipa::path(
    get,
    path = "/stats",
    tag = "stats",
    responses(
        (status = 200, description = "Per-group cache statistics", body = Object)
    )
)]
pub async fn stats(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let groups: BTreeMap<String, CacheStats> = state
        .registry
        .group_names()
        .into_iter()
        .filter_map(|name| {
            let stats = state.registry.group(&name)?.stats();
            Some((name, stats))
        })
        .collect();
    Json(groups)
}
