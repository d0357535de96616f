//! Node-to-node cache endpoint.

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
};
use std::sync::Arc;

use meshcache_core::Error;

use crate::AppState;

/// Serves `GET /meshcache/{group}/{key}` for peers.
///
/// The response body is the raw value bytes; peers never see JSON here.
pub async fn peer_fetch(
    State(state): State<Arc<AppState>>,
    Path((group_name, key)): Path<(String, String)>,
) -> impl IntoResponse {
    let group = match state.registry.group(&group_name) {
        Some(g) => g,
        None => {
            return (
                StatusCode::NOT_FOUND,
                Error::GroupNotFound(group_name).to_string(),
            )
                .into_response()
        }
    };

    // Group::get blocks (peer fetch or loader I/O); keep it off the
    // async runtime.
    let result = tokio::task::spawn_blocking(move || group.get(&key)).await;

    match result {
        Ok(Ok(chunk)) => (
            [(header::CONTENT_TYPE, "application/octet-stream")],
            chunk.to_vec(),
        )
            .into_response(),
        Ok(Err(e @ Error::KeyRequired)) => {
            (StatusCode::BAD_REQUEST, e.to_string()).into_response()
        }
        Ok(Err(e)) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Task panicked: {e}"),
        )
            .into_response(),
    }
}

/// Fallback for every path the peer protocol does not define.
pub async fn bad_request() -> impl IntoResponse {
    (StatusCode::BAD_REQUEST, "bad request")
}
