//! Request/Response types for the MeshCache HTTP surfaces.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Error payload returned by the admin API.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Human-readable error message.
    pub error: String,
}

/// Query parameters of the admin `/api` endpoint.
#[derive(Debug, Deserialize)]
pub struct ApiParams {
    /// Key to look up in the node's front-end group.
    pub key: String,
}
