//! MeshCache Server - HTTP transport and admin API for a MeshCache node.
//!
//! Every node runs the same two surfaces:
//!
//! - the **peer endpoint** (`GET /meshcache/{group}/{key}`), spoken between
//!   nodes: the body is the raw value bytes, `404` means unknown group,
//!   `400` a malformed path, `500` a loader failure;
//! - the optional **admin API** (`GET /api?key=`, `/health`, `/stats`) on a
//!   separate port for front-end clients and operators.
//!
//! The [`HttpPool`] ties the consistent-hash ring to outbound HTTP fetches
//! and plugs into the engine as its peer picker.
//!
//! ## OpenAPI Documentation
//!
//! The admin API is documented with OpenAPI 3.0:
//! - Swagger UI: `GET /swagger-ui`
//! - OpenAPI JSON: `GET /api-docs/openapi.json`

mod handlers;
mod pool;
mod types;

use std::sync::Arc;

use axum::{routing::get, Router};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use meshcache_core::{Group, Registry};

pub use pool::{HttpGetter, HttpPool, BASE_PATH, DEFAULT_REPLICAS};
pub use types::ErrorResponse;

pub use handlers::admin::{api_get, stats};
pub use handlers::health::health_check;
pub use handlers::peer::peer_fetch;

// ============================================================================
// OpenAPI Documentation
// ============================================================================

/// MeshCache admin API documentation.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "MeshCache Admin API",
        description = "Front-end and operator surface of a MeshCache node. \
            Values are served read-through: local cache, owning peer, then \
            the node's own loader.",
        contact(name = "MeshCache Team", url = "https://github.com/meshcache/meshcache")
    ),
    servers(
        (url = "/", description = "Local node")
    ),
    tags(
        (name = "cache", description = "Cached value lookup"),
        (name = "health", description = "Health check endpoints"),
        (name = "stats", description = "Cache statistics")
    ),
    paths(
        handlers::admin::api_get,
        handlers::admin::stats,
        handlers::health::health_check
    ),
    components(schemas(ErrorResponse))
)]
pub struct ApiDoc;

// ============================================================================
// Application State
// ============================================================================

/// State shared across handlers of one node.
pub struct AppState {
    /// All groups this node serves on the peer endpoint.
    pub registry: Arc<Registry>,
    /// The group the admin `/api` endpoint reads from.
    pub api_group: Arc<Group>,
}

// ============================================================================
// Routers
// ============================================================================

/// Router for the peer-to-peer endpoint.
///
/// Any path other than `/meshcache/{group}/{key}` is a bad request: peers
/// only ever speak the base-path shape.
pub fn peer_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/meshcache/{group}/{key}", get(handlers::peer::peer_fetch))
        .fallback(handlers::peer::bad_request)
        .with_state(state)
}

/// Router for the admin API, with the Swagger UI mounted alongside.
pub fn admin_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api", get(handlers::admin::api_get))
        .route("/health", get(handlers::health::health_check))
        .route("/stats", get(handlers::admin::stats))
        .with_state(state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
