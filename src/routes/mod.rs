pub mod documents;
pub mod health;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::HeaderValue,
    routing::{get, post},
};
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::state::AppState;

/// Room for multipart framing on top of the file itself.
const MULTIPART_OVERHEAD: usize = 1024 * 1024;

pub fn router(state: AppState) -> Router {
    let body_limit = state.config.processing.max_file_size + MULTIPART_OVERHEAD;
    let cors = cors_layer(&state.config.server);

    Router::new()
        .route("/health", get(health::health_check))
        .route("/documents", get(documents::list))
        .route("/documents/upload", post(documents::upload))
        .route("/documents/search", post(documents::search))
        .route("/documents/supported-types", get(documents::supported_types))
        .route(
            "/documents/{id}",
            get(documents::get_document).delete(documents::delete_document),
        )
        .route("/documents/{id}/reprocess", post(documents::reprocess))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(config: &ServerConfig) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true);

    // credentials rule out a literal `*`, so a wildcard echoes the caller's origin
    if config.allowed_origins.iter().any(|origin| origin.trim() == "*") {
        return layer.allow_origin(AllowOrigin::mirror_request());
    }

    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {origin}");
                None
            }
        })
        .collect();

    layer.allow_origin(AllowOrigin::list(origins))
}
