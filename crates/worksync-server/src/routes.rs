use std::time::Duration;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, Method, header};
use axum::routing::post;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;

use crate::handlers;
use crate::state::AppState;

const PREFLIGHT_MAX_AGE: Duration = Duration::from_secs(600);

/// The page posting state is served from the UI port (often inside an
/// iframe), so the request origin is mirrored back rather than using `*`.
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
        .max_age(PREFLIGHT_MAX_AGE)
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/sync",
            post(handlers::sync_state).fallback(handlers::unsupported_method),
        )
        .fallback(handlers::fallback)
        // Clients post their whole accumulated state; there is no size cap.
        .layer(DefaultBodyLimit::disable())
        .layer(cors_layer())
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        .with_state(state)
}
