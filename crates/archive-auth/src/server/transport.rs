//! Router assembly.

use std::sync::Arc;

use axum::{
    Json, Router,
    middleware::from_fn_with_state,
    response::IntoResponse,
    routing::{get, post, put},
};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use super::HttpState;
use super::oauth::{handlers, require_bearer};
use super::videos;
use crate::config::oauth::TOKEN_PATH;

/// Create the HTTP router.
///
/// Everything under `protected` sits behind the bearer gate; the gate runs as a
/// route layer so unknown paths still 404 instead of 401.
pub fn create_router(state: Arc<HttpState>) -> Router {
    let protected = Router::new()
        .route("/private/video/{id}", put(videos::put_video))
        .route_layer(from_fn_with_state(state.gate.clone(), require_bearer));

    Router::new()
        .route("/health", get(health_check))
        .route(TOKEN_PATH, post(handlers::handle_token))
        .merge(protected)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "archive-auth",
        "version": env!("CARGO_PKG_VERSION")
    }))
}
