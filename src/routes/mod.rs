//! Router assembly: HTTP endpoints, WebSocket upgrade, static files, CORS, and HTTP tracing.

use std::sync::Arc;

use axum::{
    routing::get,
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::state::AppState;

pub mod http;
pub mod ws;

/// Build the application router with:
/// - WebSocket lesson play at `/ws`
/// - JSON API under `/api/v1/...`
/// - Static Mini App bundle from `STATIC_DIR` with index fallback
/// - CORS (any origin; the Mini App is served from Telegram's webview)
/// - HTTP trace layer (per-request spans w/ method, path, status, latency)
pub fn build_router(state: Arc<AppState>) -> Router {
    let static_dir = state.config.static_dir.clone();
    let static_service = ServeDir::new(&static_dir)
        .append_index_html_on_directories(true)
        .not_found_service(ServeFile::new(static_dir.join("index.html")));

    Router::new()
        .route("/ws", get(ws::ws_upgrade))
        .route("/api/v1/health", get(http::http_health))
        .route(
            "/api/v1/users",
            get(http::http_get_user).post(http::http_post_user).put(http::http_put_user),
        )
        .route("/api/v1/users/check-nickname", get(http::http_check_nickname))
        .route(
            "/api/v1/users/progress",
            get(http::http_get_progress).post(http::http_post_progress),
        )
        .route("/api/v1/lessons", get(http::http_get_lessons).post(http::http_post_lesson))
        .route("/api/v1/exercises", get(http::http_get_exercises).post(http::http_post_exercise))
        .fallback_service(static_service)
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
}
