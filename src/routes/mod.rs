//! Router assembly: HTTP endpoints, CORS, and HTTP tracing.

use std::sync::Arc;

use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::state::AppState;

pub mod http;

/// Build the application router with:
/// - REST-ish API under `/api/v1/...` (bearer auth except health/register/login)
/// - CORS (allow any origin/method/headers)
/// - HTTP trace layer (per-request spans w/ method, path, status, latency)
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/v1/health", get(http::http_health))
        .route("/api/v1/auth/register", post(http::http_register))
        .route("/api/v1/auth/login", post(http::http_login))
        .route("/api/v1/next-task", get(http::http_next_task))
        .route("/api/v1/submit-result", post(http::http_submit_result))
        .route("/api/v1/asr-submit", post(http::http_asr_submit))
        .route("/api/v1/profile", get(http::http_profile))
        .route("/api/v1/profile/update", post(http::http_update_profile))
        .route("/api/v1/profile/update-password", put(http::http_update_password))
        .route("/api/v1/streak", get(http::http_streak))
        .route("/api/v1/streak/update", put(http::http_update_streak))
        .route("/api/v1/leaderboard", get(http::http_leaderboard))
        .route("/api/v1/word-list", get(http::http_word_list))
        .route("/api/v1/random-word", get(http::http_random_word))
        .route("/api/v1/shop/buy-life", post(http::http_buy_life))
        // State + CORS + HTTP tracing
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
