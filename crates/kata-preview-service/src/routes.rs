//! Router configuration.
//!
//! This module sets up the Axum router with all routes and middleware.

use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{health, previews, usage};
use crate::state::AppState;

/// Create the service router with all routes and middleware.
///
/// # Routes
///
/// ## Public
/// - `GET /health` - Health check
///
/// ## Previews (optional ID token; unauthenticated calls are rejected)
/// - `POST /v1/previews` - Generate a kata preview
///
/// ## Usage (ID token auth)
/// - `GET /v1/usage` - Current period spend
/// - `GET /v1/usage/history` - Recorded periods, newest first
pub fn create_router(state: AppState) -> Router {
    let cors_origins = state.config.cors_origins.clone();
    let max_body_bytes = state.config.max_body_bytes;
    let request_timeout_seconds = state.config.request_timeout_seconds;
    let max_concurrent_previews = state.config.max_concurrent_previews;

    let cors = build_cors_layer(&cors_origins);

    let state = Arc::new(state);

    // Bounds requests waiting for a generation slot; the slots themselves
    // live in `AppState::preview_slots`.
    let preview_routes = Router::new()
        .route("/", post(previews::create_preview))
        .layer(ConcurrencyLimitLayer::new(max_concurrent_previews));

    let api_routes = Router::new()
        .nest("/previews", preview_routes)
        .route("/usage", get(usage::current_usage))
        .route("/usage/history", get(usage::usage_history));

    Router::new()
        .route("/health", get(health::health))
        .nest("/v1", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TimeoutLayer::new(Duration::from_secs(
            request_timeout_seconds,
        )))
        .with_state(state)
}

/// Build the CORS layer from configured origins.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
