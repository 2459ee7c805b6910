//! LTE Admin library.
//!
//! Server-rendered admin site on top of [`lte_admin_core`]: admin user
//! accounts, session login, password reset by email and the AdminLTE-style
//! dashboard whose menu is filtered by the signed-in user's permissions.
//!
//! The binary in `main.rs` only loads configuration, sets up logging and
//! serves [`build_router`]; everything else lives here so it can be tested.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod filters;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod site;
pub mod state;

use axum::Router;
use tower_http::services::ServeDir;
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tower_sessions::SessionStore;
use tracing::Span;

use middleware::{create_session_layer, no_cache_layer};
use routes::paths;
use state::AppState;

/// Directory served under `/static`.
pub const STATIC_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/static");

/// Build the full application router with its middleware stack.
///
/// `store` backs the session layer; production passes the `PostgreSQL`
/// store, tests pass an in-memory one.
pub fn build_router<S: SessionStore + Clone>(state: AppState, store: S) -> Router {
    let session_layer = create_session_layer(store, state.config().is_secure());

    routes::routes()
        .nest_service(paths::STATIC, ServeDir::new(STATIC_DIR))
        .layer(no_cache_layer())
        .layer(session_layer)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}
