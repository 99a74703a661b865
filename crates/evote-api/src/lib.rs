//! # evote-api — Axum API Service for eVote
//!
//! A voter proves identity with a one-time code sent by SMS and a simulated
//! biometric check, then casts exactly one vote. The state machine itself
//! lives in `evote-state`; this crate wires it to a store, a notification
//! sink, a code generator, and an HTTP surface.
//!
//! ## API Surface
//!
//! | Route                    | Module               | Step                  |
//! |--------------------------|----------------------|-----------------------|
//! | `POST /api/send-otp`     | [`routes::voting`]   | Request a code        |
//! | `POST /api/verify-otp`   | [`routes::voting`]   | Verify the code       |
//! | `POST /api/verify-iris`  | [`routes::voting`]   | Verify biometric      |
//! | `POST /api/vote`         | [`routes::voting`]   | Cast the vote         |
//! | `GET /api/status`        | [`routes::status`]   | Read-only progress    |
//! | `GET /health/*`          | this module          | Health checks         |
//! | `GET /metrics`           | this module          | Prometheus scrape     |
//! | `GET /openapi.json`      | [`openapi`]          | OpenAPI spec          |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer → CorsLayer → MetricsMiddleware → Handler
//! ```

pub mod bootstrap;
pub mod codegen;
pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod notify;
pub mod openapi;
pub mod routes;
pub mod service;
pub mod state;
pub mod store;

use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::middleware::from_fn;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Extension, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::middleware::ApiMetrics;
use crate::state::AppState;

/// Request bodies on this API are a handful of short strings.
const BODY_LIMIT: usize = 64 * 1024;

/// Assemble the full application router with all routes and middleware.
pub fn app(state: AppState) -> Router {
    let metrics_on = state.config.metrics_enabled;
    let metrics = state.metrics.clone();

    let mut api = Router::new()
        .merge(routes::voting::router())
        .merge(routes::status::router())
        .merge(openapi::router())
        .layer(DefaultBodyLimit::max(BODY_LIMIT));

    // Only register the metrics middleware when metrics are enabled.
    if metrics_on {
        api = api
            .layer(from_fn(middleware::metrics::metrics_middleware))
            .layer(Extension(metrics.clone()));
    }

    let api = api
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state.clone());

    let mut health = Router::new()
        .route("/health/liveness", get(liveness))
        .route("/health/readiness", get(readiness));

    if metrics_on {
        health = health
            .route("/metrics", get(prometheus_metrics))
            .layer(Extension(metrics));
    }

    let health = health.with_state(state);

    Router::new().merge(health).merge(api)
}

/// GET /metrics — Prometheus metrics scrape endpoint.
async fn prometheus_metrics(Extension(metrics): Extension<ApiMetrics>) -> impl IntoResponse {
    match metrics.gather_and_encode() {
        Ok(body) => (
            StatusCode::OK,
            [(
                axum::http::header::CONTENT_TYPE,
                "text/plain; version=0.0.4; charset=utf-8",
            )],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Failed to encode Prometheus metrics: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, e).into_response()
        }
    }
}

/// Liveness check. Always returns 200 if the process is running.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness check. 200 "ready" when the voter store answers a ping
/// within the store timeout, 503 otherwise.
async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    if let Err(e) = state.service.ping().await {
        tracing::warn!(store = state.service.store_backend(), "Store health check failed: {e}");
        return (StatusCode::SERVICE_UNAVAILABLE, "store unreachable").into_response();
    }
    (StatusCode::OK, "ready").into_response()
}
