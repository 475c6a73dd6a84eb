//! # carelink-api: HTTP Service for Disputes and Caregiver Wallets
//!
//! ## API Surface
//!
//! | Prefix              | Module                | Domain                         |
//! |---------------------|-----------------------|--------------------------------|
//! | `/disputes/*`       | [`routes::disputes`]  | Case lifecycle and decisions   |
//! | `/wallet/*`         | [`routes::wallet`]    | Earnings ledger and admin ops  |
//! | `/openapi.json`     | [`openapi`]           | Generated API document         |
//! | `/health/*`         | this module           | Liveness and readiness checks  |
//! | `/metrics`          | this module           | Prometheus scrape endpoint     |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer → MetricsMiddleware → Handler
//! ```
//!
//! Authentication and authorization happen upstream of this service;
//! admin and party identities arrive in request bodies.

pub mod db;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod openapi;
pub mod reporting;
pub mod routes;
pub mod state;

use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::middleware::from_fn;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Assemble the full application router with all routes and middleware.
pub fn app(state: AppState) -> Router {
    let metrics_on = state.config.metrics_enabled;

    let mut api = Router::new()
        .merge(routes::disputes::router())
        .merge(routes::wallet::router())
        .merge(openapi::router())
        .layer(DefaultBodyLimit::max(2 * 1024 * 1024));

    if metrics_on {
        api = api.layer(from_fn(middleware::metrics::metrics_middleware));
    }

    let api = api.layer(TraceLayer::new_for_http()).with_state(state.clone());

    let mut health = Router::new()
        .route("/health/liveness", get(liveness))
        .route("/health/readiness", get(readiness));
    if metrics_on {
        health = health.route("/metrics", get(prometheus_metrics));
    }

    Router::new().merge(health.with_state(state)).merge(api)
}

/// Liveness check. The process is up.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness check. Returns 503 while the database is unreachable.
async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    if let Some(pool) = &state.db_pool {
        if let Err(e) = sqlx::query("SELECT 1").execute(pool).await {
            tracing::warn!("Database health check failed: {e}");
            return (StatusCode::SERVICE_UNAVAILABLE, "database unreachable").into_response();
        }
    }
    (StatusCode::OK, "ready").into_response()
}

/// GET /metrics: Prometheus text exposition.
async fn prometheus_metrics() -> impl IntoResponse {
    match middleware::metrics::render_metrics() {
        Some(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        None => (StatusCode::SERVICE_UNAVAILABLE, "metrics recorder not installed").into_response(),
    }
}
