//! HTTP API server for the live member count.
//!
//! A thin facade over the member store: mutation routes that keep the
//! counter in lockstep with the ledger, an O(1) count read, an on-demand
//! recalculation hook, plus structured logging (tracing) and Prometheus
//! metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{delete, get, post, put};
use member_store::MemberStore;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use routes::members::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: MemberStore + Clone + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/count", get(routes::count::get::<S>))
        .route("/count/recalculate", post(routes::count::recalculate::<S>))
        .route("/members", post(routes::members::create::<S>))
        .route("/members/{id}", get(routes::members::get::<S>))
        .route("/members/{id}", put(routes::members::update::<S>))
        .route("/members/{id}", delete(routes::members::remove::<S>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
