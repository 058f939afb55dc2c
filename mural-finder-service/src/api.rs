//! HTTP API for the mural finder.
//!
//! This module provides the REST API endpoints for:
//! - Health and metrics monitoring
//! - Phrase search
//! - Annotated image display and download

use axum::{
    Json, Router,
    extract::State,
    http::{StatusCode, header},
    response::IntoResponse,
    routing::{get, post},
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::service::MuralFinderService;

pub mod images;
pub mod search;
use images::annotated_image_handler;
use search::search_handler;

/// Application state
pub struct AppState {
    pub service: Arc<MuralFinderService>,
    pub start_time: Instant,
    pub metrics: PrometheusHandle,
}

/// Build the API router
pub fn router(service: Arc<MuralFinderService>, metrics: PrometheusHandle) -> Router {
    let state = Arc::new(AppState {
        service,
        start_time: Instant::now(),
        metrics,
    });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/search", post(search_handler))
        .route("/images/{image_id}/annotated", get(annotated_image_handler));

    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .nest("/api", api_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// === Health & Metrics ===

async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let store_available = state.service.db.session().is_ok();

    Json(HealthResponse {
        status: (if store_available { "healthy" } else { "degraded" }).to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        store_available,
    })
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    uptime_seconds: u64,
    store_available: bool,
}

async fn metrics_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}
