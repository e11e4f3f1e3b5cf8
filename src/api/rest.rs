// =============================================================================
// REST API Endpoints — Axum 0.7
// =============================================================================
//
// All endpoints live under `/api/v1/`. Reads are served straight from the
// published chart snapshot; writes (instrument selection, indicator config)
// are enqueued as session events and applied by the single session loop, so
// the API layer never mutates the bar sequence itself.
//
// CORS is configured permissively for development; tighten the allowed
// origins in production.
// =============================================================================

use std::sync::Arc;

use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::api::ApiContext;
use crate::indicators::IndicatorConfig;
use crate::session::SessionEvent;

// =============================================================================
// Router construction
// =============================================================================

/// Build the full REST API router with CORS middleware and shared context.
pub fn router(ctx: Arc<ApiContext>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/v1/health", get(health))
        .route("/api/v1/snapshot", get(snapshot))
        .route("/api/v1/instrument", post(select_instrument))
        .route("/api/v1/indicators", get(get_indicators))
        .route("/api/v1/indicators", post(set_indicators))
        .route("/api/v1/ws", get(crate::api::ws::ws_handler))
        .layer(cors)
        .with_state(ctx)
}

// =============================================================================
// Health
// =============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    snapshot_version: u64,
    server_time: i64,
}

async fn health(State(ctx): State<Arc<ApiContext>>) -> impl IntoResponse {
    let resp = HealthResponse {
        status: "ok",
        snapshot_version: ctx.chart.current_version(),
        server_time: chrono::Utc::now().timestamp_millis(),
    };
    Json(resp)
}

// =============================================================================
// Chart snapshot
// =============================================================================

async fn snapshot(State(ctx): State<Arc<ApiContext>>) -> impl IntoResponse {
    Json(ctx.chart.snapshot())
}

// =============================================================================
// Instrument selection
// =============================================================================

#[derive(Deserialize)]
struct SelectInstrumentRequest {
    ticker: String,
}

#[derive(Serialize)]
struct AcceptedResponse {
    status: &'static str,
}

async fn select_instrument(
    State(ctx): State<Arc<ApiContext>>,
    Json(req): Json<SelectInstrumentRequest>,
) -> impl IntoResponse {
    let ticker = req.ticker.trim().to_uppercase();
    if ticker.is_empty() {
        return (StatusCode::BAD_REQUEST, "ticker must not be empty").into_response();
    }

    info!(ticker = %ticker, "instrument selection requested");
    if ctx
        .events
        .send(SessionEvent::SelectInstrument(ticker))
        .await
        .is_err()
    {
        warn!("session loop unavailable — selection dropped");
        return (StatusCode::SERVICE_UNAVAILABLE, "session loop unavailable").into_response();
    }

    (StatusCode::ACCEPTED, Json(AcceptedResponse { status: "accepted" })).into_response()
}

// =============================================================================
// Indicator configuration
// =============================================================================

async fn get_indicators(State(ctx): State<Arc<ApiContext>>) -> impl IntoResponse {
    Json(ctx.chart.snapshot().indicator_config)
}

async fn set_indicators(
    State(ctx): State<Arc<ApiContext>>,
    Json(config): Json<IndicatorConfig>,
) -> impl IntoResponse {
    info!("indicator configuration update requested");
    if ctx
        .events
        .send(SessionEvent::SetIndicatorConfig(config))
        .await
        .is_err()
    {
        warn!("session loop unavailable — indicator update dropped");
        return (StatusCode::SERVICE_UNAVAILABLE, "session loop unavailable").into_response();
    }

    (StatusCode::ACCEPTED, Json(AcceptedResponse { status: "accepted" })).into_response()
}
