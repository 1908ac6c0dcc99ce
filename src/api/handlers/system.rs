//! System endpoints: health check and active risk policy.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;

use crate::app_state::AppState;

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    status: String,
    timestamp: String,
    version: String,
}

/// `GET /health`: Service health status.
#[utoipa::path(
    get,
    path = "/health",
    tag = "System",
    summary = "Health check",
    description = "Returns service health status, version, and current timestamp.",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
    )
)]
pub async fn health_handler() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy".to_string(),
            timestamp: Utc::now().to_rfc3339(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }),
    )
}

/// Aggregation parameters in effect.
#[derive(Debug, Serialize, ToSchema)]
pub struct RiskPolicyInfo {
    cell_size_degrees: f64,
    lookback_days: u32,
    frequency_weight: f64,
    magnitude_weight: f64,
    count_ceiling: f64,
    magnitude_ceiling: f64,
    high_risk_threshold: f64,
}

/// `GET /config/risk-policy`: Active grid and scoring parameters.
#[utoipa::path(
    get,
    path = "/config/risk-policy",
    tag = "System",
    summary = "Active risk policy",
    description = "Returns the cell size, lookback window and scoring constants used by recomputation.",
    responses(
        (status = 200, description = "Risk policy", body = RiskPolicyInfo),
    )
)]
pub async fn risk_policy_handler(State(state): State<AppState>) -> impl IntoResponse {
    let config = state.risk_service.engine().config();
    (
        StatusCode::OK,
        Json(RiskPolicyInfo {
            cell_size_degrees: config.cell_size_degrees,
            lookback_days: config.lookback_days,
            frequency_weight: config.policy.frequency_weight,
            magnitude_weight: config.policy.magnitude_weight,
            count_ceiling: config.policy.count_ceiling,
            magnitude_ceiling: config.policy.magnitude_ceiling,
            high_risk_threshold: state.risk_service.high_risk_threshold(),
        }),
    )
}

/// System routes mounted at the root level (not under /api/v1).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_handler))
        .route("/config/risk-policy", get(risk_policy_handler))
}
