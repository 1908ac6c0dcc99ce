//! Risk zone handlers: listings, recomputation trigger, activity estimate.

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::dto::{
    ActivityQuery, ActivityResponse, ListResponse, RecomputeResponse, RiskZoneDto, ZonesQuery,
};
use crate::app_state::AppState;
use crate::domain::activity::DEFAULT_RADIUS_KM;
use crate::error::{ErrorResponse, RiskError};

/// `GET /risk-zones`: Current zones, optionally above a minimum risk.
///
/// # Errors
///
/// Returns [`RiskError::InvalidRequest`] if `min_risk` is outside `[0, 1]`.
#[utoipa::path(
    get,
    path = "/api/v1/risk-zones",
    tag = "Risk Zones",
    summary = "List risk zones",
    description = "Returns the zones of the last successful recomputation, highest risk first.",
    params(ZonesQuery),
    responses(
        (status = 200, description = "Zone list", body = ListResponse<RiskZoneDto>),
        (status = 400, description = "Invalid min_risk", body = ErrorResponse),
    )
)]
pub async fn list_zones(
    State(state): State<AppState>,
    query: Result<Query<ZonesQuery>, QueryRejection>,
) -> Result<impl IntoResponse, RiskError> {
    let Query(query) = query?;
    let zones = state
        .risk_service
        .zones(query.min_risk.unwrap_or(0.0))
        .await?;
    let data: Vec<RiskZoneDto> = zones.into_iter().map(RiskZoneDto::from).collect();
    Ok(Json(ListResponse::new(data)))
}

/// `GET /risk-zones/high`: Zones at or above the high-risk threshold.
///
/// # Errors
///
/// Returns [`RiskError::InvalidRequest`] if `min_risk` is outside `[0, 1]`.
#[utoipa::path(
    get,
    path = "/api/v1/risk-zones/high",
    tag = "Risk Zones",
    summary = "List high-risk zones",
    description = "Returns zones with risk_level >= min_risk (default: the configured threshold, 0.7).",
    params(ZonesQuery),
    responses(
        (status = 200, description = "High-risk zones", body = ListResponse<RiskZoneDto>),
        (status = 400, description = "Invalid min_risk", body = ErrorResponse),
    )
)]
pub async fn list_high_risk_zones(
    State(state): State<AppState>,
    query: Result<Query<ZonesQuery>, QueryRejection>,
) -> Result<impl IntoResponse, RiskError> {
    let Query(query) = query?;
    let zones = state.risk_service.high_risk_zones(query.min_risk).await?;
    let data: Vec<RiskZoneDto> = zones.into_iter().map(RiskZoneDto::from).collect();
    Ok(Json(ListResponse::new(data)))
}

/// `POST /risk-zones/recompute`: Run a recomputation pass now.
///
/// # Errors
///
/// Returns an upstream error if the event window cannot be fetched, or a
/// persistence error if the replacement fails. Prior zones are kept.
#[utoipa::path(
    post,
    path = "/api/v1/risk-zones/recompute",
    tag = "Risk Zones",
    summary = "Recompute risk zones",
    description = "Fetches the lookback window, aggregates it into grid cells and atomically replaces the stored zones. Concurrent triggers are serialized.",
    responses(
        (status = 200, description = "Zones replaced", body = RecomputeResponse),
        (status = 502, description = "Event store unavailable", body = ErrorResponse),
        (status = 504, description = "Event fetch timed out", body = ErrorResponse),
        (status = 500, description = "Replacement failed", body = ErrorResponse),
    )
)]
pub async fn recompute_zones(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, RiskError> {
    let outcome = state.risk_service.recompute().await?;
    Ok(Json(RecomputeResponse::from(outcome)))
}

/// `GET /activity`: Local activity estimate around a point.
///
/// # Errors
///
/// Returns [`RiskError::InvalidRequest`] for out-of-range coordinates or a
/// non-positive radius.
#[utoipa::path(
    get,
    path = "/api/v1/activity",
    tag = "Risk Zones",
    summary = "Local activity estimate",
    description = "Frequency-based likelihood of further activity within radius_km of a point.",
    params(ActivityQuery),
    responses(
        (status = 200, description = "Activity estimate", body = ActivityResponse),
        (status = 400, description = "Invalid coordinates or radius", body = ErrorResponse),
    )
)]
pub async fn activity(
    State(state): State<AppState>,
    query: Result<Query<ActivityQuery>, QueryRejection>,
) -> Result<impl IntoResponse, RiskError> {
    let Query(query) = query?;
    let radius_km = query.radius_km.unwrap_or(DEFAULT_RADIUS_KM);
    let estimate = state
        .risk_service
        .activity(query.latitude, query.longitude, radius_km)
        .await?;
    Ok(Json(ActivityResponse::new(
        query.latitude,
        query.longitude,
        radius_km,
        estimate,
    )))
}

/// Risk routes, nested under `/api/v1`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/risk-zones", get(list_zones))
        .route("/risk-zones/high", get(list_high_risk_zones))
        .route("/risk-zones/recompute", post(recompute_zones))
        .route("/activity", get(activity))
}
