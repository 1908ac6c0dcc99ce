//! Earthquake handlers: ingest, list, get, delete, statistics.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use crate::api::dto::{
    DataResponse, EarthquakeDto, EarthquakeQuery, IngestRequest, IngestResponse, ListResponse,
    StatisticsResponse,
};
use crate::app_state::AppState;
use crate::error::{ErrorResponse, RiskError};

/// `POST /earthquakes`: Ingest a batch of normalized records.
///
/// # Errors
///
/// Returns [`RiskError::InvalidEarthquake`] naming the first invalid record;
/// nothing is stored in that case.
#[utoipa::path(
    post,
    path = "/api/v1/earthquakes",
    tag = "Earthquakes",
    summary = "Ingest earthquakes",
    description = "Validates and stores a batch of normalized earthquake records. Records whose source id is already known are counted as duplicates and skipped. One invalid record rejects the whole batch.",
    request_body = IngestRequest,
    responses(
        (status = 201, description = "Batch stored", body = IngestResponse),
        (status = 400, description = "Invalid batch", body = ErrorResponse),
    )
)]
pub async fn ingest_earthquakes(
    State(state): State<AppState>,
    payload: Result<Json<IngestRequest>, JsonRejection>,
) -> Result<impl IntoResponse, RiskError> {
    let Json(req) = payload?;
    let quakes = req.into_earthquakes()?;
    let outcome = state.earthquake_service.ingest(quakes).await?;

    Ok((
        StatusCode::CREATED,
        Json(IngestResponse {
            success: true,
            received: outcome.received,
            stored: outcome.stored,
            duplicates: outcome.duplicates,
        }),
    ))
}

/// `GET /earthquakes`: Filtered listing, newest first.
///
/// # Errors
///
/// Returns [`RiskError::InvalidRequest`] for malformed or inverted filters.
#[utoipa::path(
    get,
    path = "/api/v1/earthquakes",
    tag = "Earthquakes",
    summary = "List earthquakes",
    description = "Returns stored earthquakes filtered by magnitude range, region substring and age in days.",
    params(EarthquakeQuery),
    responses(
        (status = 200, description = "Earthquake list", body = ListResponse<EarthquakeDto>),
        (status = 400, description = "Invalid filter", body = ErrorResponse),
    )
)]
pub async fn list_earthquakes(
    State(state): State<AppState>,
    query: Result<Query<EarthquakeQuery>, QueryRejection>,
) -> Result<impl IntoResponse, RiskError> {
    let Query(query) = query?;
    let rows = state.earthquake_service.list(&query.to_filter()).await?;
    let data: Vec<EarthquakeDto> = rows.into_iter().map(EarthquakeDto::from).collect();
    Ok(Json(ListResponse::new(data)))
}

/// `GET /earthquakes/{id}`: Single event detail.
///
/// # Errors
///
/// Returns [`RiskError::EarthquakeNotFound`] for an unknown ID.
#[utoipa::path(
    get,
    path = "/api/v1/earthquakes/{id}",
    tag = "Earthquakes",
    summary = "Get earthquake",
    params(
        ("id" = i64, Path, description = "Store-assigned earthquake ID"),
    ),
    responses(
        (status = 200, description = "Earthquake detail", body = DataResponse<EarthquakeDto>),
        (status = 400, description = "Malformed ID", body = ErrorResponse),
        (status = 404, description = "Earthquake not found", body = ErrorResponse),
    )
)]
pub async fn get_earthquake(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<impl IntoResponse, RiskError> {
    let Path(id) = id?;
    let row = state.earthquake_service.get(id).await?;
    Ok(Json(DataResponse::new(EarthquakeDto::from(row))))
}

/// `DELETE /earthquakes/{id}`: Admin deletion.
///
/// # Errors
///
/// Returns [`RiskError::EarthquakeNotFound`] for an unknown ID.
#[utoipa::path(
    delete,
    path = "/api/v1/earthquakes/{id}",
    tag = "Earthquakes",
    summary = "Delete earthquake",
    description = "Removes a stored event. Zones change only on the next recomputation.",
    params(
        ("id" = i64, Path, description = "Store-assigned earthquake ID"),
    ),
    responses(
        (status = 200, description = "Deleted earthquake", body = DataResponse<EarthquakeDto>),
        (status = 400, description = "Malformed ID", body = ErrorResponse),
        (status = 404, description = "Earthquake not found", body = ErrorResponse),
    )
)]
pub async fn delete_earthquake(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<impl IntoResponse, RiskError> {
    let Path(id) = id?;
    let removed = state.earthquake_service.delete(id).await?;
    Ok(Json(DataResponse::new(EarthquakeDto::from(removed))))
}

/// `GET /statistics`: Aggregate counts.
///
/// # Errors
///
/// Returns a persistence error if the store cannot be read.
#[utoipa::path(
    get,
    path = "/api/v1/statistics",
    tag = "Earthquakes",
    summary = "Earthquake statistics",
    description = "Totals, last-7-day count, magnitude class partition and mean magnitude.",
    responses(
        (status = 200, description = "Statistics", body = DataResponse<StatisticsResponse>),
    )
)]
pub async fn statistics(State(state): State<AppState>) -> Result<impl IntoResponse, RiskError> {
    let stats = state.earthquake_service.statistics().await?;
    Ok(Json(DataResponse::new(StatisticsResponse::from(stats))))
}

/// Earthquake routes, nested under `/api/v1`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/earthquakes",
            get(list_earthquakes).post(ingest_earthquakes),
        )
        .route(
            "/earthquakes/{id}",
            get(get_earthquake).delete(delete_earthquake),
        )
        .route("/statistics", get(statistics))
}
