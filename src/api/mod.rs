//! REST API layer: route handlers, DTOs, and router composition.
//!
//! Resource endpoints are mounted under `/api/v1`; `/health`,
//! `/config/risk-policy` and `/ws` live at the root.

pub mod dto;
pub mod handlers;

use std::time::Duration;

use axum::Router;
use axum::routing::get;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use crate::app_state::AppState;
use crate::ws::handler::ws_handler;

/// OpenAPI document for every REST endpoint.
#[derive(Debug, OpenApi)]
#[openapi(
    info(
        title = "quake-risk-gateway",
        description = "Seismic risk zone aggregation service"
    ),
    paths(
        handlers::system::health_handler,
        handlers::system::risk_policy_handler,
        handlers::earthquake::ingest_earthquakes,
        handlers::earthquake::list_earthquakes,
        handlers::earthquake::get_earthquake,
        handlers::earthquake::delete_earthquake,
        handlers::earthquake::statistics,
        handlers::risk::list_zones,
        handlers::risk::list_high_risk_zones,
        handlers::risk::recompute_zones,
        handlers::risk::activity,
    ),
    components(schemas(crate::error::ErrorResponse, crate::error::ErrorBody)),
    tags(
        (name = "System", description = "Health and configuration"),
        (name = "Earthquakes", description = "Event ingestion and queries"),
        (name = "Risk Zones", description = "Aggregated risk zones"),
    )
)]
pub struct ApiDoc;

/// Builds the complete API router with all REST endpoints.
pub fn build_router() -> Router<AppState> {
    Router::new()
        .nest("/api/v1", handlers::routes())
        .merge(handlers::system::routes())
}

/// Builds the full application: REST, WebSocket, docs and middleware.
pub fn build_app(state: AppState, request_timeout: Duration) -> Router {
    let router = Router::new()
        .merge(build_router())
        .route("/ws", get(ws_handler));

    #[cfg(feature = "swagger-ui")]
    let router = router.merge(
        utoipa_swagger_ui::SwaggerUi::new("/swagger-ui")
            .url("/api-docs/openapi.json", ApiDoc::openapi()),
    );

    router
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                .layer(TimeoutLayer::new(request_timeout)),
        )
        .with_state(state)
}
