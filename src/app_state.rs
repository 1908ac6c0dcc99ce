//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::domain::EventBus;
use crate::service::{EarthquakeService, RiskService};

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Ingestion and event queries.
    pub earthquake_service: Arc<EarthquakeService>,
    /// Recomputation and zone queries.
    pub risk_service: Arc<RiskService>,
    /// Event bus for WebSocket subscriptions.
    pub event_bus: EventBus,
}
