//! Risk zone, recomputation and activity DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::RiskZone;
use crate::domain::activity::ActivityEstimate;
use crate::service::RecomputeOutcome;

/// A risk zone as returned by the API.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RiskZoneDto {
    /// Cell center latitude.
    pub latitude: f64,
    /// Cell center longitude.
    pub longitude: f64,
    /// Risk score in `[0, 1]`.
    pub risk_level: f64,
    /// Events in the cell.
    pub earthquake_count: u64,
    /// Largest magnitude in the cell.
    pub max_magnitude: f64,
    /// Mean magnitude in the cell.
    pub mean_magnitude: f64,
    /// Most frequent region label in the cell.
    pub region_name: String,
    /// Timestamp of the pass that produced this zone.
    pub last_updated: DateTime<Utc>,
}

impl From<RiskZone> for RiskZoneDto {
    fn from(zone: RiskZone) -> Self {
        Self {
            latitude: zone.latitude,
            longitude: zone.longitude,
            risk_level: zone.risk_level,
            earthquake_count: zone.earthquake_count,
            max_magnitude: zone.max_magnitude,
            mean_magnitude: zone.mean_magnitude,
            region_name: zone.region_name,
            last_updated: zone.last_updated,
        }
    }
}

/// Query parameters for the zone listings.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ZonesQuery {
    /// Minimum risk level in `[0, 1]`.
    pub min_risk: Option<f64>,
}

/// Response body for `POST /api/v1/risk-zones/recompute`.
#[derive(Debug, Serialize, ToSchema)]
pub struct RecomputeResponse {
    /// Always `true`; failures use the error envelope.
    pub success: bool,
    /// Human-readable summary.
    pub message: String,
    /// Zones in the new generation.
    pub zones_updated: u64,
    /// Zones at or above the high-risk threshold.
    pub high_risk_zones: usize,
    /// Events inside the lookback window.
    pub events_considered: usize,
    /// Timestamp of the pass.
    pub computed_at: DateTime<Utc>,
}

impl From<RecomputeOutcome> for RecomputeResponse {
    fn from(outcome: RecomputeOutcome) -> Self {
        Self {
            success: true,
            message: outcome.message(),
            zones_updated: outcome.zones_updated,
            high_risk_zones: outcome.high_risk_zones,
            events_considered: outcome.events_considered,
            computed_at: outcome.computed_at,
        }
    }
}

/// Query parameters for `GET /api/v1/activity`.
#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ActivityQuery {
    /// Latitude of the point.
    pub latitude: f64,
    /// Longitude of the point.
    pub longitude: f64,
    /// Search radius in kilometers (default 100).
    pub radius_km: Option<f64>,
}

/// Response body for `GET /api/v1/activity`.
#[derive(Debug, Serialize, ToSchema)]
pub struct ActivityResponse {
    /// Always `true`.
    pub success: bool,
    /// Latitude of the point.
    pub latitude: f64,
    /// Longitude of the point.
    pub longitude: f64,
    /// Search radius used.
    pub radius_km: f64,
    /// Estimated probability in `[0, 1]`.
    pub probability: f64,
    /// `low`, `medium` or `high`.
    pub confidence: String,
    /// Events inside the search box.
    pub based_on_events: usize,
    /// Of those, events in the last 30 days.
    pub recent_activity: usize,
}

impl ActivityResponse {
    /// Builds the response for a query point.
    #[must_use]
    pub fn new(latitude: f64, longitude: f64, radius_km: f64, estimate: ActivityEstimate) -> Self {
        Self {
            success: true,
            latitude,
            longitude,
            radius_km,
            probability: estimate.probability,
            confidence: estimate.confidence.as_str().to_string(),
            based_on_events: estimate.based_on_events,
            recent_activity: estimate.recent_activity,
        }
    }
}
