//! Computed per-cell risk summary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Risk summary of one non-empty grid cell, produced by a computation pass.
///
/// The full set of zones is replaced on every recomputation; a zone never
/// outlives the pass that created it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskZone {
    /// Latitude of the cell center.
    pub latitude: f64,
    /// Longitude of the cell center.
    pub longitude: f64,
    /// Normalized risk score in `[0, 1]`.
    pub risk_level: f64,
    /// Events observed in the lookback window for this cell.
    pub earthquake_count: u64,
    /// Largest magnitude observed in the cell.
    pub max_magnitude: f64,
    /// Mean magnitude of the cell's events.
    pub mean_magnitude: f64,
    /// Most frequent region label among the cell's events.
    pub region_name: String,
    /// Timestamp of the pass that produced this zone.
    pub last_updated: DateTime<Utc>,
}

impl RiskZone {
    /// Returns `true` if the zone's risk level is at least `threshold`.
    #[must_use]
    pub fn is_at_least(&self, threshold: f64) -> bool {
        self.risk_level >= threshold
    }
}
