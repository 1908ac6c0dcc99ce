//! Earthquake ingestion, listing and statistics DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::Earthquake;
use crate::error::RiskError;
use crate::persistence::{
    DEFAULT_QUERY_DAYS, DEFAULT_QUERY_LIMIT, EarthquakeFilter, EarthquakeStatistics,
    StoredEarthquake,
};

/// A normalized earthquake record as delivered by the ingestion job.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct EarthquakeRecord {
    /// Source-assigned unique identifier (e.g. the USGS event id).
    pub source_id: String,
    /// Reported magnitude.
    pub magnitude: f64,
    /// Hypocenter depth in kilometers.
    #[serde(default)]
    pub depth_km: f64,
    /// Latitude in degrees, `[-90, 90]`.
    pub latitude: f64,
    /// Longitude in degrees, `[-180, 180]`.
    pub longitude: f64,
    /// Free-text region label.
    #[serde(default)]
    pub region: String,
    /// Occurrence time (ISO-8601).
    pub occurred_at: DateTime<Utc>,
}

impl EarthquakeRecord {
    /// Validates the record into a domain [`Earthquake`].
    ///
    /// # Errors
    ///
    /// Returns [`RiskError::InvalidEarthquake`] if validation fails.
    pub fn into_earthquake(self) -> Result<Earthquake, RiskError> {
        Earthquake::new(
            self.source_id,
            self.magnitude,
            self.depth_km,
            self.latitude,
            self.longitude,
            self.region,
            self.occurred_at,
        )
    }
}

/// Request body for `POST /api/v1/earthquakes`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct IngestRequest {
    /// Records of the batch.
    pub earthquakes: Vec<EarthquakeRecord>,
}

impl IngestRequest {
    /// Validates every record. The first invalid record rejects the batch.
    ///
    /// # Errors
    ///
    /// Returns [`RiskError::InvalidRequest`] for an empty batch and
    /// [`RiskError::InvalidEarthquake`] naming the index of the first bad
    /// record.
    pub fn into_earthquakes(self) -> Result<Vec<Earthquake>, RiskError> {
        if self.earthquakes.is_empty() {
            return Err(RiskError::InvalidRequest(
                "earthquakes must not be empty".to_string(),
            ));
        }
        self.earthquakes
            .into_iter()
            .enumerate()
            .map(|(index, record)| {
                record.into_earthquake().map_err(|err| match err {
                    RiskError::InvalidEarthquake(msg) => {
                        RiskError::InvalidEarthquake(format!("record {index}: {msg}"))
                    }
                    other => other,
                })
            })
            .collect()
    }
}

/// Response body for `POST /api/v1/earthquakes`.
#[derive(Debug, Serialize, ToSchema)]
pub struct IngestResponse {
    /// Always `true`.
    pub success: bool,
    /// Records in the batch.
    pub received: u64,
    /// Records stored for the first time.
    pub stored: u64,
    /// Records skipped as already known.
    pub duplicates: u64,
}

/// A stored earthquake as returned by the API.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct EarthquakeDto {
    /// Store-assigned ID.
    pub id: i64,
    /// Source-assigned identifier.
    pub source_id: String,
    /// Reported magnitude.
    pub magnitude: f64,
    /// Depth in kilometers.
    pub depth_km: f64,
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Region label.
    pub region: String,
    /// Occurrence time.
    pub occurred_at: DateTime<Utc>,
    /// Insertion time.
    pub created_at: DateTime<Utc>,
    /// `minor`, `moderate` or `major`.
    pub magnitude_class: String,
    /// Map marker colour for the class.
    pub color: String,
}

impl From<StoredEarthquake> for EarthquakeDto {
    fn from(stored: StoredEarthquake) -> Self {
        let eq = &stored.earthquake;
        let class = eq.magnitude_class();
        Self {
            id: stored.id,
            source_id: eq.source_id().to_string(),
            magnitude: eq.magnitude(),
            depth_km: eq.depth_km(),
            latitude: eq.latitude(),
            longitude: eq.longitude(),
            region: eq.region().to_string(),
            occurred_at: eq.occurred_at(),
            created_at: stored.created_at,
            magnitude_class: class.as_str().to_string(),
            color: class.color().to_string(),
        }
    }
}

/// Query parameters for `GET /api/v1/earthquakes`.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct EarthquakeQuery {
    /// Inclusive lower magnitude bound.
    pub magnitude_min: Option<f64>,
    /// Inclusive upper magnitude bound.
    pub magnitude_max: Option<f64>,
    /// Case-insensitive region substring.
    pub region: Option<String>,
    /// Look back this many days (default 30, `0` = all).
    pub days: Option<u32>,
    /// Maximum rows (default 1000, max 20000).
    pub limit: Option<u32>,
}

impl EarthquakeQuery {
    /// Converts to a clamped store filter.
    #[must_use]
    pub fn to_filter(&self) -> EarthquakeFilter {
        EarthquakeFilter {
            magnitude_min: self.magnitude_min,
            magnitude_max: self.magnitude_max,
            region: self.region.clone(),
            days: self.days.unwrap_or(DEFAULT_QUERY_DAYS),
            limit: self.limit.unwrap_or(DEFAULT_QUERY_LIMIT),
        }
        .clamped()
    }
}

/// Response body for `GET /api/v1/statistics`.
#[derive(Debug, Serialize, ToSchema)]
pub struct StatisticsResponse {
    /// All stored events.
    pub total_earthquakes: u64,
    /// Events in the last 7 days.
    pub recent_earthquakes: u64,
    /// Magnitude 6.0 or more.
    pub major_earthquakes: u64,
    /// Magnitude in `[4.0, 6.0)`.
    pub moderate_earthquakes: u64,
    /// Magnitude below 4.0.
    pub minor_earthquakes: u64,
    /// Mean magnitude, 2 decimals.
    pub average_magnitude: f64,
}

impl From<EarthquakeStatistics> for StatisticsResponse {
    fn from(stats: EarthquakeStatistics) -> Self {
        Self {
            total_earthquakes: stats.total_earthquakes,
            recent_earthquakes: stats.recent_earthquakes,
            major_earthquakes: stats.major_earthquakes,
            moderate_earthquakes: stats.moderate_earthquakes,
            minor_earthquakes: stats.minor_earthquakes,
            average_magnitude: stats.average_magnitude,
        }
    }
}
