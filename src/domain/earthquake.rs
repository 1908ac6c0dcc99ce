//! Earthquake event records as supplied by the event store.
//!
//! [`Earthquake`] is immutable once constructed. All validation happens in
//! [`Earthquake::new`], so every value reachable by the aggregation engine
//! has finite, in-range coordinates and a non-empty source identifier.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::RiskError;

/// Region label stored when the source does not provide one.
pub const UNKNOWN_REGION: &str = "Unknown";

/// Source-assigned unique identifier of an earthquake (e.g. a USGS id).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(String);

impl EventId {
    /// Creates an `EventId` from a source identifier.
    ///
    /// # Errors
    ///
    /// Returns [`RiskError::InvalidEarthquake`] if the identifier is blank.
    pub fn new(id: impl Into<String>) -> Result<Self, RiskError> {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.is_empty() {
            return Err(RiskError::InvalidEarthquake(
                "source id must not be empty".to_string(),
            ));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Severity bucket used for statistics and map colouring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MagnitudeClass {
    /// Magnitude below 4.0.
    Minor,
    /// Magnitude in `[4.0, 6.0)`.
    Moderate,
    /// Magnitude of 6.0 or more.
    Major,
}

impl MagnitudeClass {
    /// Lower bound of the moderate class.
    pub const MODERATE_THRESHOLD: f64 = 4.0;
    /// Lower bound of the major class.
    pub const MAJOR_THRESHOLD: f64 = 6.0;

    /// Classifies a magnitude value.
    #[must_use]
    pub fn from_magnitude(magnitude: f64) -> Self {
        if magnitude >= Self::MAJOR_THRESHOLD {
            Self::Major
        } else if magnitude >= Self::MODERATE_THRESHOLD {
            Self::Moderate
        } else {
            Self::Minor
        }
    }

    /// Returns the lowercase class label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Minor => "minor",
            Self::Moderate => "moderate",
            Self::Major => "major",
        }
    }

    /// Display colour used by map markers.
    #[must_use]
    pub const fn color(self) -> &'static str {
        match self {
            Self::Minor => "green",
            Self::Moderate => "yellow",
            Self::Major => "red",
        }
    }
}

/// A single reported earthquake.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Earthquake {
    source_id: EventId,
    magnitude: f64,
    depth_km: f64,
    latitude: f64,
    longitude: f64,
    region: String,
    occurred_at: DateTime<Utc>,
}

impl Earthquake {
    /// Builds a validated earthquake record.
    ///
    /// A blank `region` is stored as [`UNKNOWN_REGION`].
    ///
    /// # Errors
    ///
    /// Returns [`RiskError::InvalidEarthquake`] when the source id is blank,
    /// any numeric field is not finite, the magnitude is negative, or the
    /// coordinates fall outside `[-90, 90]` × `[-180, 180]`.
    pub fn new(
        source_id: impl Into<String>,
        magnitude: f64,
        depth_km: f64,
        latitude: f64,
        longitude: f64,
        region: impl Into<String>,
        occurred_at: DateTime<Utc>,
    ) -> Result<Self, RiskError> {
        let source_id = EventId::new(source_id)?;

        if !magnitude.is_finite() || magnitude < 0.0 {
            return Err(RiskError::InvalidEarthquake(format!(
                "{source_id}: magnitude must be a non-negative number, got {magnitude}"
            )));
        }
        if !depth_km.is_finite() {
            return Err(RiskError::InvalidEarthquake(format!(
                "{source_id}: depth must be finite, got {depth_km}"
            )));
        }
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(RiskError::InvalidEarthquake(format!(
                "{source_id}: latitude must be within [-90, 90], got {latitude}"
            )));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(RiskError::InvalidEarthquake(format!(
                "{source_id}: longitude must be within [-180, 180], got {longitude}"
            )));
        }

        let region = region.into();
        let region = if region.trim().is_empty() {
            UNKNOWN_REGION.to_string()
        } else {
            region.trim().to_string()
        };

        Ok(Self {
            source_id,
            magnitude,
            depth_km,
            latitude,
            longitude,
            region,
            occurred_at,
        })
    }

    /// Source-assigned identifier.
    #[must_use]
    pub fn source_id(&self) -> &EventId {
        &self.source_id
    }

    /// Reported magnitude.
    #[must_use]
    pub fn magnitude(&self) -> f64 {
        self.magnitude
    }

    /// Hypocenter depth in kilometers.
    #[must_use]
    pub fn depth_km(&self) -> f64 {
        self.depth_km
    }

    /// Epicenter latitude in degrees.
    #[must_use]
    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    /// Epicenter longitude in degrees.
    #[must_use]
    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    /// Free-text region label.
    #[must_use]
    pub fn region(&self) -> &str {
        &self.region
    }

    /// Occurrence instant (UTC).
    #[must_use]
    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }

    /// Severity bucket of this event.
    #[must_use]
    pub fn magnitude_class(&self) -> MagnitudeClass {
        MagnitudeClass::from_magnitude(self.magnitude)
    }
}
