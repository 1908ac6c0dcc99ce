//! Stored earthquake rows, query filters and aggregate statistics.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Earthquake, MagnitudeClass};
use crate::error::RiskError;

/// Default `days` window for earthquake listings.
pub const DEFAULT_QUERY_DAYS: u32 = 30;

/// Default and maximum row counts for earthquake listings.
pub const DEFAULT_QUERY_LIMIT: u32 = 1_000;
/// Upper bound on `limit`.
pub const MAX_QUERY_LIMIT: u32 = 20_000;

/// Window used for the "recent" statistic.
pub const RECENT_STATISTICS_DAYS: i64 = 7;

/// An earthquake row from the `earthquakes` table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredEarthquake {
    /// Store-assigned row ID.
    pub id: i64,
    /// The validated record.
    pub earthquake: Earthquake,
    /// Insertion timestamp.
    pub created_at: DateTime<Utc>,
}

/// Column tuple of an `earthquakes` row.
pub(crate) type EarthquakeRow = (
    i64,
    String,
    f64,
    f64,
    f64,
    f64,
    String,
    DateTime<Utc>,
    DateTime<Utc>,
);

impl StoredEarthquake {
    /// Rebuilds a stored record from a database row.
    ///
    /// # Errors
    ///
    /// Returns [`RiskError::PersistenceError`] if the stored values no longer
    /// pass [`Earthquake::new`] validation.
    pub(crate) fn from_row(row: EarthquakeRow) -> Result<Self, RiskError> {
        let (
            id,
            source_id,
            latitude,
            longitude,
            magnitude,
            depth_km,
            region,
            occurred_at,
            created_at,
        ) = row;
        let earthquake = Earthquake::new(
            source_id,
            magnitude,
            depth_km,
            latitude,
            longitude,
            region,
            occurred_at,
        )
        .map_err(|e| RiskError::PersistenceError(format!("corrupt earthquake row {id}: {e}")))?;
        Ok(Self {
            id,
            earthquake,
            created_at,
        })
    }
}

/// Filters for earthquake listings. Results are ordered newest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EarthquakeFilter {
    /// Inclusive lower magnitude bound.
    pub magnitude_min: Option<f64>,
    /// Inclusive upper magnitude bound.
    pub magnitude_max: Option<f64>,
    /// Case-insensitive substring of the region label.
    pub region: Option<String>,
    /// Only events from the last `days` days; `0` disables the time filter.
    pub days: u32,
    /// Maximum number of rows returned.
    pub limit: u32,
}

impl Default for EarthquakeFilter {
    fn default() -> Self {
        Self {
            magnitude_min: None,
            magnitude_max: None,
            region: None,
            days: DEFAULT_QUERY_DAYS,
            limit: DEFAULT_QUERY_LIMIT,
        }
    }
}

impl EarthquakeFilter {
    /// Clamps `limit` to `1..=20000` and drops a blank region filter.
    #[must_use]
    pub fn clamped(&self) -> Self {
        Self {
            magnitude_min: self.magnitude_min,
            magnitude_max: self.magnitude_max,
            region: self
                .region
                .as_deref()
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .map(str::to_string),
            days: self.days,
            limit: self.limit.clamp(1, MAX_QUERY_LIMIT),
        }
    }

    /// Earliest occurrence time included, if the time filter is active.
    ///
    /// A window reaching past the earliest representable time filters
    /// nothing, the same as `days == 0`.
    #[must_use]
    pub fn cutoff(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        if self.days == 0 {
            return None;
        }
        now.checked_sub_signed(Duration::days(i64::from(self.days)))
    }

    /// Returns `true` if `quake` passes every filter except `limit`.
    #[must_use]
    pub fn matches(&self, quake: &Earthquake, now: DateTime<Utc>) -> bool {
        if let Some(cutoff) = self.cutoff(now)
            && quake.occurred_at() < cutoff
        {
            return false;
        }
        if let Some(min) = self.magnitude_min
            && quake.magnitude() < min
        {
            return false;
        }
        if let Some(max) = self.magnitude_max
            && quake.magnitude() > max
        {
            return false;
        }
        if let Some(region) = &self.region
            && !quake
                .region()
                .to_lowercase()
                .contains(&region.to_lowercase())
        {
            return false;
        }
        true
    }
}

/// Aggregate counts over all stored earthquakes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EarthquakeStatistics {
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
    /// Mean magnitude rounded to 2 decimals, `0.0` when empty.
    pub average_magnitude: f64,
}

impl EarthquakeStatistics {
    /// Computes statistics over an in-memory set of events.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn from_earthquakes<'a>(
        quakes: impl IntoIterator<Item = &'a Earthquake>,
        now: DateTime<Utc>,
    ) -> Self {
        let recent_cutoff = now - Duration::days(RECENT_STATISTICS_DAYS);
        let mut stats = Self {
            total_earthquakes: 0,
            recent_earthquakes: 0,
            major_earthquakes: 0,
            moderate_earthquakes: 0,
            minor_earthquakes: 0,
            average_magnitude: 0.0,
        };
        let mut magnitude_sum = 0.0;
        for quake in quakes {
            stats.total_earthquakes += 1;
            magnitude_sum += quake.magnitude();
            if quake.occurred_at() >= recent_cutoff {
                stats.recent_earthquakes += 1;
            }
            match quake.magnitude_class() {
                MagnitudeClass::Major => stats.major_earthquakes += 1,
                MagnitudeClass::Moderate => stats.moderate_earthquakes += 1,
                MagnitudeClass::Minor => stats.minor_earthquakes += 1,
            }
        }
        if stats.total_earthquakes > 0 {
            stats.average_magnitude = round2(magnitude_sum / stats.total_earthquakes as f64);
        }
        stats
    }
}

/// Rounds to two decimal places.
#[must_use]
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn quake(id: &str, mag: f64, region: &str, age_days: i64, now: DateTime<Utc>) -> Earthquake {
        let at = now - Duration::days(age_days);
        let Ok(eq) = Earthquake::new(id, mag, 10.0, 0.0, 0.0, region, at) else {
            panic!("valid earthquake");
        };
        eq
    }

    #[test]
    fn filter_applies_all_bounds() {
        let now = Utc::now();
        let filter = EarthquakeFilter {
            magnitude_min: Some(4.0),
            magnitude_max: Some(6.0),
            region: Some("japan".to_string()),
            days: 10,
            limit: 5,
        };
        assert!(filter.matches(&quake("a", 5.0, "Honshu, Japan", 1, now), now));
        assert!(!filter.matches(&quake("b", 3.9, "Honshu, Japan", 1, now), now));
        assert!(!filter.matches(&quake("c", 6.1, "Honshu, Japan", 1, now), now));
        assert!(!filter.matches(&quake("d", 5.0, "Chile", 1, now), now));
        assert!(!filter.matches(&quake("e", 5.0, "Japan", 11, now), now));
    }

    #[test]
    fn zero_days_disables_time_filter() {
        let now = Utc::now();
        let filter = EarthquakeFilter {
            days: 0,
            ..EarthquakeFilter::default()
        };
        assert!(filter.cutoff(now).is_none());
        assert!(filter.matches(&quake("a", 5.0, "x", 5_000, now), now));
    }

    #[test]
    fn huge_days_window_is_unbounded() {
        let now = Utc::now();
        let filter = EarthquakeFilter {
            days: 4_000_000_000,
            ..EarthquakeFilter::default()
        };
        assert!(filter.cutoff(now).is_none());
        assert!(filter.matches(&quake("a", 5.0, "x", 50_000, now), now));

        let bounded = EarthquakeFilter {
            days: 36_500,
            ..EarthquakeFilter::default()
        };
        assert!(bounded.cutoff(now).is_some_and(|c| c < now));
    }

    #[test]
    fn clamped_bounds_limit_and_trims_region() {
        let filter = EarthquakeFilter {
            limit: 0,
            region: Some("   ".to_string()),
            ..EarthquakeFilter::default()
        };
        let clamped = filter.clamped();
        assert_eq!(clamped.limit, 1);
        assert!(clamped.region.is_none());

        let big = EarthquakeFilter {
            limit: 1_000_000,
            ..EarthquakeFilter::default()
        }
        .clamped();
        assert_eq!(big.limit, MAX_QUERY_LIMIT);
    }

    #[test]
    fn statistics_partition_by_class() {
        let now = Utc::now();
        let quakes = [
            quake("a", 2.5, "x", 1, now),
            quake("b", 4.5, "x", 3, now),
            quake("c", 6.5, "x", 30, now),
            quake("d", 3.0, "x", 100, now),
        ];
        let stats = EarthquakeStatistics::from_earthquakes(&quakes, now);
        assert_eq!(stats.total_earthquakes, 4);
        assert_eq!(stats.recent_earthquakes, 2);
        assert_eq!(stats.major_earthquakes, 1);
        assert_eq!(stats.moderate_earthquakes, 1);
        assert_eq!(stats.minor_earthquakes, 2);
        assert_eq!(
            stats.major_earthquakes + stats.moderate_earthquakes + stats.minor_earthquakes,
            stats.total_earthquakes
        );
        assert!((stats.average_magnitude - 4.13).abs() < 1e-9);
    }

    #[test]
    fn empty_statistics_are_zero() {
        let stats =
            EarthquakeStatistics::from_earthquakes(std::iter::empty::<&Earthquake>(), Utc::now());
        assert_eq!(stats.total_earthquakes, 0);
        assert!(stats.average_magnitude.abs() < 1e-12);
    }
}
