//! Grid-based risk aggregation engine.
//!
//! A pure function from `(events, config, now)` to a full set of
//! [`RiskZone`]s. Persistence of the result is the caller's job.
//!
//! # Algorithm
//!
//! 1. Discard events outside `[now - lookback, now]`.
//! 2. Key each event by `(floor(lat / s), floor(lon / s))`.
//! 3. Accumulate count, magnitude sum and maximum per key.
//! 4. Score each non-empty cell with [`RiskPolicy::score`].
//! 5. Emit one zone per cell, centered on the cell midpoint.
//!
//! Output order follows the cell key, and events are accumulated in a
//! canonical order, so identical event sets always produce identical zones.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use super::grid::{GridCell, GridKey};
use super::policy::{GridConfig, RiskPolicy};
use super::{Earthquake, RiskZone};
use crate::error::RiskError;

/// Validated aggregation engine.
#[derive(Debug, Clone)]
pub struct RiskEngine {
    config: GridConfig,
}

impl RiskEngine {
    /// Creates an engine after validating `config`.
    ///
    /// # Errors
    ///
    /// Returns [`RiskError::InvalidConfig`] if the configuration is invalid.
    pub fn new(config: GridConfig) -> Result<Self, RiskError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Returns the engine configuration.
    #[must_use]
    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    /// Returns the first instant included in the lookback window.
    #[must_use]
    pub fn window_start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        self.config.window_start(now)
    }

    /// Buckets events into cells and scores every non-empty cell.
    #[must_use]
    pub fn compute(&self, events: &[Earthquake], now: DateTime<Utc>) -> Vec<RiskZone> {
        let cell_size = self.config.cell_size_degrees;
        let window_start = self.window_start(now);

        let mut in_window: Vec<&Earthquake> = events
            .iter()
            .filter(|eq| eq.occurred_at() >= window_start && eq.occurred_at() <= now)
            .collect();
        let discarded = events.len() - in_window.len();
        in_window.sort_by(|a, b| {
            a.occurred_at()
                .cmp(&b.occurred_at())
                .then_with(|| a.source_id().cmp(b.source_id()))
                .then_with(|| a.magnitude().total_cmp(&b.magnitude()))
        });

        let mut cells: BTreeMap<GridKey, GridCell> = BTreeMap::new();
        for quake in in_window {
            let key = GridKey::for_point(quake.latitude(), quake.longitude(), cell_size);
            cells
                .entry(key)
                .or_insert_with(|| GridCell::new(key, cell_size))
                .record(quake);
        }

        tracing::debug!(
            events = events.len(),
            discarded,
            cells = cells.len(),
            cell_size,
            "aggregated events into grid cells"
        );

        cells
            .into_values()
            .filter(|cell| cell.count > 0)
            .map(|cell| zone_from_cell(&cell, &self.config.policy, now))
            .collect()
    }
}

fn zone_from_cell(cell: &GridCell, policy: &RiskPolicy, now: DateTime<Utc>) -> RiskZone {
    RiskZone {
        latitude: cell.center_latitude,
        longitude: cell.center_longitude,
        risk_level: policy.score(cell.count, cell.max_magnitude),
        earthquake_count: cell.count,
        max_magnitude: cell.max_magnitude,
        mean_magnitude: cell.mean_magnitude(),
        region_name: cell.representative_region(),
        last_updated: now,
    }
}

/// Computes risk zones with the default [`RiskPolicy`].
///
/// # Errors
///
/// Returns [`RiskError::InvalidConfig`] if the cell size is not positive or
/// too small to index, or the lookback window is zero or beyond the calendar
/// range; nothing is computed in that case.
pub fn compute_risk_zones(
    events: &[Earthquake],
    cell_size_degrees: f64,
    lookback_days: u32,
    now: DateTime<Utc>,
) -> Result<Vec<RiskZone>, RiskError> {
    let engine = RiskEngine::new(GridConfig::new(cell_size_degrees, lookback_days))?;
    Ok(engine.compute(events, now))
}

#[cfg(test)]
#[allow(clippy::panic, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn quake(id: &str, lat: f64, lon: f64, mag: f64, at: DateTime<Utc>) -> Earthquake {
        let Ok(eq) = Earthquake::new(id, mag, 10.0, lat, lon, "Test Region", at) else {
            panic!("valid earthquake");
        };
        eq
    }

    fn compute(events: &[Earthquake], now: DateTime<Utc>) -> Vec<RiskZone> {
        let Ok(zones) = compute_risk_zones(events, 2.0, 365, now) else {
            panic!("valid config");
        };
        zones
    }

    #[test]
    fn empty_input_yields_no_zones() {
        assert!(compute(&[], Utc::now()).is_empty());
    }

    #[test]
    fn invalid_cell_size_is_rejected_before_computing() {
        let now = Utc::now();
        let events = [quake("a", 1.0, 1.0, 3.0, now)];
        assert!(matches!(
            compute_risk_zones(&events, 0.0, 365, now),
            Err(RiskError::InvalidConfig(_))
        ));
        assert!(compute_risk_zones(&events, -1.0, 365, now).is_err());
        assert!(compute_risk_zones(&events, 2.0, 0, now).is_err());
    }

    #[test]
    fn extreme_parameters_fail_validation_instead_of_panicking() {
        let now = Utc::now();
        let events = [quake("a", 10.0, 10.0, 5.0, now - Duration::days(1))];
        assert!(matches!(
            compute_risk_zones(&events, 1e-20, 365, now),
            Err(RiskError::InvalidConfig(_))
        ));
        assert!(matches!(
            compute_risk_zones(&[], 2.0, u32::MAX, now),
            Err(RiskError::InvalidConfig(_))
        ));
    }

    #[test]
    fn tiny_valid_cell_still_contains_its_event() {
        let now = Utc::now();
        let events = [quake("a", 10.0, -10.0, 5.0, now - Duration::days(1))];
        let Ok(zones) = compute_risk_zones(&events, 1e-9, 365, now) else {
            panic!("valid config");
        };
        assert_eq!(zones.len(), 1);
        assert!((zones[0].latitude - 10.0).abs() < 1e-6);
        assert!((zones[0].longitude - -10.0).abs() < 1e-6);
    }

    #[test]
    fn nearby_events_share_one_zone() {
        let now = Utc::now();
        let t = now - Duration::days(1);
        let events = [
            quake("a", 35.0, 139.0, 7.1, t),
            quake("b", 35.5, 139.5, 4.0, t),
        ];
        let zones = compute(&events, now);
        assert_eq!(zones.len(), 1);

        let zone = &zones[0];
        assert_eq!(zone.earthquake_count, 2);
        assert!((zone.latitude - 35.0).abs() < 1e-9);
        assert!((zone.longitude - 139.0).abs() < 1e-9);
        assert!((zone.max_magnitude - 7.1).abs() < 1e-9);
        let expected = RiskPolicy::default().score(2, 7.1);
        assert!((zone.risk_level - expected).abs() < 1e-12);
        assert_eq!(zone.last_updated, now);
    }

    #[test]
    fn boundary_event_belongs_to_upper_cell() {
        let now = Utc::now();
        let events = [quake("a", 2.0, 0.5, 5.0, now - Duration::hours(1))];
        let zones = compute(&events, now);
        assert_eq!(zones.len(), 1);
        assert!((zones[0].latitude - 3.0).abs() < 1e-9);
    }

    #[test]
    fn negative_coordinates_floor_away_from_zero() {
        let now = Utc::now();
        let events = [quake("a", -0.5, -179.9, 5.0, now - Duration::hours(1))];
        let zones = compute(&events, now);
        assert!((zones[0].latitude - -1.0).abs() < 1e-9);
        assert!((zones[0].longitude - -179.0).abs() < 1e-9);
    }

    #[test]
    fn events_outside_window_are_discarded() {
        let now = Utc::now();
        let events = [
            quake("old", 10.0, 10.0, 6.0, now - Duration::days(366)),
            quake("future", 20.0, 20.0, 6.0, now + Duration::hours(1)),
            quake("edge", 30.0, 30.0, 6.0, now - Duration::days(365)),
        ];
        let zones = compute(&events, now);
        assert_eq!(zones.len(), 1);
        assert!((zones[0].latitude - 31.0).abs() < 1e-9);
    }

    #[test]
    fn output_is_independent_of_input_order() {
        let now = Utc::now();
        let t = now - Duration::days(3);
        let mut events = vec![
            quake("a", 35.0, 139.0, 7.1, t),
            quake("b", 35.0, 139.0, 4.3, t),
            quake("c", -33.4, -70.6, 5.2, t - Duration::days(10)),
            quake("d", 61.2, -149.9, 3.1, t - Duration::days(100)),
            quake("e", 35.9, 138.1, 2.2, t - Duration::days(5)),
        ];
        let forward = compute(&events, now);
        events.reverse();
        let backward = compute(&events, now);
        assert_eq!(forward, backward);
        assert_eq!(forward, compute(&events, now));
    }

    #[test]
    fn risk_level_stays_in_unit_interval() {
        let now = Utc::now();
        let t = now - Duration::days(1);
        let mut events: Vec<Earthquake> = (0..500)
            .map(|i| quake(&format!("q{i}"), 10.0, 10.0, 9.5, t))
            .collect();
        events.push(quake("tiny", 50.0, 50.0, 0.0, t));
        for zone in compute(&events, now) {
            assert!((0.0..=1.0).contains(&zone.risk_level));
        }
    }

    #[test]
    fn severe_and_frequent_cells_score_differently() {
        let now = Utc::now();
        let t = now - Duration::days(1);
        let mut events = vec![quake("big", 1.0, 1.0, 9.0, t)];
        events.extend((0..1000).map(|i| quake(&format!("s{i}"), 41.0, 41.0, 1.0, t)));
        let zones = compute(&events, now);
        assert_eq!(zones.len(), 2);
        let severe = &zones[0];
        let frequent = &zones[1];
        assert_eq!(severe.earthquake_count, 1);
        assert_eq!(frequent.earthquake_count, 1000);
        assert!((severe.risk_level - frequent.risk_level).abs() > 1e-6);
    }

    #[test]
    fn no_zone_for_empty_cells() {
        let now = Utc::now();
        let events = [
            quake("a", 0.5, 0.5, 3.0, now - Duration::days(1)),
            quake("b", 88.0, 170.0, 3.0, now - Duration::days(1)),
        ];
        let zones = compute(&events, now);
        assert_eq!(zones.len(), 2);
        assert!(zones.iter().all(|z| z.earthquake_count > 0));
    }

    #[test]
    fn custom_policy_is_honored() {
        let now = Utc::now();
        let config = GridConfig {
            policy: RiskPolicy {
                frequency_weight: 1.0,
                magnitude_weight: 0.0,
                count_ceiling: 2.0,
                magnitude_ceiling: 9.0,
            },
            ..GridConfig::default()
        };
        let Ok(engine) = RiskEngine::new(config) else {
            panic!("valid config");
        };
        let events = [
            quake("a", 1.0, 1.0, 8.0, now - Duration::days(1)),
            quake("b", 1.0, 1.0, 8.0, now - Duration::days(1)),
        ];
        let zones = engine.compute(&events, now);
        assert!((zones[0].risk_level - 1.0).abs() < 1e-12);
    }
}
