//! Fixed latitude/longitude grid: bucket keys and per-cell accumulators.
//!
//! Cells are keyed by floor-divided coordinates, so an event lying exactly on
//! a boundary belongs to the cell whose lower bound it sits on.

use std::collections::BTreeMap;

use serde::Serialize;

use super::Earthquake;

/// Region name used when no event in a cell carries a label.
pub const UNKNOWN_REGION_NAME: &str = "Unknown Region";

/// Returns the floor bucket index of `value` for the given cell size.
///
/// The quotient is corrected by one step when floating-point division
/// lands on the wrong side of a boundary, so that
/// `index * cell_size <= value < (index + 1) * cell_size` always holds.
/// Quotients beyond the `i64` range saturate instead of overflowing; a
/// [`GridConfig`](super::GridConfig) that passed validation never gets there.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
pub fn bucket_index(value: f64, cell_size: f64) -> i64 {
    let index = (value / cell_size).floor() as i64;
    if (index as f64) * cell_size > value {
        index.saturating_sub(1)
    } else if (index.saturating_add(1) as f64) * cell_size <= value {
        index.saturating_add(1)
    } else {
        index
    }
}

/// Integer coordinates of a grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct GridKey {
    /// `floor(latitude / cell_size)`.
    pub lat_bucket: i64,
    /// `floor(longitude / cell_size)`.
    pub lon_bucket: i64,
}

impl GridKey {
    /// Returns the key of the cell containing the given point.
    #[must_use]
    pub fn for_point(latitude: f64, longitude: f64, cell_size: f64) -> Self {
        Self {
            lat_bucket: bucket_index(latitude, cell_size),
            lon_bucket: bucket_index(longitude, cell_size),
        }
    }

    /// South-west corner `(latitude, longitude)` of the cell.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn lower_bounds(&self, cell_size: f64) -> (f64, f64) {
        (
            self.lat_bucket as f64 * cell_size,
            self.lon_bucket as f64 * cell_size,
        )
    }

    /// Midpoint `(latitude, longitude)` of the cell.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn center(&self, cell_size: f64) -> (f64, f64) {
        (
            (self.lat_bucket as f64 + 0.5) * cell_size,
            (self.lon_bucket as f64 + 0.5) * cell_size,
        )
    }
}

/// Accumulated statistics for one non-empty cell during a computation pass.
#[derive(Debug, Clone)]
pub struct GridCell {
    /// Cell coordinates.
    pub key: GridKey,
    /// Latitude of the cell midpoint.
    pub center_latitude: f64,
    /// Longitude of the cell midpoint.
    pub center_longitude: f64,
    /// Number of events recorded.
    pub count: u64,
    /// Sum of recorded magnitudes.
    pub magnitude_sum: f64,
    /// Largest recorded magnitude.
    pub max_magnitude: f64,
    regions: BTreeMap<String, u64>,
}

impl GridCell {
    /// Creates an empty cell for `key`.
    #[must_use]
    pub fn new(key: GridKey, cell_size: f64) -> Self {
        let (center_latitude, center_longitude) = key.center(cell_size);
        Self {
            key,
            center_latitude,
            center_longitude,
            count: 0,
            magnitude_sum: 0.0,
            max_magnitude: 0.0,
            regions: BTreeMap::new(),
        }
    }

    /// Adds one event to the cell.
    pub fn record(&mut self, quake: &Earthquake) {
        self.count += 1;
        self.magnitude_sum += quake.magnitude();
        if self.count == 1 || quake.magnitude() > self.max_magnitude {
            self.max_magnitude = quake.magnitude();
        }
        *self.regions.entry(quake.region().to_string()).or_insert(0) += 1;
    }

    /// Mean magnitude of the recorded events, `0.0` for an empty cell.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn mean_magnitude(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.magnitude_sum / self.count as f64
        }
    }

    /// Most frequent region label; ties resolve to the smallest label.
    #[must_use]
    pub fn representative_region(&self) -> String {
        let mut best: Option<(&String, u64)> = None;
        for (label, &count) in &self.regions {
            match best {
                Some((_, best_count)) if count <= best_count => {}
                _ => best = Some((label, count)),
            }
        }
        best.map_or_else(|| UNKNOWN_REGION_NAME.to_string(), |(label, _)| label.clone())
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn quake(id: &str, mag: f64, region: &str) -> Earthquake {
        let Ok(eq) = Earthquake::new(id, mag, 10.0, 1.0, 1.0, region, Utc::now()) else {
            panic!("valid earthquake");
        };
        eq
    }

    #[test]
    fn boundary_goes_to_upper_cell() {
        assert_eq!(bucket_index(2.0, 2.0), 1);
        assert_eq!(bucket_index(1.999_999, 2.0), 0);
        assert_eq!(bucket_index(-2.0, 2.0), -1);
        assert_eq!(bucket_index(-0.1, 2.0), -1);
    }

    #[test]
    fn containment_holds_for_awkward_sizes() {
        let sizes = [0.1, 0.3, 0.7, 1.0, 2.0, 2.5, 7.0, 45.0];
        let mut value = -180.0_f64;
        while value <= 180.0 {
            for size in sizes {
                let idx = bucket_index(value, size);
                #[allow(clippy::cast_precision_loss)]
                let lower = idx as f64 * size;
                assert!(lower <= value, "{value} below cell {idx} of size {size}");
                assert!(value < lower + size, "{value} above cell {idx} of size {size}");
            }
            value += 0.05;
        }
    }

    #[test]
    fn huge_quotients_saturate_instead_of_overflowing() {
        assert_eq!(bucket_index(10.0, 1e-20), i64::MAX);
        assert_eq!(bucket_index(-10.0, 1e-20), i64::MIN);
        assert_eq!(bucket_index(0.0, 1e-20), 0);
    }

    #[test]
    fn center_is_cell_midpoint() {
        let key = GridKey::for_point(35.0, 139.0, 2.0);
        assert_eq!(key.lat_bucket, 17);
        assert_eq!(key.lon_bucket, 69);
        let (lat, lon) = key.center(2.0);
        assert!((lat - 35.0).abs() < 1e-9);
        assert!((lon - 139.0).abs() < 1e-9);
    }

    #[test]
    fn record_tracks_count_sum_and_max() {
        let mut cell = GridCell::new(GridKey::for_point(1.0, 1.0, 2.0), 2.0);
        cell.record(&quake("a", 3.0, "A"));
        cell.record(&quake("b", 5.0, "A"));
        cell.record(&quake("c", 4.0, "B"));
        assert_eq!(cell.count, 3);
        assert!((cell.magnitude_sum - 12.0).abs() < 1e-9);
        assert!((cell.max_magnitude - 5.0).abs() < 1e-9);
        assert!((cell.mean_magnitude() - 4.0).abs() < 1e-9);
    }

    #[test]
    fn representative_region_prefers_majority_then_smallest_label() {
        let mut cell = GridCell::new(GridKey::for_point(1.0, 1.0, 2.0), 2.0);
        assert_eq!(cell.representative_region(), UNKNOWN_REGION_NAME);

        cell.record(&quake("a", 3.0, "Zeta"));
        cell.record(&quake("b", 3.0, "Alpha"));
        assert_eq!(cell.representative_region(), "Alpha");

        cell.record(&quake("c", 3.0, "Zeta"));
        assert_eq!(cell.representative_region(), "Zeta");
    }
}
