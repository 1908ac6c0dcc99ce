//! Scoring policy and grid configuration for the aggregation engine.
//!
//! The normalization ceilings and weights are fixed policy, not derived
//! statistics. Defaults:
//!
//! | Setting           | Default |
//! |-------------------|---------|
//! | frequency weight  | 0.4     |
//! | magnitude weight  | 0.6     |
//! | count ceiling     | 50      |
//! | magnitude ceiling | 9.0     |
//!
//! A single magnitude 9.0 event therefore scores `0.6 + 0.4 * 1/50 = 0.608`
//! while a cell with 1000 magnitude 1.0 events scores `0.4 + 0.6 * 1/9 ≈ 0.467`.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::error::RiskError;

/// Default grid cell edge length in degrees.
pub const DEFAULT_CELL_SIZE_DEGREES: f64 = 2.0;

/// Default lookback window in days.
pub const DEFAULT_LOOKBACK_DAYS: u32 = 365;

/// Longest accepted lookback window in days (about 2700 years).
pub const MAX_LOOKBACK_DAYS: u32 = 1_000_000;

/// Largest bucket index magnitude a valid cell size can produce. Beyond
/// 2^53 adjacent indices are no longer distinct `f64` values.
const MAX_BUCKET_SPAN: f64 = 9_007_199_254_740_992.0;

const WEIGHT_SUM_TOLERANCE: f64 = 1e-9;

/// Weights and ceilings that turn cell statistics into a risk score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RiskPolicy {
    /// Weight of the normalized event count.
    pub frequency_weight: f64,
    /// Weight of the normalized maximum magnitude.
    pub magnitude_weight: f64,
    /// Event count at which the frequency term saturates.
    pub count_ceiling: f64,
    /// Magnitude at which the magnitude term saturates.
    pub magnitude_ceiling: f64,
}

impl Default for RiskPolicy {
    fn default() -> Self {
        Self {
            frequency_weight: 0.4,
            magnitude_weight: 0.6,
            count_ceiling: 50.0,
            magnitude_ceiling: 9.0,
        }
    }
}

impl RiskPolicy {
    /// Checks weights and ceilings.
    ///
    /// # Errors
    ///
    /// Returns [`RiskError::InvalidConfig`] if a weight is negative or not
    /// finite, the weights do not sum to 1, or a ceiling is not positive.
    pub fn validate(&self) -> Result<(), RiskError> {
        for (name, weight) in [
            ("frequency weight", self.frequency_weight),
            ("magnitude weight", self.magnitude_weight),
        ] {
            if !weight.is_finite() || weight < 0.0 {
                return Err(RiskError::InvalidConfig(format!(
                    "{name} must be a non-negative number, got {weight}"
                )));
            }
        }
        let sum = self.frequency_weight + self.magnitude_weight;
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(RiskError::InvalidConfig(format!(
                "risk weights must sum to 1, got {sum}"
            )));
        }
        for (name, ceiling) in [
            ("count ceiling", self.count_ceiling),
            ("magnitude ceiling", self.magnitude_ceiling),
        ] {
            if !ceiling.is_finite() || ceiling <= 0.0 {
                return Err(RiskError::InvalidConfig(format!(
                    "{name} must be > 0, got {ceiling}"
                )));
            }
        }
        Ok(())
    }

    /// Maps an event count onto `[0, 1]`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn normalize_count(&self, count: u64) -> f64 {
        (count as f64 / self.count_ceiling).clamp(0.0, 1.0)
    }

    /// Maps a magnitude onto `[0, 1]`.
    #[must_use]
    pub fn normalize_magnitude(&self, magnitude: f64) -> f64 {
        (magnitude / self.magnitude_ceiling).clamp(0.0, 1.0)
    }

    /// Risk score of a cell with `count` events and the given maximum magnitude.
    ///
    /// Non-decreasing in both arguments and always within `[0, 1]`.
    #[must_use]
    pub fn score(&self, count: u64, max_magnitude: f64) -> f64 {
        let raw = self.frequency_weight * self.normalize_count(count)
            + self.magnitude_weight * self.normalize_magnitude(max_magnitude);
        if raw.is_nan() { 0.0 } else { raw.clamp(0.0, 1.0) }
    }
}

/// Parameters of one aggregation pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GridConfig {
    /// Edge length of a grid cell in degrees. Must be > 0.
    pub cell_size_degrees: f64,
    /// Length of the trailing window in days. Must be > 0.
    pub lookback_days: u32,
    /// Scoring policy.
    pub policy: RiskPolicy,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            cell_size_degrees: DEFAULT_CELL_SIZE_DEGREES,
            lookback_days: DEFAULT_LOOKBACK_DAYS,
            policy: RiskPolicy::default(),
        }
    }
}

impl GridConfig {
    /// Creates a config with the default policy.
    #[must_use]
    pub fn new(cell_size_degrees: f64, lookback_days: u32) -> Self {
        Self {
            cell_size_degrees,
            lookback_days,
            policy: RiskPolicy::default(),
        }
    }

    /// Checks the cell size, lookback window and policy.
    ///
    /// # Errors
    ///
    /// Returns [`RiskError::InvalidConfig`] for a non-positive or non-finite
    /// cell size, a cell size so small that longitudes no longer fit a bucket
    /// index, a lookback window outside `1..=MAX_LOOKBACK_DAYS`, or an
    /// invalid policy.
    pub fn validate(&self) -> Result<(), RiskError> {
        if !self.cell_size_degrees.is_finite() || self.cell_size_degrees <= 0.0 {
            return Err(RiskError::InvalidConfig(format!(
                "cell size must be > 0, got {}",
                self.cell_size_degrees
            )));
        }
        if 180.0 / self.cell_size_degrees > MAX_BUCKET_SPAN {
            return Err(RiskError::InvalidConfig(format!(
                "cell size {} is too small to index the grid",
                self.cell_size_degrees
            )));
        }
        if self.lookback_days == 0 || self.lookback_days > MAX_LOOKBACK_DAYS {
            return Err(RiskError::InvalidConfig(format!(
                "lookback window must be within 1..={MAX_LOOKBACK_DAYS} days, got {}",
                self.lookback_days
            )));
        }
        self.policy.validate()
    }

    /// Length of the lookback window.
    #[must_use]
    pub fn lookback(&self) -> Duration {
        Duration::days(i64::from(self.lookback_days))
    }

    /// First instant of the window ending at `now`, clamped to the earliest
    /// representable time.
    #[must_use]
    pub fn window_start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now.checked_sub_signed(self.lookback())
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}
