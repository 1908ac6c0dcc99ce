//! Rule-based local activity estimate around a point.
//!
//! Frequency heuristic over the events inside a square search box: the
//! daily event rate plus a boost per event in the last 30 days. No model
//! is fitted.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use super::Earthquake;

/// Kilometers per degree used to convert the search radius.
pub const KM_PER_DEGREE: f64 = 111.0;

/// Default search radius in kilometers.
pub const DEFAULT_RADIUS_KM: f64 = 100.0;

const MIN_EVENTS: usize = 5;
const BASELINE_PROBABILITY: f64 = 0.1;
const RECENT_DAYS: i64 = 30;
const RECENT_BOOST: f64 = 0.1;

/// How much history backs an estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    /// 20 events or fewer.
    Low,
    /// 21 to 50 events.
    Medium,
    /// More than 50 events.
    High,
}

impl Confidence {
    /// Returns the lowercase label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    fn from_event_count(count: usize) -> Self {
        if count > 50 {
            Self::High
        } else if count > 20 {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

/// Likelihood of further activity near a point.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityEstimate {
    /// Estimated probability in `[0, 1]`, rounded to 3 decimals.
    pub probability: f64,
    /// Confidence bucket.
    pub confidence: Confidence,
    /// Events inside the search box.
    pub based_on_events: usize,
    /// Of those, events in the last 30 days.
    pub recent_activity: usize,
}

/// Estimates activity around `(latitude, longitude)` from `events`.
///
/// Events count when both coordinate differences are within
/// `radius_km / 111` degrees.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn estimate_activity(
    events: &[Earthquake],
    latitude: f64,
    longitude: f64,
    radius_km: f64,
    now: DateTime<Utc>,
) -> ActivityEstimate {
    let radius_deg = radius_km / KM_PER_DEGREE;
    let recent_cutoff = now - Duration::days(RECENT_DAYS);

    let nearby: Vec<&Earthquake> = events
        .iter()
        .filter(|eq| {
            (eq.latitude() - latitude).abs() <= radius_deg
                && (eq.longitude() - longitude).abs() <= radius_deg
        })
        .collect();
    let recent = nearby
        .iter()
        .filter(|eq| eq.occurred_at() >= recent_cutoff)
        .count();

    if nearby.len() < MIN_EVENTS {
        return ActivityEstimate {
            probability: BASELINE_PROBABILITY,
            confidence: Confidence::Low,
            based_on_events: nearby.len(),
            recent_activity: recent,
        };
    }

    let daily_rate = nearby.len() as f64 / 365.0;
    let probability = (daily_rate + recent as f64 * RECENT_BOOST).min(1.0);

    ActivityEstimate {
        probability: (probability * 1000.0).round() / 1000.0,
        confidence: Confidence::from_event_count(nearby.len()),
        based_on_events: nearby.len(),
        recent_activity: recent,
    }
}
