//! Domain events broadcast after state changes.
//!
//! Every zone replacement and every ingestion batch that stores new
//! records emits a [`RiskEvent`] through the [`super::EventBus`]. Events are
//! forwarded to WebSocket subscribers by [`Topic`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Subscription topic a [`RiskEvent`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Topic {
    /// Risk zone replacements.
    Zones,
    /// Earthquake ingestion.
    Earthquakes,
}

impl Topic {
    /// Parses a topic name as sent by clients.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "zones" => Some(Self::Zones),
            "earthquakes" => Some(Self::Earthquakes),
            _ => None,
        }
    }
}

/// Domain event emitted after a state change.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum RiskEvent {
    /// The persisted zone set was replaced by a recomputation pass.
    ZonesReplaced {
        /// Number of zones in the new set.
        zone_count: usize,
        /// Zones at or above the high-risk threshold.
        high_risk_count: usize,
        /// Grid cell size used for the pass.
        cell_size_degrees: f64,
        /// Timestamp of the pass.
        computed_at: DateTime<Utc>,
    },

    /// New earthquake records were stored.
    EarthquakesIngested {
        /// Records stored by this batch.
        new_count: u64,
        /// Records skipped as duplicates.
        duplicate_count: u64,
        /// Ingestion timestamp.
        timestamp: DateTime<Utc>,
    },
}

impl RiskEvent {
    /// Returns the topic this event is published under.
    #[must_use]
    pub const fn topic(&self) -> Topic {
        match self {
            Self::ZonesReplaced { .. } => Topic::Zones,
            Self::EarthquakesIngested { .. } => Topic::Earthquakes,
        }
    }

    /// Returns the event type as a static string slice.
    #[must_use]
    pub const fn event_type_str(&self) -> &'static str {
        match self {
            Self::ZonesReplaced { .. } => "zones_replaced",
            Self::EarthquakesIngested { .. } => "earthquakes_ingested",
        }
    }
}
