//! Persistence layer: the event store and the risk zone store.
//!
//! [`EventStore`] supplies deduplicated, validated earthquake records
//! queryable by time window. [`ZoneStore`] holds the current risk zone set
//! and replaces it atomically, so readers observe either the previous or
//! the new generation and never a mixture.
//!
//! Two implementations are provided: [`postgres::PostgresStore`] (delete and
//! insert inside one transaction) and [`memory::MemoryStore`] (swap of an
//! immutable snapshot).

pub mod memory;
pub mod models;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{Earthquake, RiskZone};
use crate::error::RiskError;

pub use memory::MemoryStore;
pub use models::{
    DEFAULT_QUERY_DAYS, DEFAULT_QUERY_LIMIT, EarthquakeFilter, EarthquakeStatistics,
    MAX_QUERY_LIMIT, StoredEarthquake,
};
pub use postgres::PostgresStore;

/// Source of earthquake records.
#[async_trait]
pub trait EventStore: Send + Sync + std::fmt::Debug {
    /// Stores records whose source id is not yet known.
    ///
    /// Returns the number of newly stored records.
    ///
    /// # Errors
    ///
    /// Returns [`RiskError::PersistenceError`] on storage failure; no
    /// record of the batch is stored in that case.
    async fn insert_earthquakes(&self, quakes: &[Earthquake]) -> Result<u64, RiskError>;

    /// Returns events with `since <= occurred_at <= until`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns a [`RiskError`] when the store cannot be read.
    async fn earthquakes_between(
        &self,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<Earthquake>, RiskError>;

    /// Returns stored events matching `filter`, newest first.
    ///
    /// # Errors
    ///
    /// Returns a [`RiskError`] when the store cannot be read.
    async fn query_earthquakes(
        &self,
        filter: &EarthquakeFilter,
        now: DateTime<Utc>,
    ) -> Result<Vec<StoredEarthquake>, RiskError>;

    /// Returns a single stored event.
    ///
    /// # Errors
    ///
    /// Returns [`RiskError::EarthquakeNotFound`] for an unknown ID.
    async fn get_earthquake(&self, id: i64) -> Result<StoredEarthquake, RiskError>;

    /// Deletes a stored event and returns it.
    ///
    /// # Errors
    ///
    /// Returns [`RiskError::EarthquakeNotFound`] for an unknown ID.
    async fn delete_earthquake(&self, id: i64) -> Result<StoredEarthquake, RiskError>;

    /// Aggregate counts over all stored events.
    ///
    /// # Errors
    ///
    /// Returns a [`RiskError`] when the store cannot be read.
    async fn statistics(&self, now: DateTime<Utc>) -> Result<EarthquakeStatistics, RiskError>;
}

/// Holder of the current risk zone generation.
#[async_trait]
pub trait ZoneStore: Send + Sync + std::fmt::Debug {
    /// Replaces every stored zone with `zones` in one atomic unit.
    ///
    /// Returns the number of zones stored.
    ///
    /// # Errors
    ///
    /// Returns [`RiskError::PersistenceError`] on failure, after rolling
    /// back so the previous generation stays visible.
    async fn replace_zones(&self, zones: Vec<RiskZone>) -> Result<u64, RiskError>;

    /// Returns zones with `risk_level >= min_risk`, highest risk first.
    ///
    /// # Errors
    ///
    /// Returns a [`RiskError`] when the store cannot be read.
    async fn load_zones(&self, min_risk: f64) -> Result<Vec<RiskZone>, RiskError>;
}

/// Orders zones by descending risk, then by position.
pub(crate) fn sort_zones_by_risk(zones: &mut [RiskZone]) {
    zones.sort_by(|a, b| {
        b.risk_level
            .total_cmp(&a.risk_level)
            .then_with(|| a.latitude.total_cmp(&b.latitude))
            .then_with(|| a.longitude.total_cmp(&b.longitude))
    });
}
