//! Earthquake service: ingestion intake and event queries.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;

use crate::domain::{Earthquake, EventBus, RiskEvent};
use crate::error::RiskError;
use crate::persistence::{EarthquakeFilter, EarthquakeStatistics, EventStore, StoredEarthquake};

/// Result of an ingestion batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IngestOutcome {
    /// Records in the batch.
    pub received: u64,
    /// Records stored for the first time.
    pub stored: u64,
    /// Records skipped because their source id was already known.
    pub duplicates: u64,
}

/// Front door of the event store for ingestion and dashboards.
#[derive(Debug, Clone)]
pub struct EarthquakeService {
    store: Arc<dyn EventStore>,
    event_bus: EventBus,
}

impl EarthquakeService {
    /// Creates a new `EarthquakeService`.
    #[must_use]
    pub fn new(store: Arc<dyn EventStore>, event_bus: EventBus) -> Self {
        Self { store, event_bus }
    }

    /// Stores a batch of validated records, skipping known source ids.
    ///
    /// # Errors
    ///
    /// Returns a [`RiskError`] if the store rejects the batch.
    pub async fn ingest(&self, quakes: Vec<Earthquake>) -> Result<IngestOutcome, RiskError> {
        let received = quakes.len() as u64;
        let stored = self.store.insert_earthquakes(&quakes).await?;
        let duplicates = received.saturating_sub(stored);

        if stored > 0 {
            let _ = self.event_bus.publish(RiskEvent::EarthquakesIngested {
                new_count: stored,
                duplicate_count: duplicates,
                timestamp: Utc::now(),
            });
        }

        tracing::info!(received, stored, duplicates, "earthquake batch ingested");
        Ok(IngestOutcome {
            received,
            stored,
            duplicates,
        })
    }

    /// Lists stored events matching `filter`, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`RiskError::InvalidRequest`] if the magnitude bounds are
    /// inverted, or a store error.
    pub async fn list(
        &self,
        filter: &EarthquakeFilter,
    ) -> Result<Vec<StoredEarthquake>, RiskError> {
        if let (Some(min), Some(max)) = (filter.magnitude_min, filter.magnitude_max)
            && min > max
        {
            return Err(RiskError::InvalidRequest(format!(
                "magnitude_min ({min}) exceeds magnitude_max ({max})"
            )));
        }
        self.store.query_earthquakes(filter, Utc::now()).await
    }

    /// Returns a single stored event.
    ///
    /// # Errors
    ///
    /// Returns [`RiskError::EarthquakeNotFound`] for an unknown ID.
    pub async fn get(&self, id: i64) -> Result<StoredEarthquake, RiskError> {
        self.store.get_earthquake(id).await
    }

    /// Deletes a stored event.
    ///
    /// # Errors
    ///
    /// Returns [`RiskError::EarthquakeNotFound`] for an unknown ID.
    pub async fn delete(&self, id: i64) -> Result<StoredEarthquake, RiskError> {
        let removed = self.store.delete_earthquake(id).await?;
        tracing::info!(id, source_id = %removed.earthquake.source_id(), "earthquake deleted");
        Ok(removed)
    }

    /// Aggregate counts over all stored events.
    ///
    /// # Errors
    ///
    /// Returns a store error.
    pub async fn statistics(&self) -> Result<EarthquakeStatistics, RiskError> {
        self.store.statistics(Utc::now()).await
    }
}
