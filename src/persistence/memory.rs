//! In-memory store used when the database is disabled and in tests.
//!
//! Zones live behind an `Arc<Vec<RiskZone>>` snapshot. A replacement builds
//! the new vector first and then swaps the pointer under a short write
//! lock, so readers resolve either the old or the new generation.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::models::{EarthquakeFilter, EarthquakeStatistics, StoredEarthquake};
use super::{EventStore, ZoneStore, sort_zones_by_risk};
use crate::domain::{Earthquake, EventId, RiskZone};
use crate::error::RiskError;

#[derive(Debug, Default)]
struct EarthquakeTable {
    rows: Vec<StoredEarthquake>,
    known_ids: HashSet<EventId>,
    next_id: i64,
}

/// Process-local implementation of [`EventStore`] and [`ZoneStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    earthquakes: RwLock<EarthquakeTable>,
    zones: RwLock<Arc<Vec<RiskZone>>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current zone generation without copying it.
    pub async fn zone_snapshot(&self) -> Arc<Vec<RiskZone>> {
        Arc::clone(&*self.zones.read().await)
    }
}

#[async_trait]
impl EventStore for MemoryStore {
    async fn insert_earthquakes(&self, quakes: &[Earthquake]) -> Result<u64, RiskError> {
        let mut table = self.earthquakes.write().await;
        let now = Utc::now();
        let mut inserted = 0;
        for quake in quakes {
            if !table.known_ids.insert(quake.source_id().clone()) {
                continue;
            }
            table.next_id += 1;
            let id = table.next_id;
            table.rows.push(StoredEarthquake {
                id,
                earthquake: quake.clone(),
                created_at: now,
            });
            inserted += 1;
        }
        Ok(inserted)
    }

    async fn earthquakes_between(
        &self,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<Earthquake>, RiskError> {
        let table = self.earthquakes.read().await;
        let mut quakes: Vec<Earthquake> = table
            .rows
            .iter()
            .map(|row| &row.earthquake)
            .filter(|eq| eq.occurred_at() >= since && eq.occurred_at() <= until)
            .cloned()
            .collect();
        quakes.sort_by_key(Earthquake::occurred_at);
        Ok(quakes)
    }

    async fn query_earthquakes(
        &self,
        filter: &EarthquakeFilter,
        now: DateTime<Utc>,
    ) -> Result<Vec<StoredEarthquake>, RiskError> {
        let filter = filter.clamped();
        let table = self.earthquakes.read().await;
        let mut rows: Vec<StoredEarthquake> = table
            .rows
            .iter()
            .filter(|row| filter.matches(&row.earthquake, now))
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            b.earthquake
                .occurred_at()
                .cmp(&a.earthquake.occurred_at())
                .then_with(|| b.id.cmp(&a.id))
        });
        rows.truncate(filter.limit as usize);
        Ok(rows)
    }

    async fn get_earthquake(&self, id: i64) -> Result<StoredEarthquake, RiskError> {
        let table = self.earthquakes.read().await;
        table
            .rows
            .iter()
            .find(|row| row.id == id)
            .cloned()
            .ok_or(RiskError::EarthquakeNotFound(id))
    }

    async fn delete_earthquake(&self, id: i64) -> Result<StoredEarthquake, RiskError> {
        let mut table = self.earthquakes.write().await;
        let position = table
            .rows
            .iter()
            .position(|row| row.id == id)
            .ok_or(RiskError::EarthquakeNotFound(id))?;
        let removed = table.rows.remove(position);
        table.known_ids.remove(removed.earthquake.source_id());
        Ok(removed)
    }

    async fn statistics(&self, now: DateTime<Utc>) -> Result<EarthquakeStatistics, RiskError> {
        let table = self.earthquakes.read().await;
        Ok(EarthquakeStatistics::from_earthquakes(
            table.rows.iter().map(|row| &row.earthquake),
            now,
        ))
    }
}

#[async_trait]
impl ZoneStore for MemoryStore {
    async fn replace_zones(&self, zones: Vec<RiskZone>) -> Result<u64, RiskError> {
        let count = zones.len() as u64;
        let snapshot = Arc::new(zones);
        *self.zones.write().await = snapshot;
        Ok(count)
    }

    async fn load_zones(&self, min_risk: f64) -> Result<Vec<RiskZone>, RiskError> {
        let snapshot = self.zone_snapshot().await;
        let mut zones: Vec<RiskZone> = snapshot
            .iter()
            .filter(|zone| zone.is_at_least(min_risk))
            .cloned()
            .collect();
        sort_zones_by_risk(&mut zones);
        Ok(zones)
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn quake(id: &str, mag: f64, at: DateTime<Utc>) -> Earthquake {
        let Ok(eq) = Earthquake::new(id, mag, 10.0, 35.0, 139.0, "Honshu, Japan", at) else {
            panic!("valid earthquake");
        };
        eq
    }

    fn zone(risk: f64, lat: f64) -> RiskZone {
        RiskZone {
            latitude: lat,
            longitude: 0.0,
            risk_level: risk,
            earthquake_count: 1,
            max_magnitude: 5.0,
            mean_magnitude: 5.0,
            region_name: "R".to_string(),
            last_updated: Utc::now(),
        }
    }

    #[tokio::test]
    async fn duplicate_source_ids_are_stored_once() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let first = store.insert_earthquakes(&[quake("a", 5.0, now)]).await;
        let second = store
            .insert_earthquakes(&[quake("a", 5.0, now), quake("b", 4.0, now)])
            .await;
        assert_eq!(first.unwrap_or_default(), 1);
        assert_eq!(second.unwrap_or_default(), 1);

        let Ok(stats) = store.statistics(now).await else {
            panic!("statistics failed");
        };
        assert_eq!(stats.total_earthquakes, 2);
    }

    #[tokio::test]
    async fn window_query_is_inclusive_and_sorted() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let _ = store
            .insert_earthquakes(&[
                quake("late", 5.0, now),
                quake("early", 5.0, now - Duration::days(10)),
                quake("outside", 5.0, now - Duration::days(11)),
            ])
            .await;
        let Ok(quakes) = store
            .earthquakes_between(now - Duration::days(10), now)
            .await
        else {
            panic!("window query failed");
        };
        assert_eq!(quakes.len(), 2);
        assert_eq!(quakes[0].source_id().as_str(), "early");
    }

    #[tokio::test]
    async fn query_orders_newest_first_and_limits() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let _ = store
            .insert_earthquakes(&[
                quake("a", 5.0, now - Duration::days(3)),
                quake("b", 5.0, now - Duration::days(1)),
                quake("c", 5.0, now - Duration::days(2)),
            ])
            .await;
        let filter = EarthquakeFilter {
            limit: 2,
            ..EarthquakeFilter::default()
        };
        let Ok(rows) = store.query_earthquakes(&filter, now).await else {
            panic!("query failed");
        };
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].earthquake.source_id().as_str(), "b");
        assert_eq!(rows[1].earthquake.source_id().as_str(), "c");
    }

    #[tokio::test]
    async fn delete_removes_row_and_allows_reingest() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let _ = store.insert_earthquakes(&[quake("a", 5.0, now)]).await;
        let Ok(deleted) = store.delete_earthquake(1).await else {
            panic!("delete failed");
        };
        assert_eq!(deleted.earthquake.source_id().as_str(), "a");
        assert!(matches!(
            store.get_earthquake(1).await,
            Err(RiskError::EarthquakeNotFound(1))
        ));
        let again = store.insert_earthquakes(&[quake("a", 5.0, now)]).await;
        assert_eq!(again.unwrap_or_default(), 1);
    }

    #[tokio::test]
    async fn replace_swaps_whole_generation() {
        let store = MemoryStore::new();
        let _ = store.replace_zones(vec![zone(0.2, 1.0), zone(0.9, 3.0)]).await;
        let old = store.zone_snapshot().await;

        let _ = store.replace_zones(vec![zone(0.5, 5.0)]).await;
        assert_eq!(old.len(), 2);

        let Ok(current) = store.load_zones(0.0).await else {
            panic!("load failed");
        };
        assert_eq!(current.len(), 1);
        assert!((current[0].latitude - 5.0).abs() < 1e-12);

        let _ = store.replace_zones(Vec::new()).await;
        let Ok(cleared) = store.load_zones(0.0).await else {
            panic!("load failed");
        };
        assert!(cleared.is_empty());
    }

    #[tokio::test]
    async fn load_filters_and_sorts_by_risk() {
        let store = MemoryStore::new();
        let _ = store
            .replace_zones(vec![zone(0.2, 1.0), zone(0.9, 3.0), zone(0.7, 5.0)])
            .await;
        let Ok(high) = store.load_zones(0.7).await else {
            panic!("load failed");
        };
        assert_eq!(high.len(), 2);
        assert!((high[0].risk_level - 0.9).abs() < 1e-12);
        assert!((high[1].risk_level - 0.7).abs() < 1e-12);
    }
}
