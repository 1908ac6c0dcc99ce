//! Risk service: serializes recomputation passes and replaces zones.
//!
//! A pass follows the pattern: acquire the recompute lock → fetch the
//! lookback window (under a timeout) → run the engine → replace all zones
//! atomically → emit an event → return a summary. Any failure before the
//! replace step leaves the previous zone generation untouched.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Mutex;

use crate::domain::activity::{ActivityEstimate, estimate_activity};
use crate::domain::{EventBus, RiskEngine, RiskEvent, RiskZone};
use crate::error::RiskError;
use crate::persistence::{EventStore, ZoneStore};

/// Summary of a successful recomputation pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecomputeOutcome {
    /// Zones in the new generation.
    pub zones_updated: u64,
    /// Zones at or above the high-risk threshold.
    pub high_risk_zones: usize,
    /// Events inside the lookback window.
    pub events_considered: usize,
    /// Timestamp written to every zone of the pass.
    pub computed_at: DateTime<Utc>,
}

impl RecomputeOutcome {
    /// Human-readable summary line.
    #[must_use]
    pub fn message(&self) -> String {
        format!(
            "Updated {} risk zones from {} earthquakes",
            self.zones_updated, self.events_considered
        )
    }
}

/// Trigger controller around the aggregation engine.
#[derive(Debug, Clone)]
pub struct RiskService {
    events: Arc<dyn EventStore>,
    zones: Arc<dyn ZoneStore>,
    engine: RiskEngine,
    recompute_lock: Arc<Mutex<()>>,
    event_bus: EventBus,
    fetch_timeout: Duration,
    high_risk_threshold: f64,
}

impl RiskService {
    /// Creates a new `RiskService`.
    ///
    /// Every service sharing `recompute_lock` is serialized against the
    /// others, so pass the same lock to all instances that write zones.
    #[must_use]
    pub fn new(
        events: Arc<dyn EventStore>,
        zones: Arc<dyn ZoneStore>,
        engine: RiskEngine,
        recompute_lock: Arc<Mutex<()>>,
        event_bus: EventBus,
    ) -> Self {
        Self {
            events,
            zones,
            engine,
            recompute_lock,
            event_bus,
            fetch_timeout: Duration::from_secs(30),
            high_risk_threshold: 0.7,
        }
    }

    /// Sets the timeout applied to fetching the lookback window.
    #[must_use]
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// Sets the risk level from which a zone counts as high risk.
    #[must_use]
    pub fn with_high_risk_threshold(mut self, threshold: f64) -> Self {
        self.high_risk_threshold = threshold;
        self
    }

    /// Returns the engine used for recomputation.
    #[must_use]
    pub fn engine(&self) -> &RiskEngine {
        &self.engine
    }

    /// Returns the default high-risk threshold.
    #[must_use]
    pub fn high_risk_threshold(&self) -> f64 {
        self.high_risk_threshold
    }

    /// Runs a recomputation pass ending now.
    ///
    /// # Errors
    ///
    /// See [`RiskService::recompute_at`].
    pub async fn recompute(&self) -> Result<RecomputeOutcome, RiskError> {
        let _guard = self.recompute_lock.lock().await;
        self.run_pass(Utc::now()).await
    }

    /// Runs a recomputation pass for the window ending at `now`.
    ///
    /// # Errors
    ///
    /// Returns [`RiskError::UpstreamFetch`] or [`RiskError::UpstreamTimeout`]
    /// when the window cannot be fetched, and [`RiskError::PersistenceError`]
    /// when the replace step fails. Stored zones are unchanged in all cases.
    pub async fn recompute_at(&self, now: DateTime<Utc>) -> Result<RecomputeOutcome, RiskError> {
        let _guard = self.recompute_lock.lock().await;
        self.run_pass(now).await
    }

    async fn run_pass(&self, now: DateTime<Utc>) -> Result<RecomputeOutcome, RiskError> {
        let since = self.engine.window_start(now);
        let events = self.fetch_window(since, now).await?;

        let zones = self.engine.compute(&events, now);
        let high_risk_zones = zones
            .iter()
            .filter(|zone| zone.is_at_least(self.high_risk_threshold))
            .count();
        let zone_count = zones.len();

        let zones_updated = self.zones.replace_zones(zones).await.inspect_err(|e| {
            tracing::error!(error = %e, "risk zone replacement failed, previous zones kept");
        })?;

        let _ = self.event_bus.publish(RiskEvent::ZonesReplaced {
            zone_count,
            high_risk_count: high_risk_zones,
            cell_size_degrees: self.engine.config().cell_size_degrees,
            computed_at: now,
        });

        tracing::info!(
            events = events.len(),
            zones = zones_updated,
            high_risk = high_risk_zones,
            "risk zones recomputed"
        );

        Ok(RecomputeOutcome {
            zones_updated,
            high_risk_zones,
            events_considered: events.len(),
            computed_at: now,
        })
    }

    async fn fetch_window(
        &self,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<crate::domain::Earthquake>, RiskError> {
        let fetch = self.events.earthquakes_between(since, until);
        match tokio::time::timeout(self.fetch_timeout, fetch).await {
            Ok(Ok(events)) => Ok(events),
            Ok(Err(err)) => {
                tracing::warn!(error = %err, "event fetch failed, recomputation skipped");
                Err(match err {
                    RiskError::UpstreamFetch(_) | RiskError::UpstreamTimeout { .. } => err,
                    other => RiskError::UpstreamFetch(other.to_string()),
                })
            }
            Err(_) => {
                let timeout_secs = self.fetch_timeout.as_secs();
                tracing::warn!(timeout_secs, "event fetch timed out, recomputation skipped");
                Err(RiskError::UpstreamTimeout { timeout_secs })
            }
        }
    }

    /// Returns the current zones with `risk_level >= min_risk`.
    ///
    /// # Errors
    ///
    /// Returns [`RiskError::InvalidRequest`] if `min_risk` is outside
    /// `[0, 1]`, or a store error.
    pub async fn zones(&self, min_risk: f64) -> Result<Vec<RiskZone>, RiskError> {
        if !(0.0..=1.0).contains(&min_risk) {
            return Err(RiskError::InvalidRequest(format!(
                "min_risk must be within [0, 1], got {min_risk}"
            )));
        }
        self.zones.load_zones(min_risk).await
    }

    /// Returns zones at or above `min_risk`, or the configured threshold.
    ///
    /// # Errors
    ///
    /// See [`RiskService::zones`].
    pub async fn high_risk_zones(&self, min_risk: Option<f64>) -> Result<Vec<RiskZone>, RiskError> {
        self.zones(min_risk.unwrap_or(self.high_risk_threshold)).await
    }

    /// Estimates local activity around a point from the lookback window.
    ///
    /// # Errors
    ///
    /// Returns [`RiskError::InvalidRequest`] for out-of-range coordinates or
    /// a non-positive radius, or an upstream error if events cannot be read.
    pub async fn activity(
        &self,
        latitude: f64,
        longitude: f64,
        radius_km: f64,
    ) -> Result<ActivityEstimate, RiskError> {
        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return Err(RiskError::InvalidRequest(format!(
                "coordinates out of range: ({latitude}, {longitude})"
            )));
        }
        if !radius_km.is_finite() || radius_km <= 0.0 {
            return Err(RiskError::InvalidRequest(format!(
                "radius_km must be > 0, got {radius_km}"
            )));
        }
        let now = Utc::now();
        let events = self
            .fetch_window(self.engine.window_start(now), now)
            .await?;
        Ok(estimate_activity(&events, latitude, longitude, radius_km, now))
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use chrono::Duration as ChronoDuration;

    use crate::domain::{Earthquake, GridConfig};
    use crate::persistence::{
        EarthquakeFilter, EarthquakeStatistics, MemoryStore, StoredEarthquake,
    };

    /// Event store that fails, stalls, or counts concurrent fetches.
    #[derive(Debug, Default)]
    struct ScriptedStore {
        fail: bool,
        stall: bool,
        delay_ms: u64,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    #[async_trait]
    impl EventStore for ScriptedStore {
        async fn insert_earthquakes(&self, quakes: &[Earthquake]) -> Result<u64, RiskError> {
            Ok(quakes.len() as u64)
        }

        async fn earthquakes_between(
            &self,
            _since: DateTime<Utc>,
            _until: DateTime<Utc>,
        ) -> Result<Vec<Earthquake>, RiskError> {
            let now_in_flight = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now_in_flight, Ordering::SeqCst);
            if self.stall {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }
            if self.delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            if self.fail {
                return Err(RiskError::PersistenceError("connection refused".to_string()));
            }
            Ok(Vec::new())
        }

        async fn query_earthquakes(
            &self,
            _filter: &EarthquakeFilter,
            _now: DateTime<Utc>,
        ) -> Result<Vec<StoredEarthquake>, RiskError> {
            Ok(Vec::new())
        }

        async fn get_earthquake(&self, id: i64) -> Result<StoredEarthquake, RiskError> {
            Err(RiskError::EarthquakeNotFound(id))
        }

        async fn delete_earthquake(&self, id: i64) -> Result<StoredEarthquake, RiskError> {
            Err(RiskError::EarthquakeNotFound(id))
        }

        async fn statistics(&self, now: DateTime<Utc>) -> Result<EarthquakeStatistics, RiskError> {
            Ok(EarthquakeStatistics::from_earthquakes(std::iter::empty::<&Earthquake>(), now))
        }
    }

    /// Zone store whose writes always fail; reads serve the seeded zones.
    #[derive(Debug)]
    struct ReadOnlyZones {
        seeded: Vec<RiskZone>,
    }

    #[async_trait]
    impl ZoneStore for ReadOnlyZones {
        async fn replace_zones(&self, _zones: Vec<RiskZone>) -> Result<u64, RiskError> {
            Err(RiskError::PersistenceError("disk full".to_string()))
        }

        async fn load_zones(&self, min_risk: f64) -> Result<Vec<RiskZone>, RiskError> {
            Ok(self
                .seeded
                .iter()
                .filter(|zone| zone.is_at_least(min_risk))
                .cloned()
                .collect())
        }
    }

    fn engine() -> RiskEngine {
        let Ok(engine) = RiskEngine::new(GridConfig::default()) else {
            panic!("default config is valid");
        };
        engine
    }

    fn quake(id: &str, lat: f64, lon: f64, mag: f64, at: DateTime<Utc>) -> Earthquake {
        let Ok(eq) = Earthquake::new(id, mag, 10.0, lat, lon, "Honshu, Japan", at) else {
            panic!("valid earthquake");
        };
        eq
    }

    fn memory_service() -> (RiskService, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let events: Arc<dyn EventStore> = Arc::clone(&store) as Arc<dyn EventStore>;
        let zones: Arc<dyn ZoneStore> = Arc::clone(&store) as Arc<dyn ZoneStore>;
        let service = RiskService::new(
            events,
            zones,
            engine(),
            Arc::new(Mutex::new(())),
            EventBus::new(100),
        );
        (service, store)
    }

    fn scripted_service(events: Arc<ScriptedStore>, zones: Arc<MemoryStore>) -> RiskService {
        RiskService::new(
            events,
            zones,
            engine(),
            Arc::new(Mutex::new(())),
            EventBus::new(100),
        )
    }

    fn seed_zone() -> RiskZone {
        RiskZone {
            latitude: 1.0,
            longitude: 1.0,
            risk_level: 0.5,
            earthquake_count: 3,
            max_magnitude: 5.0,
            mean_magnitude: 4.0,
            region_name: "Seed".to_string(),
            last_updated: Utc::now(),
        }
    }

    #[tokio::test]
    async fn recompute_builds_zones_from_window() {
        let (service, store) = memory_service();
        let now = Utc::now();
        let t = now - ChronoDuration::days(1);
        let _ = store
            .insert_earthquakes(&[
                quake("a", 35.0, 139.0, 7.1, t),
                quake("b", 35.5, 139.5, 4.0, t),
                quake("stale", -10.0, 20.0, 8.0, now - ChronoDuration::days(400)),
            ])
            .await;

        let Ok(outcome) = service.recompute_at(now).await else {
            panic!("recompute failed");
        };
        assert_eq!(outcome.zones_updated, 1);
        assert_eq!(outcome.events_considered, 2);
        assert_eq!(outcome.computed_at, now);

        let Ok(zones) = service.zones(0.0).await else {
            panic!("load failed");
        };
        assert_eq!(zones.len(), 1);
        assert_eq!(zones[0].earthquake_count, 2);
        assert_eq!(zones[0].region_name, "Honshu, Japan");
    }

    #[tokio::test]
    async fn empty_window_clears_previous_zones() {
        let (service, store) = memory_service();
        let now = Utc::now();
        let _ = store
            .insert_earthquakes(&[quake("a", 10.0, 10.0, 5.0, now - ChronoDuration::days(1))])
            .await;
        let _ = service.recompute_at(now).await;
        assert_eq!(service.zones(0.0).await.map(|z| z.len()).unwrap_or(0), 1);

        let _ = store.delete_earthquake(1).await;
        let Ok(outcome) = service.recompute_at(now).await else {
            panic!("recompute failed");
        };
        assert_eq!(outcome.zones_updated, 0);
        let Ok(zones) = service.zones(0.0).await else {
            panic!("load failed");
        };
        assert!(zones.is_empty());
    }

    #[tokio::test]
    async fn fetch_failure_keeps_previous_zones() {
        let zones = Arc::new(MemoryStore::new());
        let _ = zones.replace_zones(vec![seed_zone()]).await;
        let events = Arc::new(ScriptedStore {
            fail: true,
            ..ScriptedStore::default()
        });
        let service = scripted_service(events, Arc::clone(&zones));

        let result = service.recompute().await;
        assert!(matches!(result, Err(RiskError::UpstreamFetch(_))));

        let Ok(current) = zones.load_zones(0.0).await else {
            panic!("load failed");
        };
        assert_eq!(current.len(), 1);
        assert_eq!(current[0].region_name, "Seed");
    }

    #[tokio::test]
    async fn fetch_timeout_keeps_previous_zones() {
        let zones = Arc::new(MemoryStore::new());
        let _ = zones.replace_zones(vec![seed_zone()]).await;
        let events = Arc::new(ScriptedStore {
            stall: true,
            ..ScriptedStore::default()
        });
        let service = scripted_service(events, Arc::clone(&zones))
            .with_fetch_timeout(Duration::from_millis(20));

        let result = service.recompute().await;
        assert!(matches!(result, Err(RiskError::UpstreamTimeout { .. })));
        assert_eq!(zones.zone_snapshot().await.len(), 1);
    }

    #[tokio::test]
    async fn replace_failure_keeps_previous_zones_and_stays_silent() {
        let store = Arc::new(MemoryStore::new());
        let now = Utc::now();
        let _ = store
            .insert_earthquakes(&[quake("a", 35.0, 139.0, 6.0, now - ChronoDuration::days(1))])
            .await;
        let zones = Arc::new(ReadOnlyZones {
            seeded: vec![seed_zone()],
        });
        let service = RiskService::new(
            store,
            zones,
            engine(),
            Arc::new(Mutex::new(())),
            EventBus::new(100),
        );
        let mut rx = service.event_bus.subscribe();

        let result = service.recompute_at(now).await;
        assert!(matches!(result, Err(RiskError::PersistenceError(_))));
        assert!(rx.try_recv().is_err());

        let Ok(current) = service.zones(0.0).await else {
            panic!("load failed");
        };
        assert_eq!(current.len(), 1);
        assert_eq!(current[0].region_name, "Seed");
        assert_eq!(current[0].earthquake_count, 3);
    }

    #[tokio::test]
    async fn concurrent_triggers_are_serialized() {
        let zones = Arc::new(MemoryStore::new());
        let events = Arc::new(ScriptedStore {
            delay_ms: 30,
            ..ScriptedStore::default()
        });
        let service = scripted_service(Arc::clone(&events), zones);
        let other = service.clone();

        let (a, b) = tokio::join!(service.recompute(), other.recompute());
        assert!(a.is_ok());
        assert!(b.is_ok());
        assert_eq!(events.max_in_flight.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn recompute_publishes_zones_replaced() {
        let (service, _store) = memory_service();
        let mut rx = service.event_bus.subscribe();
        let _ = service.recompute().await;
        let Ok(event) = rx.recv().await else {
            panic!("expected event");
        };
        assert_eq!(event.event_type_str(), "zones_replaced");
    }

    #[tokio::test]
    async fn min_risk_out_of_range_is_rejected() {
        let (service, _store) = memory_service();
        assert!(matches!(
            service.zones(1.5).await,
            Err(RiskError::InvalidRequest(_))
        ));
    }

    #[tokio::test]
    async fn activity_validates_and_estimates() {
        let (service, store) = memory_service();
        let now = Utc::now();
        let quakes: Vec<Earthquake> = (0..6)
            .map(|i| quake(&format!("q{i}"), 35.0, 139.0, 4.0, now - ChronoDuration::days(2)))
            .collect();
        let _ = store.insert_earthquakes(&quakes).await;

        assert!(service.activity(95.0, 0.0, 100.0).await.is_err());
        assert!(service.activity(35.0, 139.0, 0.0).await.is_err());

        let Ok(estimate) = service.activity(35.0, 139.0, 100.0).await else {
            panic!("estimate failed");
        };
        assert_eq!(estimate.based_on_events, 6);
        assert_eq!(estimate.recent_activity, 6);
    }
}
