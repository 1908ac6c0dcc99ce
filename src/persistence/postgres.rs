//! PostgreSQL implementation of the persistence layer.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, QueryBuilder};

use super::models::{
    EarthquakeFilter, EarthquakeRow, EarthquakeStatistics, StoredEarthquake, round2,
};
use super::{EventStore, ZoneStore};
use crate::config::DatabaseConfig;
use crate::domain::{Earthquake, MagnitudeClass, RiskZone};
use crate::error::RiskError;

const EARTHQUAKE_COLUMNS: &str = "id, source_id, latitude, longitude, magnitude, depth_km, \
                                  region, occurred_at, created_at";

type ZoneRow = (f64, f64, f64, i64, f64, f64, String, DateTime<Utc>);

/// PostgreSQL-backed persistence layer using `sqlx::PgPool`.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new store with the given connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens a connection pool sized by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`RiskError::PersistenceError`] if the database is unreachable.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, RiskError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
            .connect(&config.url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Applies the bundled schema migrations.
    ///
    /// # Errors
    ///
    /// Returns [`RiskError::PersistenceError`] if a migration fails.
    pub async fn migrate(&self) -> Result<(), RiskError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| RiskError::PersistenceError(e.to_string()))
    }
}

fn escape_like(pattern: &str) -> String {
    let mut escaped = String::with_capacity(pattern.len());
    for ch in pattern.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

fn rows_to_earthquakes(rows: Vec<EarthquakeRow>) -> Result<Vec<StoredEarthquake>, RiskError> {
    rows.into_iter().map(StoredEarthquake::from_row).collect()
}

#[async_trait]
impl EventStore for PostgresStore {
    async fn insert_earthquakes(&self, quakes: &[Earthquake]) -> Result<u64, RiskError> {
        let mut tx = self.pool.begin().await?;
        let mut inserted = 0;
        for quake in quakes {
            let result = sqlx::query(
                "INSERT INTO earthquakes \
                 (source_id, latitude, longitude, magnitude, depth_km, region, occurred_at) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7) \
                 ON CONFLICT (source_id) DO NOTHING",
            )
            .bind(quake.source_id().as_str())
            .bind(quake.latitude())
            .bind(quake.longitude())
            .bind(quake.magnitude())
            .bind(quake.depth_km())
            .bind(quake.region())
            .bind(quake.occurred_at())
            .execute(&mut *tx)
            .await?;
            inserted += result.rows_affected();
        }
        tx.commit().await?;
        Ok(inserted)
    }

    async fn earthquakes_between(
        &self,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<Earthquake>, RiskError> {
        let rows = sqlx::query_as::<_, EarthquakeRow>(&format!(
            "SELECT {EARTHQUAKE_COLUMNS} FROM earthquakes \
             WHERE occurred_at >= $1 AND occurred_at <= $2 ORDER BY occurred_at ASC"
        ))
        .bind(since)
        .bind(until)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RiskError::UpstreamFetch(e.to_string()))?;

        Ok(rows_to_earthquakes(rows)?
            .into_iter()
            .map(|row| row.earthquake)
            .collect())
    }

    async fn query_earthquakes(
        &self,
        filter: &EarthquakeFilter,
        now: DateTime<Utc>,
    ) -> Result<Vec<StoredEarthquake>, RiskError> {
        let filter = filter.clamped();
        let mut builder: QueryBuilder<'_, Postgres> = QueryBuilder::new(format!(
            "SELECT {EARTHQUAKE_COLUMNS} FROM earthquakes WHERE TRUE"
        ));
        if let Some(cutoff) = filter.cutoff(now) {
            builder.push(" AND occurred_at >= ").push_bind(cutoff);
        }
        if let Some(min) = filter.magnitude_min {
            builder.push(" AND magnitude >= ").push_bind(min);
        }
        if let Some(max) = filter.magnitude_max {
            builder.push(" AND magnitude <= ").push_bind(max);
        }
        if let Some(region) = &filter.region {
            builder
                .push(" AND region ILIKE ")
                .push_bind(format!("%{}%", escape_like(region)));
        }
        builder
            .push(" ORDER BY occurred_at DESC, id DESC LIMIT ")
            .push_bind(i64::from(filter.limit));

        let rows = builder
            .build_query_as::<EarthquakeRow>()
            .fetch_all(&self.pool)
            .await?;
        rows_to_earthquakes(rows)
    }

    async fn get_earthquake(&self, id: i64) -> Result<StoredEarthquake, RiskError> {
        let row = sqlx::query_as::<_, EarthquakeRow>(&format!(
            "SELECT {EARTHQUAKE_COLUMNS} FROM earthquakes WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(RiskError::EarthquakeNotFound(id))?;
        StoredEarthquake::from_row(row)
    }

    async fn delete_earthquake(&self, id: i64) -> Result<StoredEarthquake, RiskError> {
        let row = sqlx::query_as::<_, EarthquakeRow>(&format!(
            "DELETE FROM earthquakes WHERE id = $1 RETURNING {EARTHQUAKE_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(RiskError::EarthquakeNotFound(id))?;
        StoredEarthquake::from_row(row)
    }

    async fn statistics(&self, now: DateTime<Utc>) -> Result<EarthquakeStatistics, RiskError> {
        let recent_cutoff = now - chrono::Duration::days(super::models::RECENT_STATISTICS_DAYS);
        let (total, recent, major, moderate, minor, average) =
            sqlx::query_as::<_, (i64, i64, i64, i64, i64, Option<f64>)>(
                "SELECT COUNT(*), \
                 COUNT(*) FILTER (WHERE occurred_at >= $1), \
                 COUNT(*) FILTER (WHERE magnitude >= $2), \
                 COUNT(*) FILTER (WHERE magnitude >= $3 AND magnitude < $2), \
                 COUNT(*) FILTER (WHERE magnitude < $3), \
                 AVG(magnitude) \
                 FROM earthquakes",
            )
            .bind(recent_cutoff)
            .bind(MagnitudeClass::MAJOR_THRESHOLD)
            .bind(MagnitudeClass::MODERATE_THRESHOLD)
            .fetch_one(&self.pool)
            .await?;

        let count = |v: i64| u64::try_from(v).unwrap_or(0);
        Ok(EarthquakeStatistics {
            total_earthquakes: count(total),
            recent_earthquakes: count(recent),
            major_earthquakes: count(major),
            moderate_earthquakes: count(moderate),
            minor_earthquakes: count(minor),
            average_magnitude: round2(average.unwrap_or(0.0)),
        })
    }
}

#[async_trait]
impl ZoneStore for PostgresStore {
    async fn replace_zones(&self, zones: Vec<RiskZone>) -> Result<u64, RiskError> {
        // Dropping `tx` on any early return rolls the whole replacement back.
        let mut tx = self.pool.begin().await?;

        let deleted = sqlx::query("DELETE FROM risk_zones")
            .execute(&mut *tx)
            .await?
            .rows_affected();

        for zone in &zones {
            sqlx::query(
                "INSERT INTO risk_zones \
                 (latitude, longitude, risk_level, earthquake_count, max_magnitude, \
                  mean_magnitude, region_name, last_updated) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
            )
            .bind(zone.latitude)
            .bind(zone.longitude)
            .bind(zone.risk_level)
            .bind(i64::try_from(zone.earthquake_count).unwrap_or(i64::MAX))
            .bind(zone.max_magnitude)
            .bind(zone.mean_magnitude)
            .bind(&zone.region_name)
            .bind(zone.last_updated)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        tracing::debug!(deleted, inserted = zones.len(), "risk zones replaced");
        Ok(zones.len() as u64)
    }

    async fn load_zones(&self, min_risk: f64) -> Result<Vec<RiskZone>, RiskError> {
        let rows = sqlx::query_as::<_, ZoneRow>(
            "SELECT latitude, longitude, risk_level, earthquake_count, max_magnitude, \
             mean_magnitude, region_name, last_updated \
             FROM risk_zones WHERE risk_level >= $1 \
             ORDER BY risk_level DESC, latitude ASC, longitude ASC",
        )
        .bind(min_risk)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(
                |(
                    latitude,
                    longitude,
                    risk_level,
                    earthquake_count,
                    max_magnitude,
                    mean_magnitude,
                    region_name,
                    last_updated,
                )| RiskZone {
                    latitude,
                    longitude,
                    risk_level,
                    earthquake_count: u64::try_from(earthquake_count).unwrap_or(0),
                    max_magnitude,
                    mean_magnitude,
                    region_name,
                    last_updated,
                },
            )
            .collect())
    }
}
