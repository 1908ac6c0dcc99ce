//! quake-risk-gateway server entry point.
//!
//! Starts the Axum HTTP server with REST and WebSocket endpoints, and the
//! optional periodic recomputation task.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::sync::Mutex;
use tokio::time::MissedTickBehavior;
use tracing_subscriber::EnvFilter;

use quake_risk_gateway::api;
use quake_risk_gateway::app_state::AppState;
use quake_risk_gateway::config::{LogFormat, ServiceConfig};
use quake_risk_gateway::domain::{EventBus, RiskEngine};
use quake_risk_gateway::persistence::{EventStore, MemoryStore, PostgresStore, ZoneStore};
use quake_risk_gateway::service::{EarthquakeService, RiskService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServiceConfig::from_env().context("failed to load configuration")?;
    init_tracing(config.log_format);
    tracing::info!(addr = %config.listen_addr, "starting quake-risk-gateway");

    let (events, zones) = open_stores(&config).await?;
    let engine = RiskEngine::new(config.grid).context("invalid grid configuration")?;
    let event_bus = EventBus::new(config.event_bus_capacity);

    let recompute_lock = Arc::new(Mutex::new(()));
    let risk_service = Arc::new(
        RiskService::new(
            Arc::clone(&events),
            zones,
            engine,
            recompute_lock,
            event_bus.clone(),
        )
        .with_fetch_timeout(Duration::from_secs(config.fetch_timeout_secs))
        .with_high_risk_threshold(config.high_risk_threshold),
    );
    let earthquake_service = Arc::new(EarthquakeService::new(events, event_bus.clone()));

    if config.recompute_interval_secs > 0 {
        spawn_periodic_recompute(
            Arc::clone(&risk_service),
            Duration::from_secs(config.recompute_interval_secs),
        );
    }

    let app_state = AppState {
        earthquake_service,
        risk_service,
        event_bus,
    };
    let app = api::build_app(app_state, Duration::from_secs(config.request_timeout_secs));

    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.listen_addr))?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("server stopped");
    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
}

async fn open_stores(
    config: &ServiceConfig,
) -> anyhow::Result<(Arc<dyn EventStore>, Arc<dyn ZoneStore>)> {
    if config.persistence_enabled {
        let store = PostgresStore::connect(&config.database)
            .await
            .context("failed to connect to PostgreSQL")?;
        store.migrate().await.context("failed to run migrations")?;
        tracing::info!("using PostgreSQL persistence");
        let store = Arc::new(store);
        let events = Arc::clone(&store) as Arc<dyn EventStore>;
        let zones = store as Arc<dyn ZoneStore>;
        Ok((events, zones))
    } else {
        tracing::warn!("persistence disabled, using in-memory store");
        let store = Arc::new(MemoryStore::new());
        let events = Arc::clone(&store) as Arc<dyn EventStore>;
        let zones = store as Arc<dyn ZoneStore>;
        Ok((events, zones))
    }
}

fn spawn_periodic_recompute(risk_service: Arc<RiskService>, period: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match risk_service.recompute().await {
                Ok(outcome) => {
                    tracing::debug!(zones = outcome.zones_updated, "periodic recompute done");
                }
                Err(err) => tracing::warn!(error = %err, "periodic recompute failed"),
            }
        }
    });
    tracing::info!(period_secs = period.as_secs(), "periodic recompute enabled");
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
