//! Service layer: business logic orchestration.
//!
//! [`EarthquakeService`] takes ingestion batches and serves event queries.
//! [`RiskService`] runs serialized recomputation passes through the
//! aggregation engine and emits events through the
//! [`super::domain::EventBus`].

pub mod earthquake_service;
pub mod risk_service;

pub use earthquake_service::{EarthquakeService, IngestOutcome};
pub use risk_service::{RecomputeOutcome, RiskService};
