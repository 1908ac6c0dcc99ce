//! Domain layer: earthquake records, the risk grid, the aggregation
//! engine, and the event system.
//!
//! Everything here is free of I/O. [`engine::RiskEngine`] is the pure core
//! that turns a window of [`Earthquake`]s into [`RiskZone`]s.

pub mod activity;
pub mod earthquake;
pub mod engine;
pub mod event_bus;
pub mod grid;
pub mod policy;
pub mod risk_event;
pub mod risk_zone;

pub use earthquake::{Earthquake, EventId, MagnitudeClass};
pub use engine::{RiskEngine, compute_risk_zones};
pub use event_bus::EventBus;
pub use grid::{GridCell, GridKey};
pub use policy::{GridConfig, RiskPolicy};
pub use risk_event::{RiskEvent, Topic};
pub use risk_zone::RiskZone;
