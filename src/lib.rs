//! # quake-risk-gateway
//!
//! REST API and WebSocket gateway that turns a stream of reported
//! earthquakes into a grid of seismic risk zones.
//!
//! Ingestion jobs push normalized events into the event store. A
//! recomputation pass reads the lookback window, buckets events into
//! fixed-size lat/lon cells, scores each cell from its event count and
//! peak magnitude, and atomically replaces the stored zone set. Passes
//! are serialized; a failed pass leaves the previous zones in place.
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP, WebSocket)
//!     │
//!     ├── REST Handlers (api/)
//!     ├── WS Handler (ws/)
//!     │
//!     ├── EarthquakeService, RiskService (service/)
//!     ├── EventBus (domain/)
//!     │
//!     ├── RiskEngine: grid bucketing + scoring (domain/)
//!     │
//!     └── EventStore / ZoneStore (persistence/)
//!           ├── PostgreSQL
//!           └── in-memory
//! ```

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod persistence;
pub mod service;
pub mod ws;
