//! WebSocket layer: connection handling, message routing, subscriptions.
//!
//! The WebSocket endpoint at `/ws` streams [`crate::domain::RiskEvent`]s to
//! clients subscribed to their topic, and answers `get_zones` queries.

pub mod connection;
pub mod handler;
pub mod messages;
pub mod subscription;
