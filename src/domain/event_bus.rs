//! Fan-out of [`RiskEvent`]s to WebSocket connections.
//!
//! Publishing never blocks the recomputation or ingestion path: with no
//! subscriber the event is dropped, and a subscriber that falls more than
//! the channel capacity behind skips the oldest events.

use tokio::sync::broadcast;

use super::RiskEvent;

/// Default channel capacity.
pub const DEFAULT_CAPACITY: usize = 10_000;

/// Broadcast bus for [`RiskEvent`]s, cheap to clone.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<RiskEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl EventBus {
    /// Creates a bus buffering up to `capacity` events per lagging receiver.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publishes `event` and returns how many receivers got it.
    pub fn publish(&self, event: RiskEvent) -> usize {
        let topic = event.topic();
        let event_type = event.event_type_str();
        let delivered = self.sender.send(event).unwrap_or(0);
        tracing::trace!(?topic, event_type, delivered, "risk event published");
        delivered
    }

    /// Opens a receiver for events published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<RiskEvent> {
        self.sender.subscribe()
    }

    /// Number of open receivers.
    #[must_use]
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}
