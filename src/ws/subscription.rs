//! Per-connection subscription manager.
//!
//! Tracks which event topics a WebSocket client is subscribed to and
//! provides server-side event filtering.

use std::collections::HashSet;

use crate::domain::Topic;

/// Wildcard topic name.
pub const WILDCARD: &str = "*";

/// Manages the set of topic subscriptions for a single WebSocket connection.
#[derive(Debug, Default)]
pub struct SubscriptionManager {
    /// Subscribed topics. If `subscribe_all` is true, this set is ignored.
    topics: HashSet<Topic>,
    /// Whether the client subscribes to every topic (wildcard `"*"`).
    subscribe_all: bool,
}

impl SubscriptionManager {
    /// Creates a new empty subscription manager.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds topics by name and returns the names that were not recognized.
    pub fn subscribe(&mut self, names: &[String]) -> Vec<String> {
        let mut unknown = Vec::new();
        for name in names {
            if name == WILDCARD {
                self.subscribe_all = true;
            } else if let Some(topic) = Topic::parse(name) {
                self.topics.insert(topic);
            } else {
                unknown.push(name.clone());
            }
        }
        unknown
    }

    /// Removes topics by name. `"*"` clears the wildcard.
    pub fn unsubscribe(&mut self, names: &[String]) {
        for name in names {
            if name == WILDCARD {
                self.subscribe_all = false;
            } else if let Some(topic) = Topic::parse(name) {
                self.topics.remove(&topic);
            }
        }
    }

    /// Returns `true` if events of `topic` should be forwarded.
    #[must_use]
    pub fn matches(&self, topic: Topic) -> bool {
        self.subscribe_all || self.topics.contains(&topic)
    }

    /// Returns the number of explicitly subscribed topics.
    #[must_use]
    pub fn count(&self) -> usize {
        self.topics.len()
    }

    /// Returns `true` if the wildcard subscription is active.
    #[must_use]
    pub fn is_subscribed_all(&self) -> bool {
        self.subscribe_all
    }
}
