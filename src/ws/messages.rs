//! WebSocket message types: envelope and commands.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Top-level WebSocket message envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WsMessage {
    /// Client-provided ID for requests; server-generated for events.
    pub id: String,
    /// Message type discriminator.
    #[serde(rename = "type")]
    pub msg_type: WsMessageType,
    /// ISO-8601 timestamp.
    pub timestamp: DateTime<Utc>,
    /// Variant-specific payload.
    pub payload: serde_json::Value,
}

impl WsMessage {
    /// Builds a server message stamped with the current time.
    #[must_use]
    pub fn new(id: impl Into<String>, msg_type: WsMessageType, payload: serde_json::Value) -> Self {
        Self {
            id: id.into(),
            msg_type,
            timestamp: Utc::now(),
            payload,
        }
    }

    /// Builds an error message with a numeric code.
    #[must_use]
    pub fn error(id: impl Into<String>, code: u16, message: &str) -> Self {
        Self::new(
            id,
            WsMessageType::Error,
            serde_json::json!({ "code": code, "message": message }),
        )
    }
}

/// Discriminator for WebSocket message types.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WsMessageType {
    /// Client → Server command.
    Command,
    /// Server → Client response to a command.
    Response,
    /// Server → Client broadcast event.
    Event,
    /// Server → Client error.
    Error,
}

/// Commands that a client can send over WebSocket.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum WsCommand {
    /// Subscribe to event topics.
    Subscribe {
        /// Topic names (`"zones"`, `"earthquakes"`). Use `["*"]` for all.
        topics: Vec<String>,
    },
    /// Unsubscribe from event topics.
    Unsubscribe {
        /// Topic names to drop.
        topics: Vec<String>,
    },
    /// Fetch the current zone set.
    GetZones {
        /// Minimum risk level, default 0.
        #[serde(default)]
        min_risk: Option<f64>,
    },
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn subscribe_command_parses_from_payload() {
        let raw = r#"{"id":"1","type":"command","timestamp":"2024-01-01T00:00:00Z",
                      "payload":{"command":"subscribe","topics":["zones","*"]}}"#;
        let Ok(msg) = serde_json::from_str::<WsMessage>(raw) else {
            panic!("envelope should parse");
        };
        assert_eq!(msg.msg_type, WsMessageType::Command);
        let Ok(WsCommand::Subscribe { topics }) = serde_json::from_value(msg.payload) else {
            panic!("expected subscribe");
        };
        assert_eq!(topics, vec!["zones".to_string(), "*".to_string()]);
    }

    #[test]
    fn get_zones_defaults_min_risk() {
        let Ok(WsCommand::GetZones { min_risk }) =
            serde_json::from_value(serde_json::json!({"command": "get_zones"}))
        else {
            panic!("expected get_zones");
        };
        assert!(min_risk.is_none());
    }
}
