//! WebSocket connection state machine.
//!
//! Handles the read/write loop for a single WebSocket connection,
//! dispatching incoming commands and forwarding filtered events.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast;

use super::messages::{WsCommand, WsMessage, WsMessageType};
use super::subscription::SubscriptionManager;
use crate::api::dto::RiskZoneDto;
use crate::domain::RiskEvent;
use crate::service::RiskService;

/// Runs the read/write loop for a single WebSocket connection.
///
/// - Reads commands from the client and dispatches them.
/// - Forwards matching events from the [`broadcast::Receiver`] to the client.
pub async fn run_connection(
    socket: WebSocket,
    mut event_rx: broadcast::Receiver<RiskEvent>,
    risk_service: Arc<RiskService>,
) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let mut subs = SubscriptionManager::new();

    loop {
        tokio::select! {
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let response = handle_text_message(&text, &mut subs, &risk_service).await;
                        if let Some(resp_json) = response
                            && ws_tx.send(Message::text(resp_json)).await.is_err() {
                                break;
                            }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    _ => {}
                }
            }
            event = event_rx.recv() => {
                match event {
                    Ok(risk_event) => {
                        if subs.matches(risk_event.topic()) {
                            let msg = WsMessage::new(
                                uuid::Uuid::new_v4().to_string(),
                                WsMessageType::Event,
                                serde_json::to_value(&risk_event).unwrap_or_default(),
                            );
                            let json = serde_json::to_string(&msg).unwrap_or_default();
                            if ws_tx.send(Message::text(json)).await.is_err() {
                                break;
                            }
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(lagged = n, "ws client lagged behind event bus");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }

    tracing::debug!("ws connection closed");
}

/// Handles a text message from the client, returning an optional JSON response.
async fn handle_text_message(
    text: &str,
    subs: &mut SubscriptionManager,
    risk_service: &RiskService,
) -> Option<String> {
    let Ok(msg) = serde_json::from_str::<WsMessage>(text) else {
        return serde_json::to_string(&WsMessage::error("", 400, "malformed JSON")).ok();
    };

    let Ok(command) = serde_json::from_value::<WsCommand>(msg.payload) else {
        return serde_json::to_string(&WsMessage::error(msg.id, 404, "unknown command")).ok();
    };

    let response = match command {
        WsCommand::Subscribe { topics } => {
            let unknown = subs.subscribe(&topics);
            let subscribed: Vec<&String> = topics.iter().filter(|t| !unknown.contains(t)).collect();
            WsMessage::new(
                msg.id,
                WsMessageType::Response,
                serde_json::json!({
                    "subscribed": subscribed,
                    "unknown": unknown,
                    "count": subs.count(),
                    "wildcard": subs.is_subscribed_all(),
                }),
            )
        }
        WsCommand::Unsubscribe { topics } => {
            subs.unsubscribe(&topics);
            WsMessage::new(
                msg.id,
                WsMessageType::Response,
                serde_json::json!({
                    "unsubscribed": topics,
                    "remaining_count": subs.count(),
                    "wildcard": subs.is_subscribed_all(),
                }),
            )
        }
        WsCommand::GetZones { min_risk } => {
            match risk_service.zones(min_risk.unwrap_or(0.0)).await {
                Ok(zones) => {
                    let zones: Vec<RiskZoneDto> =
                        zones.into_iter().map(RiskZoneDto::from).collect();
                    WsMessage::new(
                        msg.id,
                        WsMessageType::Response,
                        serde_json::json!({ "count": zones.len(), "zones": zones }),
                    )
                }
                Err(err) => WsMessage::new(
                    msg.id,
                    WsMessageType::Error,
                    serde_json::json!({ "code": err.error_code(), "message": err.to_string() }),
                ),
            }
        }
    };
    serde_json::to_string(&response).ok()
}
