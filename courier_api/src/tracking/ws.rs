use std::{future, sync::Arc};

use axum::{
    extract::{
        Path, Query, State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::Response,
};
use courier_tracking::{
    broadcaster::Subscription,
    events::TrackingEvent,
    ids::{DeliveryId, SubscriberId},
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{error::ApiError, state::AppState};

#[derive(Deserialize)]
pub struct WsParams {
    pub subscriber_id: SubscriberId,
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Subscribe,
    Unsubscribe,
    RequestLatest,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ControlMessage<'a> {
    Subscribed { delivery_id: &'a DeliveryId },
    Unsubscribed { delivery_id: &'a DeliveryId },
    Error { error: &'static str, message: String },
}

/// Upgrades to the live channel of a delivery. The authorization check runs
/// before the upgrade, so a refused subscriber gets a plain 403.
pub async fn handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Path(delivery_id): Path<DeliveryId>,
    Query(params): Query<WsParams>,
) -> Result<Response, ApiError> {
    let subscription = state
        .coordinator
        .subscribe(&delivery_id, &params.subscriber_id)?;

    Ok(ws.on_upgrade(move |socket| {
        handle_socket(socket, state, delivery_id, params.subscriber_id, subscription)
    }))
}

async fn next_event(subscription: &mut Option<Subscription>) -> Option<Arc<TrackingEvent>> {
    match subscription {
        Some(subscription) => subscription.recv().await,
        None => future::pending().await,
    }
}

async fn send_json<T: Serialize>(socket: &mut WebSocket, value: &T) -> bool {
    match serde_json::to_string(value) {
        Ok(text) => socket.send(Message::text(text)).await.is_ok(),
        Err(error) => {
            warn!(%error, "Could not serialize websocket message");
            true
        }
    }
}

async fn handle_socket(
    mut socket: WebSocket,
    state: Arc<AppState>,
    delivery_id: DeliveryId,
    subscriber_id: SubscriberId,
    subscription: Subscription,
) {
    debug!(%delivery_id, %subscriber_id, "Websocket connected");

    let mut subscription = Some(subscription);

    loop {
        tokio::select! {
            message = socket.recv() => {
                let text = match message {
                    Some(Ok(Message::Text(text))) => text,
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => continue,
                };

                let reply_ok = match serde_json::from_str::<ClientMessage>(text.as_str()) {
                    Ok(ClientMessage::Subscribe) => {
                        match state.coordinator.subscribe(&delivery_id, &subscriber_id) {
                            Ok(renewed) => {
                                subscription = Some(renewed);
                                send_json(&mut socket, &ControlMessage::Subscribed { delivery_id: &delivery_id }).await
                            }
                            Err(error) => {
                                send_json(&mut socket, &ControlMessage::Error { error: error.kind(), message: error.to_string() }).await
                            }
                        }
                    }
                    Ok(ClientMessage::Unsubscribe) => {
                        // Token scoped, so another connection of the same
                        // subscriber keeps its registration.
                        if let Some(subscription) = subscription.take() {
                            subscription.unsubscribe();
                        }
                        send_json(&mut socket, &ControlMessage::Unsubscribed { delivery_id: &delivery_id }).await
                    }
                    Ok(ClientMessage::RequestLatest) => {
                        match state.coordinator.latest_update(&delivery_id) {
                            Ok(event) => send_json(&mut socket, &event).await,
                            Err(error) => {
                                send_json(&mut socket, &ControlMessage::Error { error: error.kind(), message: error.to_string() }).await
                            }
                        }
                    }
                    Err(error) => {
                        send_json(&mut socket, &ControlMessage::Error { error: "bad_request", message: error.to_string() }).await
                    }
                };

                if !reply_ok {
                    break;
                }
            }
            event = next_event(&mut subscription) => {
                match event {
                    Some(event) => {
                        if !send_json(&mut socket, event.as_ref()).await {
                            break;
                        }
                    }
                    // Replaced by another connection of the same subscriber.
                    None => subscription = None,
                }
            }
        }
    }

    // Dropping the subscription unregisters it.
    drop(subscription);
    debug!(%delivery_id, %subscriber_id, "Websocket disconnected");
}
