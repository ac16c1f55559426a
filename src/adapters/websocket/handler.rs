//! WebSocket endpoint streaming the telemetry plane.
//!
//! Connection lifecycle:
//! 1. Upgrade and send `connected` with a starting cursor
//! 2. Process subscribe/unsubscribe/ping frames until disconnect
//! 3. Forward matching events as raw envelopes, one per message
//! 4. Drop the connection's subscriber entry on disconnect

use std::sync::{Arc, Mutex};

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use crate::adapters::events::EventBus;
use crate::domain::foundation::SubscriberId;
use crate::domain::telemetry::EventEnvelope;
use crate::ports::EventSink;

use super::messages::{ClientMessage, ServerMessage};

/// State required for WebSocket handling.
#[derive(Clone)]
pub struct WebSocketState {
    pub bus: Arc<EventBus>,
}

impl WebSocketState {
    /// Create a new WebSocket state over the bus.
    pub fn new(bus: Arc<EventBus>) -> Self {
        Self { bus }
    }
}

/// Sink that enqueues serialized envelopes onto the connection's
/// outbound channel.
///
/// The channel send never blocks, which keeps `EventBus::emit` fast no
/// matter how slow the socket is; the socket pump applies whatever
/// backpressure the transport itself has.
struct ChannelSink {
    outbound: mpsc::UnboundedSender<Message>,
}

impl EventSink for ChannelSink {
    fn deliver(&self, event: EventEnvelope) {
        match serde_json::to_string(&event) {
            Ok(json) => {
                // A closed channel means the connection is going away and
                // cleanup will unsubscribe us; dropping the event is fine.
                let _ = self.outbound.send(Message::Text(json.into()));
            }
            Err(err) => {
                tracing::error!(error = %err, "event envelope serialization failed");
            }
        }
    }
}

/// Handle WebSocket upgrade requests for the event stream.
///
/// Route: `GET /api/events/live`
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<WebSocketState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle an established WebSocket connection for its whole lifetime.
async fn handle_socket(socket: WebSocket, state: WebSocketState) {
    let (mut sender, mut receiver) = socket.split();
    let (outbound, mut outbound_rx) = mpsc::unbounded_channel::<Message>();

    // The active subscription for this connection, shared with the
    // receive task so cleanup runs no matter which side ends first.
    let subscription: Arc<Mutex<Option<SubscriberId>>> = Arc::new(Mutex::new(None));

    queue_control(
        &outbound,
        &ServerMessage::Connected {
            cursor: state.bus.current_cursor(),
        },
    );

    // Pump the outbound channel into the socket.
    let mut send_task = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            if sender.send(message).await.is_err() {
                break;
            }
        }
    });

    let recv_bus = state.bus.clone();
    let recv_subscription = subscription.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(result) = receiver.next().await {
            match result {
                Ok(Message::Text(text)) => {
                    handle_client_message(
                        text.as_str(),
                        &recv_bus,
                        &recv_subscription,
                        &outbound,
                    );
                }
                Ok(Message::Binary(_)) => {
                    queue_control(
                        &outbound,
                        &ServerMessage::error("binary frames are not supported"),
                    );
                }
                Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {
                    // Protocol-level frames handled by axum.
                }
                Ok(Message::Close(_)) => break,
                Err(err) => {
                    tracing::debug!(error = %err, "websocket receive error");
                    break;
                }
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => {
            recv_task.abort();
        }
        _ = &mut recv_task => {
            send_task.abort();
        }
    }

    // Auto-unsubscribe on disconnect so no subscriber entry leaks.
    let final_subscription = subscription.lock().expect("subscription lock poisoned").take();
    if let Some(id) = final_subscription {
        state.bus.unsubscribe(id);
        tracing::debug!(subscriber_id = %id, "connection closed, subscription dropped");
    }
}

/// Apply one client control frame.
fn handle_client_message(
    text: &str,
    bus: &Arc<EventBus>,
    subscription: &Arc<Mutex<Option<SubscriberId>>>,
    outbound: &mpsc::UnboundedSender<Message>,
) {
    match serde_json::from_str::<ClientMessage>(text) {
        Ok(ClientMessage::Subscribe { cursor, filters }) => {
            // A stale registration would double-deliver; replace it.
            if let Some(previous) = subscription
                .lock()
                .expect("subscription lock poisoned")
                .take()
            {
                bus.unsubscribe(previous);
            }

            let sink = Arc::new(ChannelSink {
                outbound: outbound.clone(),
            });
            let id = bus.subscribe(sink, filters.unwrap_or_default(), cursor);
            *subscription.lock().expect("subscription lock poisoned") = Some(id);

            queue_control(
                outbound,
                &ServerMessage::Subscribed {
                    cursor: bus.current_cursor(),
                },
            );
        }
        Ok(ClientMessage::Unsubscribe) => {
            if let Some(previous) = subscription
                .lock()
                .expect("subscription lock poisoned")
                .take()
            {
                bus.unsubscribe(previous);
            }
        }
        Ok(ClientMessage::Ping) => {
            queue_control(outbound, &ServerMessage::pong_now());
        }
        Err(err) => {
            queue_control(
                outbound,
                &ServerMessage::error(format!("unrecognized message: {}", err)),
            );
        }
    }
}

/// Serialize a control frame onto the outbound channel.
fn queue_control(outbound: &mpsc::UnboundedSender<Message>, message: &ServerMessage) {
    let json =
        serde_json::to_string(message).expect("ServerMessage serialization should not fail");
    let _ = outbound.send(Message::Text(json.into()));
}

/// Create the axum router for the streaming endpoint.
pub fn websocket_router() -> axum::Router<WebSocketState> {
    use axum::routing::get;

    axum::Router::new().route("/live", get(ws_handler))
}
