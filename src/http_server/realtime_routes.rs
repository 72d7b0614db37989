//! Realtime HTTP Routes and WebSocket Handler
//!
//! `GET /changes` upgrades to a WebSocket that forwards every change event
//! published on the bus. Frames are JSON text, see [`FeedMessage`].

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use futures_util::{stream::SplitSink, SinkExt, StreamExt};
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::server::AppState;
use crate::realtime::{ClientMessage, FeedMessage};

/// Realtime routes with WebSocket support
pub fn realtime_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/changes", get(websocket_handler))
        .with_state(state)
}

/// Handle WebSocket upgrade request
async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_websocket(socket, state))
}

type FeedSink = SplitSink<WebSocket, Message>;

/// Send one frame; false once the peer is gone
async fn send_frame(sender: &mut FeedSink, message: &FeedMessage) -> bool {
    match message.encode() {
        Ok(json) => sender.send(Message::Text(json.into())).await.is_ok(),
        Err(e) => {
            warn!(error = %e, "FEED_ENCODE_FAILED");
            true
        }
    }
}

/// Handle individual WebSocket connection
async fn handle_websocket(socket: WebSocket, state: Arc<AppState>) {
    let metrics = Arc::clone(state.service.metrics());
    metrics.feed_opened();

    // Subscribe first so nothing published after the hello is missed.
    let mut subscription = state.service.subscribe();
    let connection_id = subscription.id().to_string();
    info!(%connection_id, "FEED_OPENED");

    let (mut sender, mut receiver) = socket.split();

    let hello = FeedMessage::Connected {
        connection_id: connection_id.clone(),
        last_update: state.service.store().last_update(),
    };

    let mut heartbeat = time::interval(state.heartbeat_interval);
    heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);
    heartbeat.tick().await;

    let mut open = send_frame(&mut sender, &hello).await;
    while open {
        open = tokio::select! {
            event = subscription.recv() => match event {
                Ok(event) => send_frame(&mut sender, &FeedMessage::Change { event }).await,
                Err(e) => {
                    send_frame(&mut sender, &FeedMessage::error(&e)).await;
                    false
                }
            },
            _ = heartbeat.tick() => send_frame(&mut sender, &FeedMessage::heartbeat(None)).await,
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Text(text))) => match ClientMessage::decode(&text) {
                    Ok(ClientMessage::Heartbeat { ref_id }) => {
                        send_frame(&mut sender, &FeedMessage::heartbeat(ref_id)).await
                    }
                    Err(e) => send_frame(&mut sender, &FeedMessage::error(&e)).await,
                },
                Some(Ok(Message::Ping(data))) => sender.send(Message::Pong(data)).await.is_ok(),
                Some(Ok(Message::Close(_))) | None => false,
                Some(Err(e)) => {
                    debug!(%connection_id, error = %e, "FEED_RECEIVE_FAILED");
                    false
                }
                Some(Ok(_)) => true,
            },
        };
    }

    let _ = sender.close().await;
    metrics.feed_closed();
    info!(%connection_id, "FEED_CLOSED");
}
