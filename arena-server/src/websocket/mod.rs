use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tracing::{error, info, warn};
use warp::ws::{Message, WebSocket};

use crate::auth::SessionClaims;
use crate::state::LiveStateManager;
use arena_persistence::repositories::ScoreRepository;
use arena_types::{ClientMessage, ServerMessage};

pub mod connection;
pub mod handlers;
pub mod rate_limiter;

use connection::ConnectionId;
pub use connection::ConnectionManager;
use handlers::MessageHandler;
use rate_limiter::RateLimiter;

/// Drives one client socket after the session token was verified at
/// upgrade time. The first push is always the current live-state
/// snapshot, so a reconnecting client catches up immediately.
pub async fn handle_connection(
    websocket: WebSocket,
    claims: SessionClaims,
    connection_manager: Arc<ConnectionManager>,
    live_state: Arc<LiveStateManager>,
    score_repository: Arc<ScoreRepository>,
) {
    let connection_id = ConnectionId::new();
    info!(
        "New WebSocket connection {} for user {}",
        connection_id, claims.sub
    );

    let (mut ws_sender, mut ws_receiver) = websocket.split();
    let rate_limiter = RateLimiter::new();

    let message_receiver = connection_manager
        .create_connection(connection_id, claims.clone())
        .await;

    let snapshot = live_state.snapshot().await;
    let _ = connection_manager
        .send_to_connection(connection_id, ServerMessage::GameStateUpdate { state: snapshot })
        .await;

    let message_handler = MessageHandler::new(
        connection_id,
        claims,
        connection_manager.clone(),
        live_state,
        score_repository,
    );

    let incoming_handler = {
        let message_handler = message_handler.clone();
        let mut rate_limiter = rate_limiter.clone();

        async move {
            while let Some(result) = ws_receiver.next().await {
                match result {
                    Ok(msg) => {
                        if let Err(e) =
                            handle_message(msg, &mut rate_limiter, &message_handler, connection_id)
                                .await
                        {
                            error!("Error handling message for {}: {}", connection_id, e);
                            break;
                        }
                    }
                    Err(e) => {
                        warn!("WebSocket error for {}: {}", connection_id, e);
                        break;
                    }
                }
            }
        }
    };

    let outgoing_handler = {
        async move {
            let mut receiver = message_receiver;

            while let Some(message) = receiver.recv().await {
                let json = match serde_json::to_string(&message) {
                    Ok(json) => json,
                    Err(e) => {
                        error!("Failed to serialize message: {:?}", e);
                        continue;
                    }
                };

                if let Err(e) = ws_sender.send(Message::text(json)).await {
                    warn!("Failed to send message to {}: {:?}", connection_id, e);
                    break;
                }
            }
        }
    };

    tokio::select! {
        _ = incoming_handler => {},
        _ = outgoing_handler => {},
    }

    info!("Connection {} disconnected", connection_id);
    connection_manager.remove_connection(connection_id).await;
}

async fn handle_message(
    msg: Message,
    rate_limiter: &mut RateLimiter,
    message_handler: &MessageHandler,
    connection_id: ConnectionId,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    if !rate_limiter.allow() {
        warn!("Rate limit exceeded for connection {}", connection_id);
        return Err("Rate limit exceeded".into());
    }

    // Only handle text frames; pings and binary are dropped.
    if !msg.is_text() {
        return Ok(());
    }

    let text = msg.to_str().map_err(|_| "Invalid text message")?;

    let client_message: ClientMessage =
        serde_json::from_str(text).map_err(|e| format!("Invalid JSON message: {}", e))?;

    message_handler
        .handle_message(client_message)
        .await
        .map_err(|e| format!("Message handling error: {}", e))?;

    Ok(())
}
