use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use std::time::Duration;
use tracing::{error, info, warn};
use warp::ws::{Message, WebSocket};

use crate::orchestrator::SessionOrchestrator;
use game_types::{ClientMessage, GameError, Role, ServerMessage, SessionId};

pub mod connection;
pub mod handlers;
pub mod rate_limiter;


pub use connection::{ConnectionId, ConnectionRegistry};
use handlers::MessageHandler;
use rate_limiter::RateLimiter;

/// `?role=` on the upgrade URL; without it the first frame must be `connect`.
#[derive(Debug, Default, Deserialize)]
pub struct AttachQuery {
    pub role: Option<Role>,
}

#[derive(Debug, Clone, Copy)]
pub struct TransportSettings {
    pub handshake_timeout: Duration,
    pub rate_limit_burst: u32,
    pub rate_limit_refill: Duration,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            handshake_timeout: Duration::from_secs(10),
            rate_limit_burst: 30,
            rate_limit_refill: Duration::from_millis(500),
        }
    }
}

pub async fn handle_connection(
    websocket: WebSocket,
    session_id: SessionId,
    role: Option<Role>,
    orchestrator: SessionOrchestrator,
    settings: TransportSettings,
) {
    let (mut ws_sender, mut ws_receiver) = websocket.split();

    if orchestrator.sessions().get(&session_id).is_none() {
        warn!("WebSocket for unknown session {}", session_id);
        reject(&mut ws_sender, &GameError::SessionNotFound).await;
        return;
    }

    let role = match role {
        Some(role) => role,
        None => match await_handshake(&mut ws_receiver, settings.handshake_timeout).await {
            Ok(role) => role,
            Err(e) => {
                warn!("Handshake failed for session {}: {}", session_id, e);
                reject(&mut ws_sender, &e).await;
                return;
            }
        },
    };

    let (connection_id, message_receiver) = match orchestrator.attach(&session_id, role).await {
        Ok(attached) => attached,
        Err(e) => {
            reject(&mut ws_sender, &e).await;
            return;
        }
    };
    info!(
        "New WebSocket connection {} ({} in {})",
        connection_id, role, session_id
    );

    let message_handler =
        MessageHandler::new(connection_id, session_id.clone(), role, orchestrator.clone());

    // Handle incoming messages
    let incoming_handler = {
        let message_handler = message_handler.clone();
        let mut rate_limiter =
            RateLimiter::new_with_limits(settings.rate_limit_burst, settings.rate_limit_refill);

        async move {
            while let Some(result) = ws_receiver.next().await {
                match result {
                    Ok(msg) => {
                        if let Err(e) = handle_message(msg, &mut rate_limiter, &message_handler).await
                        {
                            warn!("Closing {}: {}", connection_id, e);
                            message_handler.send_error(&e).await;
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

    // Handle outgoing messages; ends once the registry drops the sender
    let outgoing_handler = async move {
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

        let _ = ws_sender.close().await;
    };

    tokio::pin!(incoming_handler);
    tokio::pin!(outgoing_handler);

    let client_side_closed = tokio::select! {
        _ = &mut incoming_handler => true,
        _ = &mut outgoing_handler => false,
    };

    if client_side_closed {
        // Flush whatever is already queued (e.g. a protocol error) and close
        orchestrator.connections().unregister(connection_id).await;
        outgoing_handler.await;
    }

    info!("Connection {} disconnected", connection_id);
    orchestrator.detach(connection_id, &session_id, role).await;
}

async fn handle_message(
    msg: Message,
    rate_limiter: &mut RateLimiter,
    message_handler: &MessageHandler,
) -> Result<(), GameError> {
    if !rate_limiter.check_rate_limit() {
        return Err(GameError::protocol("rate limit exceeded"));
    }

    // Only handle text messages
    if !msg.is_text() {
        return Ok(());
    }

    let text = msg
        .to_str()
        .map_err(|_| GameError::protocol("invalid text frame"))?;

    let client_message: ClientMessage = serde_json::from_str(text)
        .map_err(|e| GameError::protocol(format!("invalid JSON message: {}", e)))?;

    message_handler.handle_message(client_message).await
}

/// Waits for the `connect` envelope that names the client's role.
async fn await_handshake(
    ws_receiver: &mut SplitStream<WebSocket>,
    timeout: Duration,
) -> Result<Role, GameError> {
    let first_text = async {
        while let Some(result) = ws_receiver.next().await {
            let msg = result.map_err(|e| GameError::protocol(e.to_string()))?;
            if msg.is_close() {
                break;
            }
            if let Ok(text) = msg.to_str() {
                return Ok(text.to_string());
            }
        }
        Err(GameError::protocol("closed before connect"))
    };

    let text = tokio::time::timeout(timeout, first_text)
        .await
        .map_err(|_| GameError::protocol("no connect message before timeout"))??;

    match serde_json::from_str::<ClientMessage>(&text) {
        Ok(ClientMessage::Connect { client_type }) => Ok(client_type),
        Ok(_) => Err(GameError::protocol("first message must be connect")),
        Err(e) => Err(GameError::protocol(format!("invalid connect message: {}", e))),
    }
}

async fn reject(ws_sender: &mut SplitSink<WebSocket, Message>, err: &GameError) {
    match serde_json::to_string(&ServerMessage::error(err.to_string())) {
        Ok(json) => {
            let _ = ws_sender.send(Message::text(json)).await;
        }
        Err(e) => error!("Failed to serialize rejection: {:?}", e),
    }
    let _ = ws_sender.close().await;
}
