use tracing::{debug, warn};

use crate::orchestrator::SessionOrchestrator;
use crate::websocket::connection::ConnectionId;
use game_core::Verdict;
use game_types::{ClientMessage, GameError, Role, ServerMessage, SessionId};

/// Dispatches the commands of one attached connection.
#[derive(Clone)]
pub struct MessageHandler {
    connection_id: ConnectionId,
    session_id: SessionId,
    role: Role,
    orchestrator: SessionOrchestrator,
}

impl MessageHandler {
    pub fn new(
        connection_id: ConnectionId,
        session_id: SessionId,
        role: Role,
        orchestrator: SessionOrchestrator,
    ) -> Self {
        Self {
            connection_id,
            session_id,
            role,
            orchestrator,
        }
    }

    pub fn connection_id(&self) -> ConnectionId {
        self.connection_id
    }

    /// Recoverable failures (pass limit, exhausted words, storage) are sent
    /// back as an `error` envelope. An `Err` means the connection has to go.
    pub async fn handle_message(&self, message: ClientMessage) -> Result<(), GameError> {
        self.orchestrator
            .connections()
            .update_activity(self.connection_id)
            .await;

        let result = match message {
            ClientMessage::Ping => {
                self.send_message(ServerMessage::Pong).await;
                Ok(())
            }
            ClientMessage::GetState => self.handle_get_state().await,
            ClientMessage::TestConnection => {
                self.send_message(ServerMessage::TestResponse {
                    message: "Connection test successful".to_string(),
                    client_type: self.role,
                    session_uuid: self.session_id.clone(),
                })
                .await;
                Ok(())
            }
            ClientMessage::Connect { client_type } => {
                debug!(
                    "{} sent connect as {} after attaching as {}, ignoring",
                    self.connection_id, client_type, self.role
                );
                Ok(())
            }
            ClientMessage::StartGame => {
                self.orchestrator
                    .start_game(&self.session_id, self.role)
                    .await
            }
            ClientMessage::StopGame => {
                self.orchestrator
                    .stop_game(&self.session_id, self.role)
                    .await
            }
            ClientMessage::AdjustTimer { seconds } => {
                self.orchestrator
                    .adjust_timer(&self.session_id, self.role, seconds)
                    .await
            }
            ClientMessage::AdjustStats { stat_type, delta } => {
                self.orchestrator
                    .adjust_stats(&self.session_id, self.role, stat_type, delta)
                    .await
            }
            ClientMessage::MarkWordCorrect => {
                self.orchestrator
                    .mark_word(&self.session_id, self.role, Verdict::Correct)
                    .await
            }
            ClientMessage::MarkWordIncorrect => {
                self.orchestrator
                    .mark_word(&self.session_id, self.role, Verdict::Incorrect)
                    .await
            }
            ClientMessage::PassWord => {
                self.orchestrator
                    .pass_word(&self.session_id, self.role)
                    .await
            }
            ClientMessage::RequestGuess => {
                self.orchestrator
                    .request_guess(&self.session_id, self.role)
                    .await
            }
            ClientMessage::ResetGame => {
                self.orchestrator
                    .reset_game(&self.session_id, self.role)
                    .await
            }
            ClientMessage::Unknown => {
                debug!("Ignoring unknown message type from {}", self.connection_id);
                Ok(())
            }
        };

        match result {
            Err(e @ (GameError::SessionNotFound | GameError::ProtocolError { .. })) => Err(e),
            Err(e) => {
                self.send_error(&e).await;
                Ok(())
            }
            Ok(()) => Ok(()),
        }
    }

    async fn handle_get_state(&self) -> Result<(), GameError> {
        let session = self
            .orchestrator
            .snapshot(&self.session_id)
            .await
            .ok_or(GameError::SessionNotFound)?;
        self.send_message(ServerMessage::SessionState { session })
            .await;
        Ok(())
    }

    pub async fn send_error(&self, err: &GameError) {
        self.send_message(ServerMessage::error(err.to_string()))
            .await;
    }

    async fn send_message(&self, message: ServerMessage) {
        if let Err(e) = self
            .orchestrator
            .connections()
            .send_to_connection(self.connection_id, message)
            .await
        {
            warn!("Failed to send to {}: {}", self.connection_id, e);
        }
    }
}
