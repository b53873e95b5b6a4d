use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use game_core::Verdict;
use game_types::{GameError, Role, ServerMessage, SessionId, SessionSnapshot, StatType};

use crate::session_registry::{SessionError, SessionRegistry, SharedSession};
use crate::timer::TimerCoordinator;
use crate::websocket::{ConnectionId, ConnectionRegistry};
use crate::word_pool::WordPool;

/// The session state machine as a service: validates each command against
/// role and state, mutates the session under its lock, drives the timer
/// and fans the result out to every connection of the session.
///
/// Commands whose role or state preconditions fail are ignored. Errors
/// returned here are meant for the requesting connection only.
#[derive(Clone)]
pub struct SessionOrchestrator {
    sessions: Arc<SessionRegistry>,
    words: Arc<WordPool>,
    connections: Arc<ConnectionRegistry>,
    timers: TimerCoordinator,
}

impl SessionOrchestrator {
    pub fn new(
        sessions: Arc<SessionRegistry>,
        words: Arc<WordPool>,
        connections: Arc<ConnectionRegistry>,
        tick: Duration,
    ) -> Self {
        let timers = TimerCoordinator::new(connections.clone(), tick);
        Self {
            sessions,
            words,
            connections,
            timers,
        }
    }

    pub fn sessions(&self) -> &Arc<SessionRegistry> {
        &self.sessions
    }

    pub fn connections(&self) -> &Arc<ConnectionRegistry> {
        &self.connections
    }

    pub fn words(&self) -> &Arc<WordPool> {
        &self.words
    }

    pub fn timers(&self) -> &TimerCoordinator {
        &self.timers
    }

    pub async fn create_session(&self, secret: Option<&str>) -> Result<SessionId, SessionError> {
        self.sessions.create(secret).await
    }

    pub async fn join_session(
        &self,
        secret: Option<&str>,
        code: &str,
    ) -> Result<SessionId, SessionError> {
        self.sessions.join(secret, code).await
    }

    pub async fn snapshot(&self, session_id: &str) -> Option<SessionSnapshot> {
        let session = self.sessions.get(session_id)?;
        let session = session.lock().await;
        Some(session.snapshot())
    }

    /// Registers a connection, hands it the full state and tells everyone
    /// else in the session about the new role.
    pub async fn attach(
        &self,
        session_id: &str,
        role: Role,
    ) -> Result<(ConnectionId, mpsc::UnboundedReceiver<ServerMessage>), GameError> {
        let session = self.session(session_id)?;
        let mut session = session.lock().await;

        let (connection_id, receiver) = self.connections.register(session_id, role).await;
        session.add_role(role);
        let state = ServerMessage::SessionState {
            session: session.snapshot(),
        };

        let _ = self
            .connections
            .send_to_connection(connection_id, state.clone())
            .await;
        self.connections
            .send_to_session_except(session_id, connection_id, state)
            .await;

        info!("{} attached to session {} as {}", connection_id, session_id, role);
        Ok((connection_id, receiver))
    }

    /// The role leaves the session's connected set only once no other live
    /// connection holds it.
    pub async fn detach(&self, connection_id: ConnectionId, session_id: &str, role: Role) {
        self.connections.unregister(connection_id).await;

        let Some(session) = self.sessions.get(session_id) else {
            return;
        };
        let mut session = session.lock().await;
        if !self.connections.has_role(session_id, role).await {
            session.remove_role(role);
        }
        self.broadcast_state(session_id, &session.snapshot()).await;

        info!("{} detached from session {}", connection_id, session_id);
    }

    pub async fn start_game(&self, session_id: &str, role: Role) -> Result<(), GameError> {
        let shared = self.session(session_id)?;
        let mut session = shared.lock().await;
        if !session.can_start(role) {
            debug!("Ignoring start_game from {} in {}", role, session.state);
            return Ok(());
        }

        let word = match self.words.draw(session_id).await {
            Ok(Some(word)) => word,
            Ok(None) => {
                warn!("Session {} has no more words", session_id);
                let err = GameError::WordsExhausted;
                self.connections
                    .broadcast(
                        session_id,
                        ServerMessage::GameEnded {
                            message: err.to_string(),
                        },
                    )
                    .await;
                return Err(err);
            }
            Err(e) => return Err(storage_error(session_id, e)),
        };

        session.begin_round(word);
        self.timers.start(session_id, shared.clone());
        info!(
            "Session {} playing, {}s on the clock",
            session_id, session.timer_seconds
        );

        self.broadcast_state(session_id, &session.snapshot()).await;
        Ok(())
    }

    pub async fn stop_game(&self, session_id: &str, role: Role) -> Result<(), GameError> {
        let shared = self.session(session_id)?;
        let mut session = shared.lock().await;
        if !session.stop(role) {
            return Ok(());
        }

        self.timers.cancel(session_id);
        info!("Session {} paused by controller", session_id);
        self.broadcast_state(session_id, &session.snapshot()).await;
        Ok(())
    }

    pub async fn adjust_timer(
        &self,
        session_id: &str,
        role: Role,
        seconds: i32,
    ) -> Result<(), GameError> {
        let shared = self.session(session_id)?;
        let mut session = shared.lock().await;
        if session.adjust_timer(role, seconds) {
            self.broadcast_state(session_id, &session.snapshot()).await;
        }
        Ok(())
    }

    pub async fn adjust_stats(
        &self,
        session_id: &str,
        role: Role,
        stat_type: StatType,
        delta: i32,
    ) -> Result<(), GameError> {
        let shared = self.session(session_id)?;
        let mut session = shared.lock().await;
        if session.adjust_stat(role, stat_type, delta) {
            self.broadcast_state(session_id, &session.snapshot()).await;
        }
        Ok(())
    }

    /// Records the verdict on the current word. The word is persisted as
    /// used before anything changes in memory.
    pub async fn mark_word(
        &self,
        session_id: &str,
        role: Role,
        verdict: Verdict,
    ) -> Result<(), GameError> {
        let shared = self.session(session_id)?;
        let mut session = shared.lock().await;
        let Some(word) = session.word_to_settle(role).map(str::to_string) else {
            return Ok(());
        };

        self.words
            .mark_used(session_id, &word)
            .await
            .map_err(|e| storage_error(session_id, e))?;

        self.timers.cancel(session_id);
        session.settle_word(verdict);
        info!("Session {} marked {:?} as {:?}", session_id, word, verdict);

        self.broadcast_state(session_id, &session.snapshot()).await;
        Ok(())
    }

    pub async fn pass_word(&self, session_id: &str, role: Role) -> Result<(), GameError> {
        let shared = self.session(session_id)?;
        let mut session = shared.lock().await;
        match session.pass(role) {
            Ok(true) => {}
            Ok(false) => return Ok(()),
            Err(e) => {
                warn!("Session {}: {}", session_id, e);
                return Err(e);
            }
        }

        self.timers.cancel(session_id);
        info!(
            "Session {} word passed ({}/{})",
            session_id,
            session.pass_count,
            session.rules().max_passes
        );

        self.connections
            .broadcast(session_id, ServerMessage::PassEvent)
            .await;
        self.broadcast_state(session_id, &session.snapshot()).await;
        Ok(())
    }

    pub async fn request_guess(&self, session_id: &str, role: Role) -> Result<(), GameError> {
        let shared = self.session(session_id)?;
        let mut session = shared.lock().await;
        if !session.request_guess(role) {
            return Ok(());
        }

        self.timers.cancel(session_id);
        info!("Session {} guess requested", session_id);

        self.connections
            .broadcast(session_id, ServerMessage::GuessEvent)
            .await;
        self.broadcast_state(session_id, &session.snapshot()).await;

        let seconds = session.rules().guess_countdown_seconds;
        self.timers
            .spawn_guess_countdown(session_id, shared.clone(), seconds, session.guess_epoch);
        Ok(())
    }

    /// Back to `lobby` from any state. The used-words record is emptied
    /// first; if that fails the session is left as it was.
    pub async fn reset_game(&self, session_id: &str, role: Role) -> Result<(), GameError> {
        let shared = self.session(session_id)?;
        let mut session = shared.lock().await;
        if !role.is_controller() {
            return Ok(());
        }

        self.words
            .clear_used(session_id)
            .await
            .map_err(|e| storage_error(session_id, e))?;

        self.timers.cancel(session_id);
        session.reset(role);
        info!("Session {} reset", session_id);

        self.broadcast_state(session_id, &session.snapshot()).await;
        Ok(())
    }

    fn session(&self, session_id: &str) -> Result<SharedSession, GameError> {
        self.sessions
            .get(session_id)
            .ok_or(GameError::SessionNotFound)
    }

    async fn broadcast_state(&self, session_id: &str, snapshot: &SessionSnapshot) {
        self.connections
            .broadcast(
                session_id,
                ServerMessage::SessionState {
                    session: snapshot.clone(),
                },
            )
            .await;
    }
}

/// The detail stays in the log; clients only learn that storage failed.
fn storage_error(session_id: &str, err: anyhow::Error) -> GameError {
    error!("Storage failure in session {}: {:#}", session_id, err);
    GameError::Storage {
        message: "request could not be saved".to_string(),
    }
}
