use dashmap::DashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use game_core::TimerTick;
use game_types::{ServerMessage, SessionId};

use crate::session_registry::SharedSession;
use crate::websocket::ConnectionRegistry;

struct ActiveTimer {
    token: CancellationToken,
    generation: u64,
}

/// Owns the round timer task of every playing session.
///
/// Callers start and cancel timers while holding the session lock, and
/// the task re-checks its token after taking that same lock, so a
/// cancelled timer never mutates or broadcasts again.
#[derive(Clone)]
pub struct TimerCoordinator {
    timers: Arc<DashMap<SessionId, ActiveTimer>>,
    generation: Arc<AtomicU64>,
    connections: Arc<ConnectionRegistry>,
    tick: Duration,
}

impl TimerCoordinator {
    pub fn new(connections: Arc<ConnectionRegistry>, tick: Duration) -> Self {
        Self {
            timers: Arc::new(DashMap::new()),
            generation: Arc::new(AtomicU64::new(0)),
            connections,
            tick,
        }
    }

    pub fn tick(&self) -> Duration {
        self.tick
    }

    /// Starts the round timer, replacing any timer already running for
    /// the session.
    pub fn start(&self, session_id: &str, session: SharedSession) {
        let token = CancellationToken::new();
        let generation = self.generation.fetch_add(1, Ordering::Relaxed);

        let previous = self.timers.insert(
            session_id.to_string(),
            ActiveTimer {
                token: token.clone(),
                generation,
            },
        );
        if let Some(previous) = previous {
            debug!("Replacing running timer for session {}", session_id);
            previous.token.cancel();
        }

        let coordinator = self.clone();
        let session_id = session_id.to_string();
        tokio::spawn(async move {
            coordinator
                .run_round(session_id, session, token, generation)
                .await;
        });
    }

    /// Returns whether a timer was running.
    pub fn cancel(&self, session_id: &str) -> bool {
        match self.timers.remove(session_id) {
            Some((_, timer)) => {
                timer.token.cancel();
                debug!("Cancelled timer for session {}", session_id);
                true
            }
            None => false,
        }
    }

    pub fn is_running(&self, session_id: &str) -> bool {
        self.timers.contains_key(session_id)
    }

    pub fn running_count(&self) -> usize {
        self.timers.len()
    }

    async fn run_round(
        &self,
        session_id: SessionId,
        session: SharedSession,
        token: CancellationToken,
        generation: u64,
    ) {
        loop {
            tokio::select! {
                _ = token.cancelled() => return,
                _ = tokio::time::sleep(self.tick) => {}
            }

            let mut session_guard = session.lock().await;
            if token.is_cancelled() {
                return;
            }

            match session_guard.tick() {
                TimerTick::Running { remaining } => {
                    debug!("Session {} timer at {}", session_id, remaining);
                    self.connections
                        .broadcast(&session_id, ServerMessage::TimerUpdate { timer: remaining })
                        .await;
                }
                TimerTick::Expired => {
                    info!("Session {} timer expired, moving to guessing", session_id);
                    self.release(&session_id, generation);
                    self.connections
                        .broadcast(&session_id, ServerMessage::TimerUpdate { timer: 0 })
                        .await;
                    self.connections
                        .broadcast(
                            &session_id,
                            ServerMessage::SessionState {
                                session: session_guard.snapshot(),
                            },
                        )
                        .await;
                    let seconds = session_guard.rules().guess_countdown_seconds;
                    let epoch = session_guard.guess_epoch;
                    drop(session_guard);
                    self.spawn_guess_countdown(&session_id, session.clone(), seconds, epoch);
                    return;
                }
                TimerTick::Halted => {
                    self.release(&session_id, generation);
                    return;
                }
            }
        }
    }

    /// Drops the map entry only if it still belongs to this task.
    fn release(&self, session_id: &str, generation: u64) {
        self.timers
            .remove_if(session_id, |_, timer| timer.generation == generation);
    }

    /// Broadcasts `countdown` from `seconds` down to 0, one tick apart, then
    /// returns the session to `paused` if it is still in the guess stamped
    /// with `epoch`. Not cancellable once started; it goes quiet only when
    /// a newer guess has begun, which runs its own countdown.
    pub fn spawn_guess_countdown(
        &self,
        session_id: &str,
        session: SharedSession,
        seconds: u32,
        epoch: u64,
    ) {
        let connections = self.connections.clone();
        let tick = self.tick;
        let session_id = session_id.to_string();

        tokio::spawn(async move {
            for remaining in (0..=seconds).rev() {
                {
                    let session_guard = session.lock().await;
                    if session_guard.guess_epoch != epoch {
                        debug!(
                            "Session {} started a newer guess, dropping countdown {}",
                            session_id, epoch
                        );
                        return;
                    }
                    connections
                        .broadcast(&session_id, ServerMessage::Countdown { seconds: remaining })
                        .await;
                }
                if remaining > 0 {
                    tokio::time::sleep(tick).await;
                }
            }

            let mut session_guard = session.lock().await;
            if session_guard.guess_epoch != epoch {
                return;
            }
            if session_guard.finish_guess(epoch) {
                info!("Session {} guess countdown finished, paused", session_id);
            }
            connections
                .broadcast(
                    &session_id,
                    ServerMessage::SessionState {
                        session: session_guard.snapshot(),
                    },
                )
                .await;
        });
    }
}
