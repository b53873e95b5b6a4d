#![allow(dead_code)]

use std::time::Duration;

use game_core::{GameRules, WordList};
use game_persistence::connection::connect_to_memory_database;
use game_persistence::repositories::UsedWordRepository;
use game_server::config::Config;
use game_server::orchestrator::SessionOrchestrator;
use game_server::websocket::ConnectionId;
use game_server::word_pool::WordSource;
use game_server::build_orchestrator;
use game_types::{GameState, Role, ServerMessage, SessionSnapshot};
use migration::{Migrator, MigratorTrait};
use sea_orm::DatabaseConnection;
use tokio::sync::mpsc::UnboundedReceiver;

pub const API_KEY: &str = "test-key-123";
pub const TICK_MILLIS: u64 = 20;

pub fn tick() -> Duration {
    Duration::from_millis(TICK_MILLIS)
}

/// Full service stack over an in-memory database and a fixed word list.
pub struct TestServer {
    pub db: DatabaseConnection,
    pub orchestrator: SessionOrchestrator,
    pub used_words: UsedWordRepository,
}

impl TestServer {
    pub async fn new(words: &[&str]) -> Self {
        Self::with_rules(words, GameRules::default()).await
    }

    pub async fn with_rules(words: &[&str], rules: GameRules) -> Self {
        let db = connect_to_memory_database().await.unwrap();
        Migrator::up(&db, None).await.unwrap();

        let config = Config {
            api_key: API_KEY.to_string(),
            rules,
            tick_millis: TICK_MILLIS,
            ..Config::default()
        };
        let orchestrator = build_orchestrator(
            db.clone(),
            &config,
            WordSource::Static(WordList::new(words.iter().copied())),
        );

        Self {
            used_words: UsedWordRepository::new(db.clone()),
            db,
            orchestrator,
        }
    }

    pub async fn create_session(&self) -> String {
        self.orchestrator
            .create_session(Some(API_KEY))
            .await
            .expect("Should create session")
    }

    /// Attaches a client and swallows the initial state it is sent.
    pub async fn attach(&self, session_id: &str, role: Role) -> TestClient {
        let (connection_id, receiver) = self
            .orchestrator
            .attach(session_id, role)
            .await
            .expect("Should attach");
        let mut client = TestClient {
            connection_id,
            receiver,
        };
        client.expect_state().await;
        client
    }

    pub async fn snapshot(&self, session_id: &str) -> SessionSnapshot {
        self.orchestrator
            .snapshot(session_id)
            .await
            .expect("Session should exist")
    }

    pub async fn used(&self, session_id: &str) -> Vec<String> {
        self.used_words.list(session_id).await.unwrap()
    }

    pub async fn start(&self, session_id: &str) -> SessionSnapshot {
        self.orchestrator
            .start_game(session_id, Role::Controller)
            .await
            .expect("start_game should succeed");
        let snapshot = self.snapshot(session_id).await;
        assert_eq!(snapshot.state, GameState::Playing);
        snapshot
    }
}

pub struct TestClient {
    pub connection_id: ConnectionId,
    pub receiver: UnboundedReceiver<ServerMessage>,
}

impl TestClient {
    pub async fn next(&mut self) -> ServerMessage {
        tokio::time::timeout(Duration::from_secs(2), self.receiver.recv())
            .await
            .expect("Timed out waiting for a message")
            .expect("Channel closed")
    }

    /// Next message that is not a timer tick.
    pub async fn next_event(&mut self) -> ServerMessage {
        loop {
            match self.next().await {
                ServerMessage::TimerUpdate { .. } => continue,
                other => return other,
            }
        }
    }

    pub async fn expect_state(&mut self) -> SessionSnapshot {
        match self.next_event().await {
            ServerMessage::SessionState { session } => session,
            other => panic!("Expected session_state, got {:?}", other),
        }
    }

    /// Everything already queued, without waiting.
    pub fn drain(&mut self) -> Vec<ServerMessage> {
        let mut messages = Vec::new();
        while let Ok(message) = self.receiver.try_recv() {
            messages.push(message);
        }
        messages
    }

    /// Collects messages until `stop` matches one (included) or the
    /// timeout passes.
    pub async fn collect_until<F>(&mut self, timeout: Duration, stop: F) -> Vec<ServerMessage>
    where
        F: Fn(&ServerMessage) -> bool,
    {
        let mut messages = Vec::new();
        let deadline = tokio::time::Instant::now() + timeout;
        while let Ok(Some(message)) =
            tokio::time::timeout_at(deadline, self.receiver.recv()).await
        {
            let done = stop(&message);
            messages.push(message);
            if done {
                break;
            }
        }
        messages
    }
}

pub fn countdown_values(messages: &[ServerMessage]) -> Vec<u32> {
    messages
        .iter()
        .filter_map(|message| match message {
            ServerMessage::Countdown { seconds } => Some(*seconds),
            _ => None,
        })
        .collect()
}

pub fn timer_values(messages: &[ServerMessage]) -> Vec<u32> {
    messages
        .iter()
        .filter_map(|message| match message {
            ServerMessage::TimerUpdate { timer } => Some(*timer),
            _ => None,
        })
        .collect()
}

pub fn errors(messages: &[ServerMessage]) -> Vec<String> {
    messages
        .iter()
        .filter_map(|message| match message {
            ServerMessage::Error { message } => Some(message.clone()),
            _ => None,
        })
        .collect()
}

pub fn is_paused_state(message: &ServerMessage) -> bool {
    matches!(
        message,
        ServerMessage::SessionState { session } if session.state == GameState::Paused
    )
}
