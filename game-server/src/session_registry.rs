use dashmap::DashMap;
use regex::Regex;
use std::sync::{Arc, LazyLock};
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use game_core::{GameRules, Session, candidate_session_code, fallback_session_code};
use game_persistence::repositories::SessionRepository;
use game_types::SessionId;

use crate::auth::{AuthError, SharedSecret};

/// One session behind its own lock; every command and timer tick holds it
/// for the duration of the mutation and the resulting broadcasts.
pub type SharedSession = Arc<Mutex<Session>>;

const CODE_ATTEMPTS: usize = 10;

static SESSION_CODE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9-]{1,40}$").ok());

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("API key required")]
    MissingKey,
    #[error("Invalid API key")]
    Unauthorized,
    #[error("Session not found")]
    NotFound,
    #[error("Invalid session code")]
    InvalidCode,
    #[error("Storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

impl From<AuthError> for SessionError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingKey => SessionError::MissingKey,
            AuthError::InvalidKey => SessionError::Unauthorized,
        }
    }
}

pub fn is_valid_session_code(code: &str) -> bool {
    match SESSION_CODE.as_ref() {
        Some(pattern) => pattern.is_match(code),
        None => {
            error!("Session code pattern failed to compile, rejecting every code");
            false
        }
    }
}

/// In-memory map of live sessions, backed by the `sessions` table so a
/// session created before a restart can still be joined.
pub struct SessionRegistry {
    sessions: DashMap<SessionId, SharedSession>,
    repository: SessionRepository,
    secret: SharedSecret,
    rules: GameRules,
}

impl SessionRegistry {
    pub fn new(repository: SessionRepository, secret: SharedSecret, rules: GameRules) -> Self {
        Self {
            sessions: DashMap::new(),
            repository,
            secret,
            rules,
        }
    }

    pub fn rules(&self) -> &GameRules {
        &self.rules
    }

    pub async fn create(&self, secret: Option<&str>) -> Result<SessionId, SessionError> {
        self.secret.verify(secret)?;

        let session_id = self.allocate_code().await?;
        self.repository.create(&session_id).await?;
        self.sessions.insert(
            session_id.clone(),
            Arc::new(Mutex::new(Session::new(session_id.clone(), self.rules))),
        );

        info!("Created session {}", session_id);
        Ok(session_id)
    }

    /// Rehydrates a stored session into `lobby` when it is not in memory.
    /// Game progress is not recovered; the used-words record is.
    pub async fn join(&self, secret: Option<&str>, code: &str) -> Result<SessionId, SessionError> {
        self.secret.verify(secret)?;

        let code = code.trim();
        if !is_valid_session_code(code) {
            warn!("Rejected malformed session code {:?}", code);
            return Err(SessionError::InvalidCode);
        }

        if self.sessions.contains_key(code) {
            return Ok(code.to_string());
        }

        if !self.repository.exists(code).await? {
            return Err(SessionError::NotFound);
        }

        self.sessions.entry(code.to_string()).or_insert_with(|| {
            info!("Rehydrated session {} from storage", code);
            Arc::new(Mutex::new(Session::new(code.to_string(), self.rules)))
        });
        Ok(code.to_string())
    }

    pub fn get(&self, session_id: &str) -> Option<SharedSession> {
        self.sessions
            .get(session_id)
            .map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    async fn allocate_code(&self) -> anyhow::Result<SessionId> {
        for _ in 0..CODE_ATTEMPTS {
            let candidate = candidate_session_code();
            if !self.sessions.contains_key(&candidate) && !self.repository.exists(&candidate).await? {
                return Ok(candidate);
            }
        }

        let fallback = fallback_session_code();
        warn!(
            "No free memorable code after {} attempts, using {}",
            CODE_ATTEMPTS, fallback
        );
        Ok(fallback)
    }
}
