use serde::{Deserialize, Serialize};
use ts_rs::TS;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, thiserror::Error)]
#[ts(export)]
pub enum GameError {
    #[error("Invalid API key")]
    Unauthorized,
    #[error("Session not found")]
    SessionNotFound,
    #[error("Protocol error: {reason}")]
    ProtocolError { reason: String },
    #[error("No more words available")]
    WordsExhausted,
    #[error("Pass limit reached ({limit} passes per game)")]
    PassLimitReached { limit: u32 },
    #[error("Storage error: {message}")]
    Storage { message: String },
}

impl GameError {
    pub fn protocol(reason: impl Into<String>) -> Self {
        GameError::ProtocolError {
            reason: reason.into(),
        }
    }
}
