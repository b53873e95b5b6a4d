use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::{Role, SessionId, SessionSnapshot, StatType};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(tag = "type", rename_all = "snake_case")]
#[ts(export)]
pub enum ClientMessage {
    Connect { client_type: Role },
    Ping,
    GetState,
    TestConnection,
    StartGame,
    StopGame,
    AdjustTimer { seconds: i32 },
    AdjustStats { stat_type: StatType, delta: i32 },
    MarkWordCorrect,
    MarkWordIncorrect,
    PassWord,
    RequestGuess,
    ResetGame,
    /// Any `type` this server does not know; silently ignored.
    #[serde(other)]
    #[ts(skip)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(tag = "type", rename_all = "snake_case")]
#[ts(export)]
pub enum ServerMessage {
    Pong,
    SessionState {
        session: SessionSnapshot,
    },
    TestResponse {
        message: String,
        client_type: Role,
        session_uuid: SessionId,
    },
    TimerUpdate {
        timer: u32,
    },
    Countdown {
        seconds: u32,
    },
    PassEvent,
    GuessEvent,
    GameEnded {
        message: String,
    },
    Error {
        message: String,
    },
}

impl ServerMessage {
    pub fn error(message: impl Into<String>) -> Self {
        ServerMessage::Error {
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CreateSessionRequest {
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct JoinSessionRequest {
    pub api_key: Option<String>,
    pub session_code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SessionCreated {
    pub session_uuid: SessionId,
}
