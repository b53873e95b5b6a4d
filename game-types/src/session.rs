use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

pub type SessionId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum GameState {
    Lobby,
    Playing,
    Paused,
    Guessing,
}

impl fmt::Display for GameState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GameState::Lobby => "lobby",
            GameState::Playing => "playing",
            GameState::Paused => "paused",
            GameState::Guessing => "guessing",
        };
        f.write_str(name)
    }
}

/// Functional identity of a connected client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum Role {
    #[serde(rename = "controller")]
    Controller,
    #[serde(rename = "word_giver_1")]
    WordGiver1,
    #[serde(rename = "word_giver_2")]
    WordGiver2,
    #[serde(rename = "word_guesser")]
    WordGuesser,
    /// Read-only display client (stream overlay).
    #[serde(rename = "overlay")]
    Overlay,
}

impl Role {
    pub fn is_controller(&self) -> bool {
        matches!(self, Role::Controller)
    }

    pub fn is_word_giver(&self) -> bool {
        matches!(self, Role::WordGiver1 | Role::WordGiver2)
    }

    pub fn is_word_guesser(&self) -> bool {
        matches!(self, Role::WordGuesser)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Controller => "controller",
            Role::WordGiver1 => "word_giver_1",
            Role::WordGiver2 => "word_giver_2",
            Role::WordGuesser => "word_guesser",
            Role::Overlay => "overlay",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SessionStats {
    pub correct: i32,
    pub incorrect: i32,
    pub total_points: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum StatType {
    Correct,
    Incorrect,
    TotalPoints,
}

/// Full session view sent to clients in `session_state` envelopes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SessionSnapshot {
    pub uuid: SessionId,
    pub state: GameState,
    pub connected_clients: Vec<Role>,
    pub timer: u32,
    pub saved_timer: Option<u32>,
    pub stats: SessionStats,
    pub current_word: Option<String>,
    pub pass_count: u32,
    pub max_passes: u32,
}
