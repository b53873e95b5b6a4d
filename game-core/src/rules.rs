/// Tunables consumed by the session state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameRules {
    pub round_seconds: u32,
    pub max_passes: u32,
    pub guess_countdown_seconds: u32,
    /// When false, `total_points` never drops below zero, whichever
    /// command lowers it.
    pub allow_negative_points: bool,
}

impl Default for GameRules {
    fn default() -> Self {
        Self {
            round_seconds: 60,
            max_passes: 3,
            guess_countdown_seconds: 5,
            allow_negative_points: false,
        }
    }
}
