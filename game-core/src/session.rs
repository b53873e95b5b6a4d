use game_types::{GameError, GameState, Role, SessionId, SessionSnapshot, SessionStats, StatType};

use crate::{GameRules, ScoringEngine};

/// Outcome of settling the current word at the end of a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Correct,
    Incorrect,
}

/// Result of one timer tick applied to the session clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerTick {
    /// Clock decremented, round continues.
    Running { remaining: u32 },
    /// Clock reached zero; the session moved to `guessing`.
    Expired,
    /// The session is no longer playing; the timer must stop.
    Halted,
}

/// Authoritative state of one game instance.
///
/// Every method checks its own role and state preconditions and reports
/// whether it changed anything; commands whose preconditions fail leave
/// the session untouched.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: SessionId,
    pub state: GameState,
    pub connected_roles: Vec<Role>,
    pub timer_seconds: u32,
    pub saved_timer_seconds: Option<u32>,
    pub current_word: Option<String>,
    pub pass_count: u32,
    pub stats: SessionStats,
    /// Bumped on every entry into `guessing`; a guess countdown only ends
    /// the guess it was started for.
    pub guess_epoch: u64,
    rules: GameRules,
}

impl Session {
    pub fn new(id: SessionId, rules: GameRules) -> Self {
        Self {
            id,
            state: GameState::Lobby,
            connected_roles: Vec::new(),
            timer_seconds: rules.round_seconds,
            saved_timer_seconds: None,
            current_word: None,
            pass_count: 0,
            stats: SessionStats::default(),
            guess_epoch: 0,
            rules,
        }
    }

    pub fn rules(&self) -> &GameRules {
        &self.rules
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            uuid: self.id.clone(),
            state: self.state,
            connected_clients: self.connected_roles.clone(),
            timer: self.timer_seconds,
            saved_timer: self.saved_timer_seconds,
            stats: self.stats,
            current_word: self.current_word.clone(),
            pass_count: self.pass_count,
            max_passes: self.rules.max_passes,
        }
    }

    pub fn add_role(&mut self, role: Role) -> bool {
        if self.connected_roles.contains(&role) {
            return false;
        }
        self.connected_roles.push(role);
        true
    }

    pub fn remove_role(&mut self, role: Role) -> bool {
        let before = self.connected_roles.len();
        self.connected_roles.retain(|r| *r != role);
        self.connected_roles.len() != before
    }

    pub fn can_start(&self, role: Role) -> bool {
        role.is_controller() && matches!(self.state, GameState::Lobby | GameState::Paused)
    }

    /// Enter `playing` with a freshly drawn word. Callers check
    /// [`Session::can_start`] first.
    pub fn begin_round(&mut self, word: String) {
        self.timer_seconds = match self.saved_timer_seconds.take() {
            Some(saved) if saved > 0 => saved,
            _ if self.timer_seconds > 0 => self.timer_seconds,
            _ => self.rules.round_seconds,
        };
        self.current_word = Some(word);
        self.state = GameState::Playing;
    }

    pub fn stop(&mut self, role: Role) -> bool {
        if !role.is_controller() || self.state != GameState::Playing {
            return false;
        }
        self.state = GameState::Paused;
        true
    }

    pub fn adjust_timer(&mut self, role: Role, delta: i32) -> bool {
        if !role.is_controller() {
            return false;
        }
        self.timer_seconds = if delta >= 0 {
            self.timer_seconds.saturating_add(delta.unsigned_abs())
        } else {
            self.timer_seconds.saturating_sub(delta.unsigned_abs())
        };
        true
    }

    pub fn adjust_stat(&mut self, role: Role, stat: StatType, delta: i32) -> bool {
        if !role.is_controller() {
            return false;
        }
        ScoringEngine::adjust(&mut self.stats, stat, delta, &self.rules);
        true
    }

    /// The word a controller may settle right now, if any.
    pub fn word_to_settle(&self, role: Role) -> Option<&str> {
        if !role.is_controller() || self.state != GameState::Playing {
            return None;
        }
        self.current_word.as_deref()
    }

    /// Record the verdict on the current word and pause, keeping the
    /// remaining time for the next round.
    pub fn settle_word(&mut self, verdict: Verdict) {
        match verdict {
            Verdict::Correct => ScoringEngine::record_correct(&mut self.stats),
            Verdict::Incorrect => ScoringEngine::record_incorrect(&mut self.stats, &self.rules),
        }
        self.saved_timer_seconds = Some(self.timer_seconds);
        self.state = GameState::Paused;
    }

    /// A word giver skips the current word. The word is neither marked
    /// used nor replaced here; the next start draws a new one.
    pub fn pass(&mut self, role: Role) -> Result<bool, GameError> {
        if !role.is_word_giver() || self.state != GameState::Playing {
            return Ok(false);
        }
        if self.pass_count >= self.rules.max_passes {
            return Err(GameError::PassLimitReached {
                limit: self.rules.max_passes,
            });
        }
        self.pass_count += 1;
        self.state = GameState::Paused;
        Ok(true)
    }

    pub fn request_guess(&mut self, role: Role) -> bool {
        if !role.is_word_guesser() || self.state != GameState::Playing {
            return false;
        }
        self.enter_guessing();
        true
    }

    pub fn reset(&mut self, role: Role) -> bool {
        if !role.is_controller() {
            return false;
        }
        self.state = GameState::Lobby;
        self.timer_seconds = self.rules.round_seconds;
        self.saved_timer_seconds = None;
        self.current_word = None;
        self.stats = SessionStats::default();
        self.pass_count = 0;
        true
    }

    pub fn tick(&mut self) -> TimerTick {
        if self.state != GameState::Playing {
            return TimerTick::Halted;
        }
        self.timer_seconds = self.timer_seconds.saturating_sub(1);
        if self.timer_seconds == 0 {
            self.enter_guessing();
            TimerTick::Expired
        } else {
            TimerTick::Running {
                remaining: self.timer_seconds,
            }
        }
    }

    /// End of the guess countdown started at `epoch`. Only a session still
    /// in that same guess moves back to `paused`.
    pub fn finish_guess(&mut self, epoch: u64) -> bool {
        if self.state != GameState::Guessing || self.guess_epoch != epoch {
            return false;
        }
        self.state = GameState::Paused;
        true
    }

    fn enter_guessing(&mut self) {
        self.guess_epoch = self.guess_epoch.wrapping_add(1);
        self.state = GameState::Guessing;
    }
}
