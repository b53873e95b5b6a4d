use game_types::{SessionStats, StatType};

use crate::GameRules;

pub struct ScoringEngine;

impl ScoringEngine {
    /// A word was guessed: one more correct answer, one more point.
    pub fn record_correct(stats: &mut SessionStats) {
        stats.correct = stats.correct.saturating_add(1);
        stats.total_points = stats.total_points.saturating_add(1);
    }

    /// A word was missed: one more incorrect answer, one point less.
    pub fn record_incorrect(stats: &mut SessionStats, rules: &GameRules) {
        stats.incorrect = stats.incorrect.saturating_add(1);
        stats.total_points = Self::floor_points(stats.total_points.saturating_sub(1), rules);
    }

    /// Manual correction from the controller. `correct` and `incorrect`
    /// are floored at zero; `total_points` follows the rules' floor policy.
    pub fn adjust(stats: &mut SessionStats, stat: StatType, delta: i32, rules: &GameRules) {
        match stat {
            StatType::Correct => {
                stats.correct = stats.correct.saturating_add(delta).max(0);
            }
            StatType::Incorrect => {
                stats.incorrect = stats.incorrect.saturating_add(delta).max(0);
            }
            StatType::TotalPoints => {
                stats.total_points =
                    Self::floor_points(stats.total_points.saturating_add(delta), rules);
            }
        }
    }

    fn floor_points(points: i32, rules: &GameRules) -> i32 {
        if rules.allow_negative_points {
            points
        } else {
            points.max(0)
        }
    }
}
