//! Difficulty policy.
//!
//! Each level bundles a conversion ratio between workout minutes and screen
//! minutes, a balance cap, and the balance a fresh ledger starts with.
//!
//! | level   | workout-min per screen-min | max | start |
//! |---------|----------------------------|-----|-------|
//! | easy    | 0.5                        | 240 | 90    |
//! | medium  | 1.0                        | 180 | 60    |
//! | hard    | 2.0                        | 120 | 30    |
//! | extreme | 3.0                        | 60  | 0     |

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DifficultyLevel {
    Easy,
    #[default]
    Medium,
    Hard,
    Extreme,
}

impl DifficultyLevel {
    pub const ALL: [DifficultyLevel; 4] = [
        DifficultyLevel::Easy,
        DifficultyLevel::Medium,
        DifficultyLevel::Hard,
        DifficultyLevel::Extreme,
    ];

    /// Balance cap in screen minutes.
    pub fn max_balance(self) -> u32 {
        match self {
            DifficultyLevel::Easy => 240,
            DifficultyLevel::Medium => 180,
            DifficultyLevel::Hard => 120,
            DifficultyLevel::Extreme => 60,
        }
    }

    /// Balance a ledger starts with when nothing has been persisted yet.
    pub fn starting_balance(self) -> u32 {
        match self {
            DifficultyLevel::Easy => 90,
            DifficultyLevel::Medium => 60,
            DifficultyLevel::Hard => 30,
            DifficultyLevel::Extreme => 0,
        }
    }

    /// Workout minutes required to earn one screen minute.
    pub fn workout_minutes_per_screen_minute(self) -> f64 {
        match self {
            DifficultyLevel::Easy => 0.5,
            DifficultyLevel::Medium => 1.0,
            DifficultyLevel::Hard => 2.0,
            DifficultyLevel::Extreme => 3.0,
        }
    }

    /// Screen minutes earned per workout minute.
    pub fn screen_minutes_per_workout_minute(self) -> f64 {
        1.0 / self.workout_minutes_per_screen_minute()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DifficultyLevel::Easy => "easy",
            DifficultyLevel::Medium => "medium",
            DifficultyLevel::Hard => "hard",
            DifficultyLevel::Extreme => "extreme",
        }
    }

    /// Human-readable name.
    pub fn label(self) -> &'static str {
        match self {
            DifficultyLevel::Easy => "Easy",
            DifficultyLevel::Medium => "Medium",
            DifficultyLevel::Hard => "Hard",
            DifficultyLevel::Extreme => "Extreme",
        }
    }
}

impl fmt::Display for DifficultyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DifficultyLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(DifficultyLevel::Easy),
            "medium" => Ok(DifficultyLevel::Medium),
            "hard" => Ok(DifficultyLevel::Hard),
            "extreme" => Ok(DifficultyLevel::Extreme),
            _ => Err(format!("Unknown difficulty: {}", s)),
        }
    }
}
