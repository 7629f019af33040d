use crate::common::{multiplier_to_percent, GameType};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Final result of a round, consumed once by resolution
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Outcome {
    pub did_win: bool,
    pub multiplier: f64,
}

impl Outcome {
    /// A loss always reports 1.0x
    pub fn loss() -> Self {
        Self {
            did_win: false,
            multiplier: 1.0,
        }
    }

    pub fn win(multiplier: f64) -> Self {
        Self {
            did_win: true,
            multiplier,
        }
    }

    pub fn multiplier_percent(&self) -> u64 {
        multiplier_to_percent(self.multiplier).unwrap_or(100)
    }
}

/// Row-climb difficulty
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Hard,
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Difficulty::Easy => write!(f, "easy"),
            Difficulty::Hard => write!(f, "hard"),
        }
    }
}

/// Parameters chosen before the bet is placed
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "game", rename_all = "lowercase")]
pub enum GameSetup {
    Mines { mine_count: u8 },
    Paaji { difficulty: Difficulty },
    Crash,
}

impl GameSetup {
    pub fn game_type(&self) -> GameType {
        match self {
            GameSetup::Mines { .. } => GameType::Mines,
            GameSetup::Paaji { .. } => GameType::Paaji,
            GameSetup::Crash => GameType::Crash,
        }
    }
}

/// Lifecycle of a single round
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RoundState {
    Live,
    Busted,
    CashedOut,
    /// Reached the end of the board without busting
    Completed,
}

impl RoundState {
    pub fn is_over(&self) -> bool {
        !matches!(self, RoundState::Live)
    }
}
