//! Outcome generation for the three game variants
//!
//! Rounds are deterministic functions of their draws. They never touch the
//! chain; the session decides when a round may start and what happens after.

pub mod crash;
pub mod draws;
pub mod mines;
pub mod row_climb;
pub mod types;

pub use crash::{CrashRound, CrashTick};
pub use draws::{DrawSource, RecordingDraws, ReplayDraws, RngDraws};
pub use mines::{MinesRound, Reveal};
pub use row_climb::{Climb, RowClimbRound};
pub use types::*;

use crate::common::GameType;
use crate::errors::GameError;

/// The round a session is currently playing
#[derive(Debug, Clone)]
pub enum ActiveRound {
    Mines(MinesRound),
    Paaji(RowClimbRound),
    Crash(CrashRound),
}

impl ActiveRound {
    /// Deal a fresh round for `setup`
    pub fn deal(setup: GameSetup, draws: &mut dyn DrawSource) -> Result<Self, GameError> {
        Ok(match setup {
            GameSetup::Mines { mine_count } => ActiveRound::Mines(MinesRound::new(mine_count, draws)?),
            GameSetup::Paaji { difficulty } => ActiveRound::Paaji(RowClimbRound::new(difficulty, draws)),
            GameSetup::Crash => ActiveRound::Crash(CrashRound::new(draws)),
        })
    }

    pub fn game_type(&self) -> GameType {
        match self {
            ActiveRound::Mines(_) => GameType::Mines,
            ActiveRound::Paaji(_) => GameType::Paaji,
            ActiveRound::Crash(_) => GameType::Crash,
        }
    }

    pub fn multiplier(&self) -> f64 {
        match self {
            ActiveRound::Mines(round) => round.multiplier(),
            ActiveRound::Paaji(round) => round.multiplier(),
            ActiveRound::Crash(round) => round.multiplier(),
        }
    }

    pub fn state(&self) -> RoundState {
        match self {
            ActiveRound::Mines(round) => round.state(),
            ActiveRound::Paaji(round) => round.state(),
            ActiveRound::Crash(round) => round.state(),
        }
    }

    /// Voluntary stop at the current multiplier
    pub fn cash_out(&mut self) -> Result<Outcome, GameError> {
        match self {
            ActiveRound::Mines(round) => round.cash_out(),
            ActiveRound::Paaji(round) => round.cash_out(),
            ActiveRound::Crash(round) => round.cash_out(),
        }
    }
}
