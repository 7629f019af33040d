//! Row-climb round ("paaji")
//!
//! Eight rows climbed bottom to top. Each row hides its safe cells
//! independently; one pick per row.

use super::draws::{choose_distinct, DrawSource};
use super::types::{Difficulty, Outcome, RoundState};
use crate::errors::GameError;
use serde::{Deserialize, Serialize};

pub const ROWS: usize = 8;

pub const EASY_MULTIPLIERS: [f64; ROWS] = [1.12, 1.36, 1.65, 1.95, 2.0, 2.4, 2.6, 3.0];
pub const HARD_MULTIPLIERS: [f64; ROWS] = [1.25, 1.56, 1.95, 2.2, 2.8, 3.5, 4.3, 5.0];

impl Difficulty {
    pub fn columns(&self) -> usize {
        match self {
            Difficulty::Easy => 4,
            Difficulty::Hard => 5,
        }
    }

    pub fn safe_per_row(&self) -> usize {
        match self {
            Difficulty::Easy => 2,
            Difficulty::Hard => 1,
        }
    }

    pub fn multipliers(&self) -> &'static [f64; ROWS] {
        match self {
            Difficulty::Easy => &EASY_MULTIPLIERS,
            Difficulty::Hard => &HARD_MULTIPLIERS,
        }
    }
}

/// Multiplier after clearing step `step` (0-indexed), clamped to the last row
pub fn step_multiplier(difficulty: Difficulty, step: usize) -> f64 {
    let table = difficulty.multipliers();
    table[step.min(ROWS - 1)]
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum Climb {
    Safe { row: usize, multiplier: f64 },
    Busted { row: usize, outcome: Outcome },
    /// Cleared the final row
    Summit { outcome: Outcome },
}

#[derive(Debug, Clone)]
pub struct RowClimbRound {
    difficulty: Difficulty,
    safe: Vec<Vec<usize>>,
    picks: Vec<usize>,
    state: RoundState,
}

impl RowClimbRound {
    pub fn new(difficulty: Difficulty, draws: &mut dyn DrawSource) -> Self {
        let safe = (0..ROWS)
            .map(|_| choose_distinct(&mut *draws, difficulty.columns(), difficulty.safe_per_row()))
            .collect();
        Self::with_layout(difficulty, safe)
    }

    /// Round over a fixed layout; `safe[row]` lists that row's safe columns
    pub fn with_layout(difficulty: Difficulty, safe: Vec<Vec<usize>>) -> Self {
        Self {
            difficulty,
            safe,
            picks: Vec::with_capacity(ROWS),
            state: RoundState::Live,
        }
    }

    /// Pick `column` on the current row
    pub fn climb(&mut self, column: usize) -> Result<Climb, GameError> {
        if self.state.is_over() {
            return Err(GameError::RoundOver);
        }
        let columns = self.difficulty.columns();
        if column >= columns {
            return Err(GameError::CellOutOfRange {
                cell: column,
                max: columns - 1,
            });
        }

        let row = self.picks.len();
        self.picks.push(column);

        let is_safe = self.safe.get(row).map_or(false, |cells| cells.contains(&column));
        if !is_safe {
            self.state = RoundState::Busted;
            return Ok(Climb::Busted {
                row,
                outcome: Outcome::loss(),
            });
        }

        let multiplier = step_multiplier(self.difficulty, row);
        if row + 1 == ROWS {
            self.state = RoundState::Completed;
            return Ok(Climb::Summit {
                outcome: Outcome::win(multiplier),
            });
        }
        Ok(Climb::Safe { row, multiplier })
    }

    /// Stop climbing and keep the current multiplier
    pub fn cash_out(&mut self) -> Result<Outcome, GameError> {
        if self.state.is_over() {
            return Err(GameError::RoundOver);
        }
        self.state = RoundState::CashedOut;
        Ok(Outcome::win(self.multiplier()))
    }

    /// 1.0 before the first cleared row
    pub fn multiplier(&self) -> f64 {
        match self.rows_cleared() {
            0 => 1.0,
            cleared => step_multiplier(self.difficulty, cleared - 1),
        }
    }

    pub fn rows_cleared(&self) -> usize {
        match self.state {
            RoundState::Busted => self.picks.len().saturating_sub(1),
            _ => self.picks.len(),
        }
    }

    pub fn current_row(&self) -> usize {
        self.picks.len()
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    pub fn state(&self) -> RoundState {
        self.state
    }

    /// Safe columns of every row, only once the round is over
    pub fn layout(&self) -> Option<&[Vec<usize>]> {
        self.state.is_over().then_some(self.safe.as_slice())
    }
}
