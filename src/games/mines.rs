//! Grid-reveal round ("mines")
//!
//! 25 cells, `m` mines. Each safe reveal multiplies the running multiplier by
//! a factor looked up from the mine count.

use super::draws::{choose_distinct, DrawSource};
use super::types::{Outcome, RoundState};
use crate::errors::GameError;
use serde::{Deserialize, Serialize};

pub const GRID_SIZE: usize = 25;
pub const MIN_MINES: u8 = 1;
pub const MAX_MINES: u8 = 24;

/// Per-reveal factors for 3..=21 mines
const REVEAL_FACTORS: [(u8, f64); 19] = [
    (3, 1.15),
    (4, 1.25),
    (5, 1.35),
    (6, 1.45),
    (7, 1.55),
    (8, 1.65),
    (9, 1.75),
    (10, 1.85),
    (11, 2.0),
    (12, 2.2),
    (13, 2.4),
    (14, 2.6),
    (15, 2.8),
    (16, 3.0),
    (17, 3.25),
    (18, 3.5),
    (19, 3.75),
    (20, 4.0),
    (21, 4.5),
];

/// Factor applied per safe reveal, clamped to the nearest tabulated mine count
pub fn reveal_factor(mine_count: u8) -> f64 {
    let first = REVEAL_FACTORS[0];
    let last = REVEAL_FACTORS[REVEAL_FACTORS.len() - 1];
    let clamped = mine_count.clamp(first.0, last.0);
    REVEAL_FACTORS
        .iter()
        .find(|(count, _)| *count == clamped)
        .map(|(_, factor)| *factor)
        .unwrap_or(first.1)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum Reveal {
    Gem { multiplier: f64, safe_reveals: usize },
    Mine { outcome: Outcome },
    /// Every safe cell uncovered
    Cleared { outcome: Outcome },
}

#[derive(Debug, Clone)]
pub struct MinesRound {
    mines: [bool; GRID_SIZE],
    revealed: [bool; GRID_SIZE],
    mine_count: u8,
    safe_reveals: usize,
    multiplier: f64,
    state: RoundState,
}

impl MinesRound {
    /// Place `mine_count` mines uniformly at random.
    pub fn new(mine_count: u8, draws: &mut dyn DrawSource) -> Result<Self, GameError> {
        if !(MIN_MINES..=MAX_MINES).contains(&mine_count) {
            return Err(GameError::InvalidMineCount(mine_count));
        }
        let mut mines = [false; GRID_SIZE];
        for cell in choose_distinct(draws, GRID_SIZE, mine_count as usize) {
            mines[cell] = true;
        }
        Ok(Self::with_layout(mines))
    }

    /// Round over a fixed layout
    pub fn with_layout(mines: [bool; GRID_SIZE]) -> Self {
        let mine_count = mines.iter().filter(|m| **m).count() as u8;
        Self {
            mines,
            revealed: [false; GRID_SIZE],
            mine_count,
            safe_reveals: 0,
            multiplier: 1.0,
            state: RoundState::Live,
        }
    }

    pub fn reveal(&mut self, cell: usize) -> Result<Reveal, GameError> {
        if self.state.is_over() {
            return Err(GameError::RoundOver);
        }
        if cell >= GRID_SIZE {
            return Err(GameError::CellOutOfRange {
                cell,
                max: GRID_SIZE - 1,
            });
        }
        if self.revealed[cell] {
            return Err(GameError::AlreadyRevealed(cell));
        }
        self.revealed[cell] = true;

        if self.mines[cell] {
            self.state = RoundState::Busted;
            return Ok(Reveal::Mine {
                outcome: Outcome::loss(),
            });
        }

        self.safe_reveals += 1;
        self.multiplier *= reveal_factor(self.mine_count);

        if self.safe_reveals == GRID_SIZE - self.mine_count as usize {
            self.state = RoundState::Completed;
            return Ok(Reveal::Cleared {
                outcome: Outcome::win(self.multiplier),
            });
        }

        Ok(Reveal::Gem {
            multiplier: self.multiplier,
            safe_reveals: self.safe_reveals,
        })
    }

    pub fn cash_out(&mut self) -> Result<Outcome, GameError> {
        if self.state.is_over() {
            return Err(GameError::RoundOver);
        }
        self.state = RoundState::CashedOut;
        Ok(Outcome::win(self.multiplier))
    }

    pub fn multiplier(&self) -> f64 {
        self.multiplier
    }

    pub fn mine_count(&self) -> u8 {
        self.mine_count
    }

    pub fn safe_reveals(&self) -> usize {
        self.safe_reveals
    }

    pub fn state(&self) -> RoundState {
        self.state
    }

    /// Mine positions, only once the round is over
    pub fn mine_cells(&self) -> Option<Vec<usize>> {
        if !self.state.is_over() {
            return None;
        }
        Some((0..GRID_SIZE).filter(|&c| self.mines[c]).collect())
    }

    pub fn safe_cells(&self) -> impl Iterator<Item = usize> + '_ {
        (0..GRID_SIZE).filter(move |&c| !self.mines[c])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::draws::{ReplayDraws, RngDraws};

    fn layout(mine_cells: &[usize]) -> [bool; GRID_SIZE] {
        let mut mines = [false; GRID_SIZE];
        for &c in mine_cells {
            mines[c] = true;
        }
        mines
    }

    #[test]
    fn test_reveal_factor_clamps() {
        assert_eq!(reveal_factor(1), 1.15);
        assert_eq!(reveal_factor(3), 1.15);
        assert_eq!(reveal_factor(12), 2.2);
        assert_eq!(reveal_factor(21), 4.5);
        assert_eq!(reveal_factor(24), 4.5);
    }

    #[test]
    fn test_three_gems_then_cash_out() {
        let mut round = MinesRound::with_layout(layout(&[0, 1, 2]));
        for cell in [10, 11, 12] {
            assert!(matches!(round.reveal(cell).unwrap(), Reveal::Gem { .. }));
        }
        let outcome = round.cash_out().unwrap();
        assert!(outcome.did_win);
        assert!((outcome.multiplier - 1.520875).abs() < 1e-9);
        assert_eq!(outcome.multiplier_percent(), 152);
        assert_eq!(round.cash_out(), Err(GameError::RoundOver));
    }

    #[test]
    fn test_mine_hit_is_a_loss() {
        let mut round = MinesRound::with_layout(layout(&[7, 8, 9]));
        round.reveal(0).unwrap();
        match round.reveal(8).unwrap() {
            Reveal::Mine { outcome } => assert_eq!(outcome, Outcome::loss()),
            other => panic!("expected mine, got {:?}", other),
        }
        assert_eq!(round.mine_cells(), Some(vec![7, 8, 9]));
        assert_eq!(round.reveal(1), Err(GameError::RoundOver));
    }

    #[test]
    fn test_invalid_moves() {
        let mut round = MinesRound::with_layout(layout(&[0]));
        assert_eq!(
            round.reveal(25),
            Err(GameError::CellOutOfRange { cell: 25, max: 24 })
        );
        round.reveal(3).unwrap();
        assert_eq!(round.reveal(3), Err(GameError::AlreadyRevealed(3)));
        assert!(round.mine_cells().is_none());

        let mut draws = ReplayDraws::new(vec![0.5]);
        assert_eq!(
            MinesRound::new(0, &mut draws).unwrap_err(),
            GameError::InvalidMineCount(0)
        );
        assert!(MinesRound::new(25, &mut draws).is_err());
    }

    #[test]
    fn test_clearing_the_board_wins() {
        let mines: Vec<usize> = (1..GRID_SIZE).collect();
        let mut round = MinesRound::with_layout(layout(&mines));
        match round.reveal(0).unwrap() {
            Reveal::Cleared { outcome } => {
                assert!(outcome.did_win);
                assert_eq!(outcome.multiplier, 4.5);
            }
            other => panic!("expected cleared board, got {:?}", other),
        }
    }

    #[test]
    fn test_same_draws_same_layout() {
        let a = MinesRound::new(5, &mut RngDraws::seeded(42)).unwrap();
        let b = MinesRound::new(5, &mut RngDraws::seeded(42)).unwrap();
        assert_eq!(a.mines, b.mines);
        assert_eq!(a.mine_count(), 5);

        let mut replay = ReplayDraws::new(vec![0.1, 0.6, 0.3]);
        let c = MinesRound::new(3, &mut replay).unwrap();
        assert_eq!(replay.consumed(), 3);
        assert_eq!(c.safe_cells().count(), GRID_SIZE - 3);
    }
}
