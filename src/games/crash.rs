//! Continuous-curve round ("crash")
//!
//! The crash point is drawn once at round start. The multiplier follows a
//! fixed curve of elapsed time and the round busts when it reaches the crash point.

use super::draws::DrawSource;
use super::types::{Outcome, RoundState};
use crate::errors::GameError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Crash-point bands: (cumulative probability, floor, width)
const CRASH_BANDS: [(f64, f64, f64); 4] = [
    (0.02, 1.0, 0.2),
    (0.42, 1.2, 0.8),
    (0.77, 2.0, 3.0),
    (1.0, 5.0, 2.0),
];

/// Draw a crash point. Consumes two draws: band, then position within the band.
pub fn draw_crash_point(draws: &mut dyn DrawSource) -> f64 {
    let band = draws.next_unit();
    let position = draws.next_unit();
    let (_, floor, width) = CRASH_BANDS
        .iter()
        .copied()
        .find(|(cumulative, _, _)| band < *cumulative)
        .unwrap_or(CRASH_BANDS[CRASH_BANDS.len() - 1]);
    floor + position * width
}

/// Displayed multiplier after `elapsed`: `1 + 0.3t + 0.08t^1.8`
pub fn curve(elapsed: Duration) -> f64 {
    let t = elapsed.as_secs_f64();
    1.0 + 0.3 * t + 0.08 * t.powf(1.8)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum CrashTick {
    Running { multiplier: f64 },
    Crashed { crash_point: f64, outcome: Outcome },
}

#[derive(Debug, Clone)]
pub struct CrashRound {
    crash_point: f64,
    elapsed: Duration,
    multiplier: f64,
    state: RoundState,
}

impl CrashRound {
    pub fn new(draws: &mut dyn DrawSource) -> Self {
        Self::with_crash_point(draw_crash_point(draws))
    }

    pub fn with_crash_point(crash_point: f64) -> Self {
        Self {
            crash_point,
            elapsed: Duration::ZERO,
            multiplier: 1.0,
            state: RoundState::Live,
        }
    }

    /// Advance the clock to `elapsed` since round start. Time never runs backwards.
    pub fn tick(&mut self, elapsed: Duration) -> Result<CrashTick, GameError> {
        if self.state.is_over() {
            return Err(GameError::RoundOver);
        }
        self.elapsed = self.elapsed.max(elapsed);

        let multiplier = curve(self.elapsed);
        if multiplier >= self.crash_point {
            self.multiplier = self.crash_point;
            self.state = RoundState::Busted;
            return Ok(CrashTick::Crashed {
                crash_point: self.crash_point,
                outcome: Outcome::loss(),
            });
        }

        self.multiplier = multiplier;
        Ok(CrashTick::Running { multiplier })
    }

    /// Cash out at the multiplier of the last tick
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

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn state(&self) -> RoundState {
        self.state
    }

    /// Revealed once the round is over
    pub fn crash_point(&self) -> Option<f64> {
        self.state.is_over().then_some(self.crash_point)
    }
}
