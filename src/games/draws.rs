//! Pseudo-random draw sources
//!
//! Every round is a pure function of the draws it consumes. Swapping the
//! source is how tests replay a round exactly.

use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};

/// Supplies uniform draws in `[0, 1)`
pub trait DrawSource: Send {
    fn next_unit(&mut self) -> f64;

    /// Uniform index in `0..bound`
    fn next_index(&mut self, bound: usize) -> usize {
        debug_assert!(bound > 0);
        let idx = (self.next_unit() * bound as f64).floor() as usize;
        idx.min(bound.saturating_sub(1))
    }
}

impl<D: DrawSource + ?Sized> DrawSource for Box<D> {
    fn next_unit(&mut self) -> f64 {
        (**self).next_unit()
    }
}

/// Draws from any `RngCore`
pub struct RngDraws<R: RngCore + Send> {
    rng: R,
}

impl<R: RngCore + Send> RngDraws<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl RngDraws<StdRng> {
    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }

    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }
}

impl<R: RngCore + Send> DrawSource for RngDraws<R> {
    fn next_unit(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }
}

/// Replays a fixed sequence, cycling when exhausted
#[derive(Debug, Clone)]
pub struct ReplayDraws {
    draws: Vec<f64>,
    cursor: usize,
}

impl ReplayDraws {
    /// Values are clamped into `[0, 1)`; an empty sequence replays `0.0`.
    pub fn new(draws: impl Into<Vec<f64>>) -> Self {
        let draws: Vec<f64> = draws
            .into()
            .into_iter()
            .map(|d| if d.is_finite() { d.clamp(0.0, 1.0 - f64::EPSILON) } else { 0.0 })
            .collect();
        Self { draws, cursor: 0 }
    }

    pub fn consumed(&self) -> usize {
        self.cursor
    }
}

impl DrawSource for ReplayDraws {
    fn next_unit(&mut self) -> f64 {
        if self.draws.is_empty() {
            return 0.0;
        }
        let value = self.draws[self.cursor % self.draws.len()];
        self.cursor += 1;
        value
    }
}

/// Wraps a source and keeps every draw it hands out
pub struct RecordingDraws<D: DrawSource> {
    inner: D,
    recorded: Vec<f64>,
}

impl<D: DrawSource> RecordingDraws<D> {
    pub fn new(inner: D) -> Self {
        Self {
            inner,
            recorded: Vec::new(),
        }
    }

    pub fn recorded(&self) -> &[f64] {
        &self.recorded
    }

    /// Source that reproduces everything drawn so far
    pub fn replay(&self) -> ReplayDraws {
        ReplayDraws::new(self.recorded.clone())
    }
}

impl<D: DrawSource> DrawSource for RecordingDraws<D> {
    fn next_unit(&mut self) -> f64 {
        let value = self.inner.next_unit();
        self.recorded.push(value);
        value
    }
}

/// Choose `k` distinct indices out of `0..n` with a partial Fisher-Yates shuffle.
///
/// Consumes exactly `k` draws.
pub fn choose_distinct(draws: &mut dyn DrawSource, n: usize, k: usize) -> Vec<usize> {
    let k = k.min(n);
    let mut pool: Vec<usize> = (0..n).collect();
    for i in 0..k {
        let j = i + draws.next_index(n - i);
        pool.swap(i, j);
    }
    pool.truncate(k);
    pool
}
