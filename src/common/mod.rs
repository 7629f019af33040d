//! Common types and unit conversions shared across the crate

pub mod types;
pub mod units;

pub use types::{GameId, GameStatus, GameType};
pub use units::{from_wei, multiplier_to_percent, payout, to_wei, MIN_BET};
