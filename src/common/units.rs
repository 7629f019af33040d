//! Native-value and multiplier conversions
//!
//! Bet amounts travel as decimal native units in the UI and as wei on chain.
//! Multipliers travel as floats off chain and as integer percentages on chain.

use ethers::types::U256;
use ethers::utils::{format_ether, parse_ether};

/// Minimum stake in native units
pub const MIN_BET: f64 = 0.01;

/// Convert a decimal native amount into wei. `None` for negative, NaN or unparsable input.
pub fn to_wei(amount: f64) -> Option<U256> {
    if !amount.is_finite() || amount < 0.0 {
        return None;
    }
    parse_ether(amount).ok()
}

/// Convert wei into a decimal native amount for display.
pub fn from_wei(value: U256) -> f64 {
    format_ether(value).parse().unwrap_or(0.0)
}

/// `round(multiplier * 100)`; 150 means 1.5x. `None` for non-finite or non-positive input.
pub fn multiplier_to_percent(multiplier: f64) -> Option<u64> {
    if !multiplier.is_finite() || multiplier <= 0.0 {
        return None;
    }
    Some((multiplier * 100.0).round() as u64)
}

/// Winnings credited for a won game: `amount * percent / 100`
pub fn payout(amount: U256, multiplier_percent: u64) -> U256 {
    amount * U256::from(multiplier_percent) / U256::from(100u64)
}

/// Saturating narrowing used when decoding counters from ABI words
pub fn to_u64(value: U256) -> u64 {
    if value > U256::from(u64::MAX) {
        u64::MAX
    } else {
        value.as_u64()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wei_conversion() {
        assert_eq!(to_wei(0.10), Some(U256::from(100_000_000_000_000_000u64)));
        assert_eq!(to_wei(1.0), Some(U256::exp10(18)));
        assert_eq!(to_wei(-1.0), None);
        assert_eq!(to_wei(f64::NAN), None);
        assert!((from_wei(U256::from(150_000_000_000_000_000u64)) - 0.15).abs() < 1e-12);
    }

    #[test]
    fn test_multiplier_percent_rounding() {
        assert_eq!(multiplier_to_percent(1.0), Some(100));
        assert_eq!(multiplier_to_percent(1.520875), Some(152));
        assert_eq!(multiplier_to_percent(2.345), Some(235));
        assert_eq!(multiplier_to_percent(0.0), None);
        assert_eq!(multiplier_to_percent(f64::INFINITY), None);
    }

    #[test]
    fn test_payout() {
        let stake = U256::from(100_000_000_000_000_000u64);
        assert_eq!(payout(stake, 152), U256::from(152_000_000_000_000_000u64));
        assert_eq!(payout(stake, 100), stake);
    }
}
