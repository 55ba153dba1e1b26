//! Stake amount sampling and share rounding, in steps of 0.0001 of the
//! native token

use crate::config::AmountRange;
use crate::error::LogicError;

use ethers::types::U256;
use rand::Rng;

/// Smallest amount step: 10^14 wei, i.e. 4 decimals
pub const STEP_WEI: u64 = 100_000_000_000_000;
const STEPS_PER_TOKEN: f64 = 10_000.0;

/// Uniform sample from `range`, rounded to 4 decimals and kept inside it
pub fn sample_amount<R: Rng + ?Sized>(range: &AmountRange, rng: &mut R) -> U256 {
    // tolerance for binary representation of decimal bounds
    let lo = (range.min * STEPS_PER_TOKEN - 1e-6).ceil() as u64;
    let hi = ((range.max * STEPS_PER_TOKEN + 1e-6).floor() as u64).max(lo);

    let sampled = if range.max > range.min {
        rng.gen_range(range.min..=range.max)
    } else {
        range.min
    };
    let units = ((sampled * STEPS_PER_TOKEN).round() as u64).clamp(lo, hi);

    U256::from(units) * U256::from(STEP_WEI)
}

/// Shares to unstake out of `balance`: everything, or `percent` of it,
/// floored to a whole step and never below one step
pub fn unstake_shares(balance: U256, percent: u32, all: bool) -> Result<U256, LogicError> {
    let step = U256::from(STEP_WEI);
    if balance < step {
        return Err(LogicError::NothingToUnstake(format!(
            "share balance {} wei is below the minimum step",
            balance
        )));
    }

    let wanted = if all {
        balance
    } else {
        balance * U256::from(percent.min(100)) / U256::from(100)
    };

    Ok((wanted / step * step).max(step))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn wei(tokens_times_10k: u64) -> U256 {
        U256::from(tokens_times_10k) * U256::from(STEP_WEI)
    }

    #[test]
    fn test_samples_stay_in_range_with_four_decimals() {
        let range = AmountRange { min: 0.01, max: 0.05 };
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..500 {
            let amount = sample_amount(&range, &mut rng);
            assert!(amount >= wei(100) && amount <= wei(500));
            assert!((amount % U256::from(STEP_WEI)).is_zero());
        }
    }

    #[test]
    fn test_degenerate_range() {
        let range = AmountRange { min: 0.02, max: 0.02 };
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(sample_amount(&range, &mut rng), wei(200));
    }

    #[test]
    fn test_unstake_share_rounding() {
        // 1.23456789 tokens
        let balance = U256::from(1_234_567_890_000_000_000u64);

        assert_eq!(unstake_shares(balance, 100, true).unwrap(), wei(12_345));
        assert_eq!(unstake_shares(balance, 50, false).unwrap(), wei(6_172));
        // below one step after applying the percentage: one step
        assert_eq!(unstake_shares(wei(3), 10, false).unwrap(), wei(1));
    }

    #[test]
    fn test_dust_balance_is_nothing_to_unstake() {
        let err = unstake_shares(U256::from(99_999_999_999_999u64), 100, true).unwrap_err();
        assert!(matches!(err, LogicError::NothingToUnstake(_)));
        assert!(unstake_shares(U256::zero(), 100, true).is_err());
    }
}
