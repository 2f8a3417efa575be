//! Protocol constants. All token amounts in base units (1 GLQ = 10^18 units).

/// Base units per whole GLQ token.
pub const COIN: u128 = 1_000_000_000_000_000_000;

/// Basis-point denominator used for APY rates (10_000 = 100%).
pub const BPS_PRECISION: u64 = 10_000;

/// Fixed-point scale for percentage previews: `PERCENT_PRECISION` == 1%.
pub const PERCENT_PRECISION: u128 = 1_000_000_000_000_000_000;

/// Length of the accrual year in seconds (365 days).
pub const SECONDS_PER_YEAR: u64 = 365 * 24 * 60 * 60;

/// Share of the population ranked into tier 1, in percent.
pub const TIER1_PERCENT: u64 = 15;

/// Share of the population ranked into tier 2, in percent.
pub const TIER2_PERCENT: u64 = 40;

/// Denominator for the tier percentages.
pub const TIER_PERCENT_DENOMINATOR: u64 = 100;

/// Default tier 1 APY: 15%.
pub const DEFAULT_TIER1_APY_BPS: u64 = 1_500;

/// Default tier 2 APY: 7.5%.
pub const DEFAULT_TIER2_APY_BPS: u64 = 750;

/// Default tier 3 APY: 5%.
pub const DEFAULT_TIER3_APY_BPS: u64 = 500;

/// Target number of tier 1 members for a population of `total`.
///
/// # Examples
///
/// ```
/// use glq_core::constants::tier1_target;
/// assert_eq!(tier1_target(25), 3);
/// assert_eq!(tier1_target(124), 18);
/// ```
pub const fn tier1_target(total: u64) -> u64 {
    total * TIER1_PERCENT / TIER_PERCENT_DENOMINATOR
}

/// Target number of tier 2 members for a population of `total`.
///
/// # Examples
///
/// ```
/// use glq_core::constants::tier2_target;
/// assert_eq!(tier2_target(25), 10);
/// assert_eq!(tier2_target(124), 49);
/// ```
pub const fn tier2_target(total: u64) -> u64 {
    total * TIER2_PERCENT / TIER_PERCENT_DENOMINATOR
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn coin_has_18_decimals() {
        assert_eq!(COIN, 10u128.pow(18));
    }

    #[test]
    fn year_is_365_days() {
        assert_eq!(SECONDS_PER_YEAR, 31_536_000);
    }

    #[test]
    fn tier_shares_leave_remainder_for_tier3() {
        assert!(TIER1_PERCENT + TIER2_PERCENT < TIER_PERCENT_DENOMINATOR);
    }

    #[test]
    fn small_populations_are_all_tier3() {
        for n in 0..=2 {
            assert_eq!(tier1_target(n), 0);
            assert_eq!(tier2_target(n), 0);
        }
        assert_eq!(tier2_target(3), 1);
        assert_eq!(tier1_target(7), 1);
    }

    #[test]
    fn targets_step_by_at_most_one() {
        for n in 0..10_000u64 {
            assert!(tier1_target(n + 1) - tier1_target(n) <= 1);
            assert!(tier2_target(n + 1) - tier2_target(n) <= 1);
        }
    }

    #[test]
    fn default_apy_ordering() {
        assert!(DEFAULT_TIER1_APY_BPS > DEFAULT_TIER2_APY_BPS);
        assert!(DEFAULT_TIER2_APY_BPS > DEFAULT_TIER3_APY_BPS);
    }

    // --- proptest ---

    proptest! {
        #[test]
        fn targets_are_monotone_and_leave_tier3_largest(n in 0u64..1_000_000_000) {
            let (t1, t2) = (tier1_target(n), tier2_target(n));
            prop_assert!(tier1_target(n + 1) >= t1);
            prop_assert!(tier2_target(n + 1) >= t2);
            prop_assert!(t1 <= t2);
            prop_assert!(t1 + t2 <= n);
            prop_assert!(n - t1 - t2 >= t2);
        }
    }
}
