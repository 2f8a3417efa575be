//! Reward engine: tier-dependent linear accrual and the incentive pool.
//!
//! Rates are kept as a schedule of epochs. Changing rates appends an epoch
//! instead of touching positions, and accrual over an interval is integrated
//! piecewise across the epochs it spans, so a rate change only affects
//! time after it. All arithmetic is integer-only with checked `u128` math.

use serde::{Deserialize, Serialize};

use glq_core::constants::{BPS_PRECISION, PERCENT_PRECISION};
use glq_core::error::RewardError;
use glq_core::types::{Amount, ApyRates, Tier, Timestamp};

/// One APY regime, in force from `since` until the next epoch starts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApyEpoch {
    pub since: Timestamp,
    pub rates: ApyRates,
}

/// How a reward payout is split between custody surplus and the incentive pool.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RewardDraw {
    /// Taken from custody tokens that are neither principal nor pooled.
    pub from_surplus: Amount,
    /// Taken from the incentive pool.
    pub from_pool: Amount,
}

/// Full 256-bit product of `a` and `b` as `(high, low)` halves.
fn widening_mul(a: u128, b: u128) -> (u128, u128) {
    const MASK: u128 = u64::MAX as u128;
    let (a1, a0) = (a >> 64, a & MASK);
    let (b1, b0) = (b >> 64, b & MASK);
    let p00 = a0 * b0;
    let p01 = a0 * b1;
    let p10 = a1 * b0;
    let p11 = a1 * b1;
    let mid = (p00 >> 64) + (p01 & MASK) + (p10 & MASK);
    let low = (p00 & MASK) | (mid << 64);
    let high = p11 + (p01 >> 64) + (p10 >> 64) + (mid >> 64);
    (high, low)
}

/// `a * b / d`, floored, exact even when the intermediate product exceeds `u128`.
fn mul_div(a: u128, b: u128, d: u128) -> Result<u128, RewardError> {
    if d == 0 {
        return Err(RewardError::ArithmeticOverflow);
    }
    if let Some(product) = a.checked_mul(b) {
        return Ok(product / d);
    }
    let (high, low) = widening_mul(a, b);
    if high >= d {
        return Err(RewardError::ArithmeticOverflow);
    }
    // Long division of the 256-bit product; `rem < d` holds between steps.
    let mut rem = high;
    let mut quotient: u128 = 0;
    for bit in (0..128).rev() {
        let carry = rem >> 127;
        rem = (rem << 1) | ((low >> bit) & 1);
        quotient <<= 1;
        if carry == 1 || rem >= d {
            rem = rem.wrapping_sub(d);
            quotient |= 1;
        }
    }
    Ok(quotient)
}

/// Reward earned by `principal` at `apy_bps` over `elapsed` seconds.
///
/// `principal * apy_bps * elapsed / (BPS_PRECISION * seconds_per_year)`, floored.
pub fn linear_accrual(
    principal: Amount,
    apy_bps: u64,
    elapsed: u64,
    seconds_per_year: u64,
) -> Result<Amount, RewardError> {
    let rate_time = (apy_bps as u128)
        .checked_mul(elapsed as u128)
        .ok_or(RewardError::ArithmeticOverflow)?;
    let denominator = (BPS_PRECISION as u128)
        .checked_mul(seconds_per_year as u128)
        .ok_or(RewardError::ArithmeticOverflow)?;
    mul_div(principal, rate_time, denominator)
}

/// `reward` as a percentage of `principal`, scaled by [`PERCENT_PRECISION`].
///
/// A zero principal yields zero.
pub fn percent_of(reward: Amount, principal: Amount) -> Result<u128, RewardError> {
    if principal == 0 {
        return Ok(0);
    }
    mul_div(reward, 100 * PERCENT_PRECISION, principal)
}

/// Computes rewards and tracks the admin-funded incentive pool.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardEngine {
    /// Non-empty, `since` non-decreasing.
    schedule: Vec<ApyEpoch>,
    seconds_per_year: u64,
    incentive_pool: Amount,
}

impl RewardEngine {
    pub fn new(rates: ApyRates, genesis: Timestamp, seconds_per_year: u64) -> Self {
        Self {
            schedule: vec![ApyEpoch { since: genesis, rates }],
            seconds_per_year,
            incentive_pool: 0,
        }
    }

    /// Rates in force for new accrual.
    pub fn current_rates(&self) -> ApyRates {
        self.schedule.last().map(|epoch| epoch.rates).unwrap_or_default()
    }

    pub fn schedule(&self) -> &[ApyEpoch] {
        &self.schedule
    }

    pub fn seconds_per_year(&self) -> u64 {
        self.seconds_per_year
    }

    /// Switch to `rates` from `now` on. Accrual before `now` keeps the old rates.
    pub fn set_rates(&mut self, rates: ApyRates, now: Timestamp) {
        match self.schedule.last_mut() {
            Some(last) if now <= last.since => last.rates = rates,
            _ => self.schedule.push(ApyEpoch { since: now, rates }),
        }
    }

    /// Reward accrued by `principal` ranked in `tier` over `[from, to)`.
    ///
    /// Returns zero when `to <= from`. Checkpoints earlier than the first
    /// epoch accrue at the first epoch's rates.
    pub fn accrued_between(
        &self,
        principal: Amount,
        tier: Tier,
        from: Timestamp,
        to: Timestamp,
    ) -> Result<Amount, RewardError> {
        if to <= from || principal == 0 {
            return Ok(0);
        }
        let first = self
            .schedule
            .partition_point(|epoch| epoch.since <= from)
            .saturating_sub(1);

        let mut total: Amount = 0;
        for (i, epoch) in self.schedule.iter().enumerate().skip(first) {
            let start = if i == first { from } else { epoch.since.max(from) };
            let end = self
                .schedule
                .get(i + 1)
                .map_or(to, |next| next.since.min(to));
            if start >= to {
                break;
            }
            if end > start {
                let part = linear_accrual(
                    principal,
                    epoch.rates.for_tier(tier),
                    end - start,
                    self.seconds_per_year,
                )?;
                total = total.checked_add(part).ok_or(RewardError::ArithmeticOverflow)?;
            }
        }
        Ok(total)
    }

    // --- incentive pool ---

    pub fn incentive_pool(&self) -> Amount {
        self.incentive_pool
    }

    /// Pool size after adding `amount`, without committing it.
    pub fn pool_after_add(&self, amount: Amount) -> Result<Amount, RewardError> {
        self.incentive_pool
            .checked_add(amount)
            .ok_or(RewardError::ArithmeticOverflow)
    }

    /// Pool size after removing `amount`, without committing it.
    pub fn pool_after_remove(&self, amount: Amount) -> Result<Amount, RewardError> {
        self.incentive_pool
            .checked_sub(amount)
            .ok_or(RewardError::InsufficientIncentive { have: self.incentive_pool, need: amount })
    }

    /// Commit a pool size previously computed by `pool_after_*`.
    pub fn set_incentive_pool(&mut self, pool: Amount) {
        self.incentive_pool = pool;
    }

    /// Plan a payout of `reward` given the custody balance and staked principal.
    ///
    /// Coverage is `custody_balance - total_staked`; principal owed to other
    /// stakers is never used. Un-pooled surplus is spent before the pool.
    /// Returns `None` when the reward exceeds coverage.
    pub fn plan_draw(
        &self,
        reward: Amount,
        custody_balance: Amount,
        total_staked: Amount,
    ) -> Option<RewardDraw> {
        let coverage = custody_balance.saturating_sub(total_staked);
        if reward > coverage {
            return None;
        }
        let free = coverage.saturating_sub(self.incentive_pool);
        let from_surplus = reward.min(free);
        Some(RewardDraw { from_surplus, from_pool: reward - from_surplus })
    }

    pub fn commit_draw(&mut self, draw: RewardDraw) {
        self.incentive_pool = self.incentive_pool.saturating_sub(draw.from_pool);
    }
}

#[cfg(test)]
mod tests {
    use glq_core::constants::{COIN, SECONDS_PER_YEAR};
    use proptest::prelude::*;

    use super::*;

    fn engine() -> RewardEngine {
        RewardEngine::new(ApyRates::default(), 0, SECONDS_PER_YEAR)
    }

    // --- mul_div ---

    #[test]
    fn mul_div_small_values() {
        assert_eq!(mul_div(7, 6, 4).unwrap(), 10);
        assert_eq!(mul_div(0, u128::MAX, 1).unwrap(), 0);
    }

    #[test]
    fn mul_div_wide_intermediate() {
        assert_eq!(mul_div(u128::MAX, u128::MAX, u128::MAX).unwrap(), u128::MAX);
        assert_eq!(mul_div(1 << 100, 1 << 100, 1 << 90).unwrap(), 1 << 110);
        assert_eq!(mul_div(u128::MAX, 3, 4).unwrap(), u128::MAX / 4 * 3 + 2);
    }

    #[test]
    fn mul_div_rejects_overflowing_quotient() {
        assert_eq!(mul_div(u128::MAX, 2, 1), Err(RewardError::ArithmeticOverflow));
        assert_eq!(mul_div(1, 1, 0), Err(RewardError::ArithmeticOverflow));
    }

    // --- linear accrual ---

    #[test]
    fn one_year_at_five_percent() {
        let reward = linear_accrual(500_000 * COIN, 500, SECONDS_PER_YEAR, SECONDS_PER_YEAR).unwrap();
        assert_eq!(reward, 25_000 * COIN);
    }

    #[test]
    fn half_year_at_fifteen_percent() {
        let reward =
            linear_accrual(1_000 * COIN, 1_500, SECONDS_PER_YEAR / 2, SECONDS_PER_YEAR).unwrap();
        assert_eq!(reward, 75 * COIN);
    }

    #[test]
    fn zero_elapsed_is_zero() {
        assert_eq!(linear_accrual(1_000 * COIN, 1_500, 0, SECONDS_PER_YEAR).unwrap(), 0);
    }

    #[test]
    fn accrual_floors() {
        // 1 unit at 5% for a year is 0.05 units
        assert_eq!(linear_accrual(1, 500, SECONDS_PER_YEAR, SECONDS_PER_YEAR).unwrap(), 0);
        assert_eq!(linear_accrual(20, 500, SECONDS_PER_YEAR, SECONDS_PER_YEAR).unwrap(), 1);
    }

    #[test]
    fn large_principal_does_not_overflow_intermediate() {
        // principal * rate * elapsed exceeds u128 but the result fits
        let principal = u128::MAX / 1_000;
        let reward = linear_accrual(principal, 10_000, SECONDS_PER_YEAR, SECONDS_PER_YEAR).unwrap();
        assert_eq!(reward, principal);
    }

    #[test]
    fn overflowing_result_is_error() {
        let err = linear_accrual(u128::MAX, 20_000, SECONDS_PER_YEAR, SECONDS_PER_YEAR);
        assert_eq!(err, Err(RewardError::ArithmeticOverflow));
    }

    #[test]
    fn zero_year_is_error() {
        assert_eq!(linear_accrual(1, 1, 1, 0), Err(RewardError::ArithmeticOverflow));
    }

    // --- percent ---

    #[test]
    fn percent_of_principal() {
        // 25_000 of 500_000 = 5%
        let pct = percent_of(25_000 * COIN, 500_000 * COIN).unwrap();
        assert_eq!(pct, 5 * PERCENT_PRECISION);
    }

    #[test]
    fn percent_of_zero_principal_is_zero() {
        assert_eq!(percent_of(10, 0).unwrap(), 0);
    }

    // --- schedule ---

    #[test]
    fn accrual_uses_tier_rate() {
        let e = engine();
        let year = SECONDS_PER_YEAR;
        assert_eq!(e.accrued_between(100 * COIN, Tier::One, 0, year).unwrap(), 15 * COIN);
        assert_eq!(e.accrued_between(100 * COIN, Tier::Two, 0, year).unwrap(), 15 * COIN / 2);
        assert_eq!(e.accrued_between(100 * COIN, Tier::Three, 0, year).unwrap(), 5 * COIN);
    }

    #[test]
    fn backwards_interval_is_zero() {
        let e = engine();
        assert_eq!(e.accrued_between(100 * COIN, Tier::One, 50, 10).unwrap(), 0);
    }

    #[test]
    fn rate_change_is_prospective() {
        let mut e = engine();
        let year = SECONDS_PER_YEAR;
        e.set_rates(ApyRates::new(1_500, 750, 1_000), year);
        // first year at 5%, second at 10%
        let reward = e.accrued_between(100 * COIN, Tier::Three, 0, 2 * year).unwrap();
        assert_eq!(reward, 15 * COIN);
        // interval entirely after the change
        let later = e.accrued_between(100 * COIN, Tier::Three, year, 2 * year).unwrap();
        assert_eq!(later, 10 * COIN);
        // interval entirely before the change
        let earlier = e.accrued_between(100 * COIN, Tier::Three, 0, year).unwrap();
        assert_eq!(earlier, 5 * COIN);
    }

    #[test]
    fn spans_several_epochs() {
        let mut e = engine();
        let q = SECONDS_PER_YEAR / 4;
        e.set_rates(ApyRates::new(0, 0, 0), q);
        e.set_rates(ApyRates::new(4_000, 0, 0), 2 * q);
        // quarter at 15%, quarter at 0%, quarter at 40%
        let reward = e.accrued_between(400 * COIN, Tier::One, 0, 3 * q).unwrap();
        assert_eq!(reward, 15 * COIN + 40 * COIN);
    }

    #[test]
    fn same_timestamp_rate_change_replaces_epoch() {
        let mut e = engine();
        e.set_rates(ApyRates::new(1, 1, 1), 100);
        e.set_rates(ApyRates::new(2, 2, 2), 100);
        assert_eq!(e.schedule().len(), 2);
        assert_eq!(e.current_rates(), ApyRates::new(2, 2, 2));
    }

    #[test]
    fn checkpoint_before_genesis_uses_first_rates() {
        let e = RewardEngine::new(ApyRates::default(), 1_000, SECONDS_PER_YEAR);
        let reward = e.accrued_between(100 * COIN, Tier::Three, 0, SECONDS_PER_YEAR).unwrap();
        assert_eq!(reward, 5 * COIN);
    }

    // --- incentive pool ---

    #[test]
    fn pool_add_and_remove() {
        let mut e = engine();
        let pool = e.pool_after_add(100).unwrap();
        e.set_incentive_pool(pool);
        assert_eq!(e.incentive_pool(), 100);
        assert_eq!(
            e.pool_after_remove(101),
            Err(RewardError::InsufficientIncentive { have: 100, need: 101 })
        );
        let pool = e.pool_after_remove(40).unwrap();
        e.set_incentive_pool(pool);
        assert_eq!(e.incentive_pool(), 60);
    }

    #[test]
    fn pool_add_overflow() {
        let mut e = engine();
        e.set_incentive_pool(Amount::MAX);
        assert_eq!(e.pool_after_add(1), Err(RewardError::ArithmeticOverflow));
    }

    #[test]
    fn draw_spends_surplus_before_pool() {
        let mut e = engine();
        e.set_incentive_pool(50);
        // custody 1_080 = 1_000 staked + 50 pool + 30 donated
        let draw = e.plan_draw(40, 1_080, 1_000).unwrap();
        assert_eq!(draw, RewardDraw { from_surplus: 30, from_pool: 10 });
        e.commit_draw(draw);
        assert_eq!(e.incentive_pool(), 40);
    }

    #[test]
    fn draw_never_touches_principal() {
        let mut e = engine();
        e.set_incentive_pool(50);
        assert_eq!(e.plan_draw(51, 1_050, 1_000), None);
        assert!(e.plan_draw(50, 1_050, 1_000).is_some());
    }

    #[test]
    fn zero_reward_draws_nothing() {
        let e = engine();
        assert_eq!(e.plan_draw(0, 10, 10), Some(RewardDraw::default()));
    }

    // --- proptest ---

    proptest! {
        #[test]
        fn mul_div_matches_narrow_math(a in any::<u64>(), b in any::<u64>(), d in 1u64..) {
            let expected = (a as u128 * b as u128) / d as u128;
            prop_assert_eq!(mul_div(a as u128, b as u128, d as u128).unwrap(), expected);
        }

        #[test]
        fn splitting_an_interval_loses_at_most_one_unit(
            principal in 0u128..1_000_000 * COIN,
            bps in 0u64..5_000,
            split in 0u64..SECONDS_PER_YEAR,
        ) {
            let year = SECONDS_PER_YEAR;
            let whole = linear_accrual(principal, bps, year, year).unwrap();
            let parts = linear_accrual(principal, bps, split, year).unwrap()
                + linear_accrual(principal, bps, year - split, year).unwrap();
            prop_assert!(parts <= whole);
            prop_assert!(whole - parts <= 1);
        }
    }
}
