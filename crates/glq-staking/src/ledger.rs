//! Staking ledger: positions, principal accounting and reward payouts.
//!
//! [`StakingLedger`] wraps a [`TierCompute`] ranking and a [`RewardEngine`]
//! around an [`ExternalToken`]. Every mutating operation validates all of
//! its preconditions before touching state, so an `Err` leaves the ledger
//! and the token exactly as they were.
//!
//! Reward accrued at a tier is checkpointed into the position whenever the
//! member's tier changes, so a promotion or demotion only affects accrual
//! from that moment on.

use std::collections::{BTreeMap, HashMap, VecDeque};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use glq_core::token::MemoryToken;
use glq_core::traits::ExternalToken;
use glq_core::types::{Address, Amount, ApyRates, CallContext, MemberId, Tier, Timestamp};
use glq_tiers::{RankingState, TierChange, TierCompute};

use crate::config::LedgerConfig;
use crate::error::{ConfigError, StakingError};
use crate::events::StakingEvent;
use crate::reward::{percent_of, RewardDraw, RewardEngine};

/// Events held between drains; the oldest are dropped beyond this.
pub const MAX_PENDING_EVENTS: usize = 10_000;

/// A staker's open position.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    /// Ranking id issued on the first deposit.
    pub id: MemberId,
    pub principal: Amount,
    /// Time up to which reward has been folded into `accrued`.
    pub checkpoint: Timestamp,
    /// Reward earned before `checkpoint` and not yet paid.
    pub accrued: Amount,
}

/// Persisted ledger layout, ordered for deterministic comparison.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub ranking: RankingState,
    pub total_tier3: u64,
    pub total_staked: Amount,
    pub incentive_pool_balance: Amount,
    pub emergency_withdraw_enabled: bool,
    pub apy: ApyRates,
    pub custody_balance: Amount,
    pub positions: BTreeMap<Address, Position>,
}

/// Tenure-tiered staking ledger over token `T`.
#[derive(Clone, Debug)]
pub struct StakingLedger<T = MemoryToken> {
    config: LedgerConfig,
    token: T,
    tiers: TierCompute,
    rewards: RewardEngine,
    positions: HashMap<Address, Position>,
    stakers: HashMap<MemberId, Address>,
    total_staked: Amount,
    emergency_withdraw_enabled: bool,
    events: VecDeque<StakingEvent>,
}

impl<T: ExternalToken> StakingLedger<T> {
    /// Create an empty ledger holding custody on `token`.
    pub fn new(config: LedgerConfig, token: T) -> Result<Self, ConfigError> {
        config.validate()?;
        let rewards = RewardEngine::new(config.apy, config.genesis, config.seconds_per_year);
        Ok(Self {
            emergency_withdraw_enabled: config.emergency_withdraw_enabled,
            config,
            token,
            tiers: TierCompute::new(),
            rewards,
            positions: HashMap::new(),
            stakers: HashMap::new(),
            total_staked: 0,
            events: VecDeque::new(),
        })
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn token(&self) -> &T {
        &self.token
    }

    /// Direct access to the token for balance movements outside the ledger.
    pub fn token_mut(&mut self) -> &mut T {
        &mut self.token
    }

    pub fn tiers(&self) -> &TierCompute {
        &self.tiers
    }

    pub fn rewards(&self) -> &RewardEngine {
        &self.rewards
    }

    // --- staker operations ---

    /// Stake `amount` from the caller, opening a position on first deposit.
    ///
    /// Tokens move from the caller to custody via `transfer_from`, so the
    /// caller must have approved the custody account. Returns the position's
    /// member id.
    pub fn deposit(&mut self, ctx: CallContext, amount: Amount) -> Result<MemberId, StakingError> {
        if amount == 0 {
            return Err(StakingError::ZeroAmount);
        }
        let custody = self.config.custody;
        if ctx.caller == custody {
            return Err(StakingError::Unauthorized(ctx.caller));
        }
        let have = self.token.balance_of(&ctx.caller);
        if have < amount {
            return Err(StakingError::InsufficientFunds { have, need: amount });
        }
        let allowed = self.token.allowance(&ctx.caller, &custody);
        if allowed < amount {
            return Err(StakingError::InsufficientAllowance { have: allowed, need: amount });
        }
        let total_staked = self
            .total_staked
            .checked_add(amount)
            .ok_or(StakingError::ArithmeticOverflow)?;
        let topped_up = match self.positions.get(&ctx.caller) {
            Some(existing) => Some(Position {
                id: existing.id,
                principal: existing
                    .principal
                    .checked_add(amount)
                    .ok_or(StakingError::ArithmeticOverflow)?,
                checkpoint: existing.checkpoint.max(ctx.now),
                accrued: self.claimable(existing, ctx.now)?,
            }),
            None => None,
        };

        self.token.transfer_from(&custody, &ctx.caller, &custody, amount)?;

        let position = match topped_up {
            Some(position) => position,
            None => {
                let (id, changes) = self.tiers.add_tracked();
                self.checkpoint_moved(&changes, ctx.now);
                self.stakers.insert(id, ctx.caller);
                info!(staker = %ctx.caller, id, "new staker registered");
                self.record(StakingEvent::NewStakerRegistered { staker: ctx.caller, id });
                Position { id, principal: amount, checkpoint: ctx.now, accrued: 0 }
            }
        };
        self.positions.insert(ctx.caller, position);
        self.total_staked = total_staked;
        self.record(StakingEvent::Deposited {
            staker: ctx.caller,
            amount,
            principal: position.principal,
        });
        Ok(position.id)
    }

    /// Pay out the caller's reward without closing the position.
    ///
    /// Returns the amount paid, which may be zero.
    pub fn claim(&mut self, ctx: CallContext) -> Result<Amount, StakingError> {
        let position = self.require_position(&ctx.caller)?;
        let reward = self.claimable(&position, ctx.now)?;
        let draw = self.plan_reward(reward, reward)?;

        if reward > 0 {
            self.token.transfer(&self.config.custody, &ctx.caller, reward)?;
        }
        self.rewards.commit_draw(draw);
        self.positions.insert(
            ctx.caller,
            Position { accrued: 0, checkpoint: position.checkpoint.max(ctx.now), ..position },
        );
        info!(staker = %ctx.caller, %reward, "reward claimed");
        self.record(StakingEvent::Claimed { staker: ctx.caller, reward });
        Ok(reward)
    }

    /// Close the caller's position, paying principal plus reward.
    ///
    /// Returns the total amount paid.
    pub fn withdraw(&mut self, ctx: CallContext) -> Result<Amount, StakingError> {
        let position = self.require_position(&ctx.caller)?;
        let reward = self.claimable(&position, ctx.now)?;
        let payout = position
            .principal
            .checked_add(reward)
            .ok_or(StakingError::ArithmeticOverflow)?;
        let draw = self.plan_reward(reward, payout)?;

        self.token.transfer(&self.config.custody, &ctx.caller, payout)?;
        self.rewards.commit_draw(draw);
        self.close_position(&ctx.caller, &position, ctx.now)?;

        info!(staker = %ctx.caller, principal = %position.principal, %reward, "withdrawn");
        self.record(StakingEvent::Withdrawn {
            staker: ctx.caller,
            principal: position.principal,
            reward,
        });
        Ok(payout)
    }

    /// Close the caller's position returning principal only. Accrued reward is forfeited.
    pub fn emergency_withdraw(&mut self, ctx: CallContext) -> Result<Amount, StakingError> {
        if !self.emergency_withdraw_enabled {
            return Err(StakingError::EmergencyWithdrawDisabled);
        }
        let position = self.require_position(&ctx.caller)?;

        self.token.transfer(&self.config.custody, &ctx.caller, position.principal)?;
        self.close_position(&ctx.caller, &position, ctx.now)?;

        info!(staker = %ctx.caller, principal = %position.principal, "emergency withdrawn");
        self.record(StakingEvent::EmergencyWithdrawn {
            staker: ctx.caller,
            principal: position.principal,
        });
        Ok(position.principal)
    }

    // --- admin operations ---

    pub fn set_emergency_withdraw(&mut self, ctx: CallContext, enabled: bool) -> Result<(), StakingError> {
        self.require_admin(&ctx)?;
        self.emergency_withdraw_enabled = enabled;
        info!(enabled, "emergency withdraw toggled");
        self.record(StakingEvent::EmergencyWithdrawToggled { enabled });
        Ok(())
    }

    /// Set per-tier APY in basis points, effective from `ctx.now`.
    pub fn set_apy_percent_rewards(&mut self, ctx: CallContext, rates: ApyRates) -> Result<(), StakingError> {
        self.require_admin(&ctx)?;
        self.rewards.set_rates(rates, ctx.now);
        info!(
            tier1 = rates.tier1_bps,
            tier2 = rates.tier2_bps,
            tier3 = rates.tier3_bps,
            "apy rates updated"
        );
        self.record(StakingEvent::ApyRatesUpdated { rates });
        Ok(())
    }

    /// Pull `amount` from the admin into custody and credit the incentive pool.
    pub fn add_incentive(&mut self, ctx: CallContext, amount: Amount) -> Result<(), StakingError> {
        self.require_admin(&ctx)?;
        if amount == 0 {
            return Err(StakingError::ZeroAmount);
        }
        let pool = self.rewards.pool_after_add(amount)?;
        let custody = self.config.custody;
        self.token.transfer_from(&custody, &ctx.caller, &custody, amount)?;
        self.rewards.set_incentive_pool(pool);
        info!(amount = %amount, pool = %pool, "incentive added");
        self.record(StakingEvent::IncentiveAdded { amount, pool });
        Ok(())
    }

    /// Debit the incentive pool and return `amount` to the admin.
    pub fn remove_incentive(&mut self, ctx: CallContext, amount: Amount) -> Result<(), StakingError> {
        self.require_admin(&ctx)?;
        if amount == 0 {
            return Err(StakingError::ZeroAmount);
        }
        let pool = self.rewards.pool_after_remove(amount)?;
        self.token.transfer(&self.config.custody, &ctx.caller, amount)?;
        self.rewards.set_incentive_pool(pool);
        info!(amount = %amount, pool = %pool, "incentive removed");
        self.record(StakingEvent::IncentiveRemoved { amount, pool });
        Ok(())
    }

    // --- queries ---

    /// Open position of `staker`, if any.
    pub fn position_of(&self, staker: &Address) -> Option<&Position> {
        self.positions.get(staker)
    }

    /// 1-based seniority rank of `staker` among active stakers.
    pub fn get_position(&self, staker: &Address) -> Result<u64, StakingError> {
        let position = self.require_position(staker)?;
        Ok(self.tiers.position(position.id)?)
    }

    /// Addresses currently in tier 1, most senior first.
    pub fn get_top_stakers(&self) -> Vec<Address> {
        self.tiers
            .tier1()
            .into_iter()
            .filter_map(|id| self.stakers.get(&id).copied())
            .collect()
    }

    /// Tier 1 addresses paired with their staked principal, most senior first.
    pub fn top_stakers_with_amounts(&self) -> Vec<(Address, Amount)> {
        self.get_top_stakers()
            .into_iter()
            .map(|staker| (staker, self.deposited(&staker)))
            .collect()
    }

    /// Reward `staker` could claim at `now`.
    pub fn get_glq_to_claim(&self, staker: &Address, now: Timestamp) -> Result<Amount, StakingError> {
        let position = self.require_position(staker)?;
        self.claimable(&position, now)
    }

    /// Claimable reward at `now` as a percentage of principal, scaled by
    /// [`PERCENT_PRECISION`](glq_core::constants::PERCENT_PRECISION).
    pub fn get_waiting_percent_apr(&self, staker: &Address, now: Timestamp) -> Result<u128, StakingError> {
        let position = self.require_position(staker)?;
        let reward = self.claimable(&position, now)?;
        Ok(percent_of(reward, position.principal)?)
    }

    pub fn wallet_current_tier(&self, staker: &Address) -> Result<Tier, StakingError> {
        let position = self.require_position(staker)?;
        Ok(self.tiers.tier(position.id)?)
    }

    /// Principal staked by `staker`, zero without a position.
    pub fn deposited(&self, staker: &Address) -> Amount {
        self.positions.get(staker).map_or(0, |p| p.principal)
    }

    pub fn total_stakers(&self) -> u64 {
        self.tiers.total_stakes()
    }

    pub fn total_staked(&self) -> Amount {
        self.total_staked
    }

    pub fn total_incentive(&self) -> Amount {
        self.rewards.incentive_pool()
    }

    pub fn apy_rates(&self) -> ApyRates {
        self.rewards.current_rates()
    }

    pub fn emergency_withdraw_enabled(&self) -> bool {
        self.emergency_withdraw_enabled
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        let ranking = self.tiers.state();
        LedgerSnapshot {
            total_tier3: ranking.total_tier3(),
            ranking,
            total_staked: self.total_staked,
            incentive_pool_balance: self.rewards.incentive_pool(),
            emergency_withdraw_enabled: self.emergency_withdraw_enabled,
            apy: self.rewards.current_rates(),
            custody_balance: self.token.balance_of(&self.config.custody),
            positions: self.positions.iter().map(|(a, p)| (*a, *p)).collect(),
        }
    }

    /// Take all events recorded since the last drain.
    ///
    /// Events accumulate until drained; a long-lived ledger must drain them
    /// regularly or the buffer keeps only the newest [`MAX_PENDING_EVENTS`].
    pub fn drain_events(&mut self) -> Vec<StakingEvent> {
        self.events.drain(..).collect()
    }

    // --- internals ---

    fn record(&mut self, event: StakingEvent) {
        if self.events.len() == MAX_PENDING_EVENTS {
            self.events.pop_front();
            debug!("event buffer full, dropped oldest");
        }
        self.events.push_back(event);
    }

    fn require_admin(&self, ctx: &CallContext) -> Result<(), StakingError> {
        if ctx.caller != self.config.admin {
            warn!(caller = %ctx.caller, "rejected admin call");
            return Err(StakingError::Unauthorized(ctx.caller));
        }
        Ok(())
    }

    fn require_position(&self, staker: &Address) -> Result<Position, StakingError> {
        self.positions
            .get(staker)
            .copied()
            .ok_or(StakingError::UserNotFound(*staker))
    }

    /// Checkpointed reward plus accrual at the live tier since the checkpoint.
    fn claimable(&self, position: &Position, now: Timestamp) -> Result<Amount, StakingError> {
        let tier = self.tiers.tier(position.id)?;
        let pending = self
            .rewards
            .accrued_between(position.principal, tier, position.checkpoint, now)?;
        position
            .accrued
            .checked_add(pending)
            .ok_or(StakingError::ArithmeticOverflow)
    }

    /// Check that custody can cover `reward` on top of staked principal.
    /// `payout` is the full transfer the reward is part of, for reporting.
    fn plan_reward(&self, reward: Amount, payout: Amount) -> Result<RewardDraw, StakingError> {
        let custody_balance = self.token.balance_of(&self.config.custody);
        self.rewards
            .plan_draw(reward, custody_balance, self.total_staked)
            .ok_or_else(|| {
                let coverage = custody_balance.saturating_sub(self.total_staked);
                let available = (payout - reward).saturating_add(coverage);
                warn!(%available, needed = %payout, "reserve exhausted");
                StakingError::ReserveExhausted { available, needed: payout }
            })
    }

    /// Unlink `position` from the ranking and drop it. Tokens must already have moved.
    fn close_position(&mut self, staker: &Address, position: &Position, now: Timestamp) -> Result<(), StakingError> {
        let changes = self.tiers.remove_tracked(position.id)?;
        self.positions.remove(staker);
        self.stakers.remove(&position.id);
        self.total_staked -= position.principal;
        self.checkpoint_moved(&changes, now);
        Ok(())
    }

    /// Fold accrual at the old tier into every position whose tier just changed.
    fn checkpoint_moved(&mut self, changes: &[TierChange], now: Timestamp) {
        for change in changes {
            let Some(staker) = self.stakers.get(&change.id) else { continue };
            let Some(position) = self.positions.get_mut(staker) else { continue };
            // Saturates instead of failing: an unpayable amount is rejected at payout.
            let pending = self
                .rewards
                .accrued_between(position.principal, change.from, position.checkpoint, now)
                .unwrap_or(Amount::MAX);
            position.accrued = position.accrued.saturating_add(pending);
            position.checkpoint = position.checkpoint.max(now);
        }
    }
}
