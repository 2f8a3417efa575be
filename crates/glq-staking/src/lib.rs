//! # glq-staking
//! Staking ledger with tenure-ranked reward tiers.
//!
//! - [`ledger::StakingLedger`]: deposits, withdrawals, claims and admin controls
//! - [`reward::RewardEngine`]: tier-dependent linear accrual and the incentive pool
//! - [`oplog`]: deterministic replay of an ordered operation log
//! - [`shared::SharedLedger`]: single-writer, many-reader wrapper

pub mod config;
pub mod error;
pub mod events;
pub mod ledger;
pub mod oplog;
pub mod reward;
pub mod shared;

pub use config::LedgerConfig;
pub use error::{ConfigError, OplogError, StakingError};
pub use events::StakingEvent;
pub use ledger::{LedgerSnapshot, Position, StakingLedger, MAX_PENDING_EVENTS};
pub use reward::RewardEngine;
pub use shared::SharedLedger;
