//! Error types for the staking ledger, its configuration and the operation log.

use serde::{Serialize, Serializer};
use thiserror::Error;

use glq_core::error::{RewardError, TierError, TokenError};
use glq_core::types::{Address, Amount};

/// Ledger operation failures. Any `Err` leaves the ledger untouched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StakingError {
    #[error("insufficient funds: have {have}, need {need}")]
    InsufficientFunds { have: Amount, need: Amount },
    #[error("insufficient allowance: have {have}, need {need}")]
    InsufficientAllowance { have: Amount, need: Amount },
    #[error("user not found: {0}")]
    UserNotFound(Address),
    #[error("emergency withdraw is disabled")]
    EmergencyWithdrawDisabled,
    #[error("unauthorized caller: {0}")]
    Unauthorized(Address),
    #[error("reserve exhausted: available {available}, needed {needed}")]
    ReserveExhausted { available: Amount, needed: Amount },
    #[error("amount must be non-zero")]
    ZeroAmount,
    #[error("arithmetic overflow")]
    ArithmeticOverflow,
    #[error(transparent)]
    Tier(#[from] TierError),
    #[error(transparent)]
    Reward(#[from] RewardError),
}

impl From<TokenError> for StakingError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::InsufficientFunds { have, need } => Self::InsufficientFunds { have, need },
            TokenError::InsufficientAllowance { have, need } => {
                Self::InsufficientAllowance { have, need }
            }
            TokenError::Overflow => Self::ArithmeticOverflow,
        }
    }
}

/// Serialized as its display message, for replay reports.
impl Serialize for StakingError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

/// Failures loading or validating a [`LedgerConfig`](crate::config::LedgerConfig).
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config io: {0}")]
    Io(#[from] std::io::Error),
    #[error("config parse: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Failures loading an operation log.
#[derive(Error, Debug)]
pub enum OplogError {
    #[error("oplog io: {0}")]
    Io(#[from] std::io::Error),
    #[error("oplog parse error on line {line}: {message}")]
    Parse { line: usize, message: String },
}
