//! Error types for the GLQ staking ledger.
use thiserror::Error;

use crate::types::{Amount, MemberId};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TierError {
    #[error("user not found: member {0}")] UserNotFound(MemberId),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("insufficient funds: have {have}, need {need}")] InsufficientFunds { have: Amount, need: Amount },
    #[error("insufficient allowance: have {have}, need {need}")] InsufficientAllowance { have: Amount, need: Amount },
    #[error("balance overflow")] Overflow,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RewardError {
    #[error("arithmetic overflow")] ArithmeticOverflow,
    #[error("insufficient incentive: have {have}, need {need}")] InsufficientIncentive { have: Amount, need: Amount },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("missing 0x prefix")] InvalidPrefix,
    #[error("invalid length: {0}")] InvalidLength(usize),
    #[error("invalid hex: {0}")] InvalidHex(String),
}
