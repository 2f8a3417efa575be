//! Ledger events, appended only when an operation commits.

use serde::{Deserialize, Serialize};

use glq_core::types::{Address, Amount, ApyRates, MemberId};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StakingEvent {
    /// First deposit from an address; carries the member id it was issued.
    NewStakerRegistered { staker: Address, id: MemberId },
    Deposited { staker: Address, amount: Amount, principal: Amount },
    Claimed { staker: Address, reward: Amount },
    Withdrawn { staker: Address, principal: Amount, reward: Amount },
    EmergencyWithdrawn { staker: Address, principal: Amount },
    IncentiveAdded { amount: Amount, pool: Amount },
    IncentiveRemoved { amount: Amount, pool: Amount },
    ApyRatesUpdated { rates: ApyRates },
    EmergencyWithdrawToggled { enabled: bool },
}
