//! Shared test helpers for integration tests.

use glq_core::token::MemoryToken;
use glq_core::traits::ExternalToken;
use glq_core::types::{Address, Amount, CallContext, Timestamp};
use glq_staking::{LedgerConfig, StakingLedger};

pub const ADMIN: Address = Address([0xaa; 20]);
pub const CUSTODY: Address = Address([0xcc; 20]);

/// Address filled with a seed byte.
pub fn addr(seed: u8) -> Address {
    Address([seed; 20])
}

pub fn ctx(caller: Address, now: Timestamp) -> CallContext {
    CallContext::new(caller, now)
}

/// Empty ledger with default rates over a fresh in-memory token.
pub fn ledger() -> StakingLedger {
    ledger_with(LedgerConfig::new(ADMIN, CUSTODY))
}

pub fn ledger_with(config: LedgerConfig) -> StakingLedger {
    StakingLedger::new(config, MemoryToken::new()).expect("valid config")
}

/// Mint `amount` to `who` and raise their custody allowance by the same amount.
pub fn fund(ledger: &mut StakingLedger, who: Address, amount: Amount) {
    ledger.token_mut().mint(&who, amount).expect("mint");
    let allowed = ledger.token().allowance(&who, &CUSTODY);
    ledger.token_mut().approve(&who, &CUSTODY, allowed + amount);
}

/// Fund the admin and move `amount` into the incentive pool at time 0.
pub fn fund_incentive(ledger: &mut StakingLedger, amount: Amount) {
    fund(ledger, ADMIN, amount);
    ledger.add_incentive(ctx(ADMIN, 0), amount).expect("add incentive");
}

/// Ledger where each `(address, amount)` has been funded and deposited, in order, at time 0.
pub fn funded_ledger(stakers: &[(Address, Amount)]) -> StakingLedger {
    let mut ledger = ledger();
    for &(who, amount) in stakers {
        fund(&mut ledger, who, amount);
        ledger.deposit(ctx(who, 0), amount).expect("deposit");
    }
    ledger
}
