//! In-memory [`ExternalToken`] implementation.
//!
//! Stands in for the deployed token contract in tests and in the operation
//! log replayer. Balances and allowances live in `BTreeMap`s so that
//! serialized state is deterministic.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::TokenError;
use crate::traits::ExternalToken;
use crate::types::{Address, Amount};

/// Fungible token ledger held entirely in memory.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryToken {
    balances: BTreeMap<Address, Amount>,
    /// owner → spender → remaining allowance.
    allowances: BTreeMap<Address, BTreeMap<Address, Amount>>,
    total_supply: Amount,
}

impl MemoryToken {
    /// Create a token with no balances.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create `amount` new tokens credited to `to`.
    pub fn mint(&mut self, to: &Address, amount: Amount) -> Result<(), TokenError> {
        let supply = self.total_supply.checked_add(amount).ok_or(TokenError::Overflow)?;
        let balance = self.balance_of(to).checked_add(amount).ok_or(TokenError::Overflow)?;
        self.total_supply = supply;
        self.balances.insert(*to, balance);
        Ok(())
    }

    /// Sum of all balances.
    pub fn total_supply(&self) -> Amount {
        self.total_supply
    }

    fn move_balance(&mut self, from: &Address, to: &Address, amount: Amount) -> Result<(), TokenError> {
        let have = self.balance_of(from);
        if have < amount {
            return Err(TokenError::InsufficientFunds { have, need: amount });
        }
        if from == to {
            return Ok(());
        }
        let credited = self.balance_of(to).checked_add(amount).ok_or(TokenError::Overflow)?;
        self.balances.insert(*from, have - amount);
        self.balances.insert(*to, credited);
        Ok(())
    }
}

impl ExternalToken for MemoryToken {
    fn balance_of(&self, owner: &Address) -> Amount {
        self.balances.get(owner).copied().unwrap_or(0)
    }

    fn allowance(&self, owner: &Address, spender: &Address) -> Amount {
        self.allowances
            .get(owner)
            .and_then(|spenders| spenders.get(spender))
            .copied()
            .unwrap_or(0)
    }

    fn approve(&mut self, owner: &Address, spender: &Address, amount: Amount) {
        if amount == 0 {
            if let Some(spenders) = self.allowances.get_mut(owner) {
                spenders.remove(spender);
                if spenders.is_empty() {
                    self.allowances.remove(owner);
                }
            }
        } else {
            self.allowances.entry(*owner).or_default().insert(*spender, amount);
        }
    }

    fn transfer(&mut self, from: &Address, to: &Address, amount: Amount) -> Result<(), TokenError> {
        self.move_balance(from, to, amount)
    }

    fn transfer_from(
        &mut self,
        spender: &Address,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<(), TokenError> {
        let allowed = self.allowance(from, spender);
        if allowed < amount {
            return Err(TokenError::InsufficientAllowance { have: allowed, need: amount });
        }
        self.move_balance(from, to, amount)?;
        self.approve(from, spender, allowed - amount);
        Ok(())
    }
}
