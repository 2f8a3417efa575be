//! Trait interfaces for the staking ledger.
//!
//! - [`ExternalToken`]: the fungible token the ledger takes custody of.
//!   The ledger only consumes these semantics; [`MemoryToken`](crate::token::MemoryToken)
//!   is the in-memory implementation used by tests and the replayer.

use crate::error::TokenError;
use crate::types::{Address, Amount};

/// Fungible balance and allowance semantics (ERC-20 style).
///
/// Every mutating method is all-or-nothing: on `Err` no balance or
/// allowance has changed.
pub trait ExternalToken {
    /// Balance held by `owner`.
    fn balance_of(&self, owner: &Address) -> Amount;

    /// Amount `spender` may still move out of `owner`'s balance.
    fn allowance(&self, owner: &Address, spender: &Address) -> Amount;

    /// Set `spender`'s allowance over `owner`'s balance to exactly `amount`.
    fn approve(&mut self, owner: &Address, spender: &Address, amount: Amount);

    /// Move `amount` from `from` to `to` on `from`'s own authority.
    fn transfer(&mut self, from: &Address, to: &Address, amount: Amount) -> Result<(), TokenError>;

    /// Move `amount` from `from` to `to` on `spender`'s authority, consuming allowance.
    ///
    /// # Errors
    ///
    /// - [`TokenError::InsufficientFunds`] if `from` holds less than `amount`
    /// - [`TokenError::InsufficientAllowance`] if `spender` is not authorised for `amount`
    fn transfer_from(
        &mut self,
        spender: &Address,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<(), TokenError>;
}
