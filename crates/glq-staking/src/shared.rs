//! Single-writer / many-reader access to a ledger from several threads.
//!
//! Mutations serialize through [`SharedLedger::execute`], which holds the
//! write lock for the whole operation, so every operation observes a fixed
//! prior state. Read-only queries go through [`SharedLedger::read`] and may
//! run concurrently.

use std::sync::Arc;

use parking_lot::RwLock;

use glq_core::token::MemoryToken;

use crate::error::StakingError;
use crate::ledger::StakingLedger;

pub struct SharedLedger<T = MemoryToken> {
    inner: Arc<RwLock<StakingLedger<T>>>,
}

impl<T> Clone for SharedLedger<T> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl<T> SharedLedger<T> {
    pub fn new(ledger: StakingLedger<T>) -> Self {
        Self { inner: Arc::new(RwLock::new(ledger)) }
    }

    /// Run a mutating operation under the write lock.
    pub fn execute<R>(
        &self,
        op: impl FnOnce(&mut StakingLedger<T>) -> Result<R, StakingError>,
    ) -> Result<R, StakingError> {
        let mut ledger = self.inner.write();
        op(&mut ledger)
    }

    /// Run a query under a shared read lock.
    pub fn read<R>(&self, query: impl FnOnce(&StakingLedger<T>) -> R) -> R {
        let ledger = self.inner.read();
        query(&ledger)
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use glq_core::traits::ExternalToken;
    use glq_core::types::{Address, CallContext};

    use super::*;
    use crate::config::LedgerConfig;

    const ADMIN: Address = Address([0xaa; 20]);
    const CUSTODY: Address = Address([0xcc; 20]);

    fn shared() -> SharedLedger {
        let ledger =
            StakingLedger::new(LedgerConfig::new(ADMIN, CUSTODY), MemoryToken::new()).unwrap();
        SharedLedger::new(ledger)
    }

    #[test]
    fn concurrent_deposits_all_land() {
        let ledger = shared();
        let handles: Vec<_> = (1..=16u8)
            .map(|seed| {
                let ledger = ledger.clone();
                thread::spawn(move || {
                    let who = Address([seed; 20]);
                    ledger
                        .execute(|l| {
                            l.token_mut().mint(&who, 100)?;
                            l.token_mut().approve(&who, &CUSTODY, 100);
                            l.deposit(CallContext::new(who, seed as u64), 100)
                        })
                        .unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        ledger.read(|l| {
            assert_eq!(l.total_stakers(), 16);
            assert_eq!(l.total_staked(), 1_600);
            assert_eq!(l.token().balance_of(&CUSTODY), 1_600);
            let ids: Vec<u64> = l.tiers().iter().collect();
            assert_eq!(ids, (1..=16).collect::<Vec<u64>>());
        });
    }

    #[test]
    fn failed_execute_leaves_state() {
        let ledger = shared();
        let before = ledger.read(|l| l.snapshot());
        let err = ledger.execute(|l| l.withdraw(CallContext::new(Address([1; 20]), 0)));
        assert_eq!(err, Err(StakingError::UserNotFound(Address([1; 20]))));
        assert_eq!(ledger.read(|l| l.snapshot()), before);
    }

    #[test]
    fn readers_see_committed_state() {
        let ledger = shared();
        ledger
            .execute(|l| l.set_emergency_withdraw(CallContext::new(ADMIN, 0), true))
            .unwrap();
        let readers: Vec<_> = (0..4)
            .map(|_| {
                let ledger = ledger.clone();
                thread::spawn(move || ledger.read(|l| l.emergency_withdraw_enabled()))
            })
            .collect();
        for reader in readers {
            assert!(reader.join().unwrap());
        }
    }
}
