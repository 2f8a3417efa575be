//! Ordered operation log and deterministic replay.
//!
//! A log is JSON Lines: one [`LogEntry`] per line, blank lines and lines
//! starting with `#` ignored. Each entry carries the timestamp the operation
//! observes, so replaying the same log from the same starting ledger always
//! produces the same [`LedgerSnapshot`](crate::ledger::LedgerSnapshot).
//! Entries that revert are recorded in the [`ReplayReport`] and skipped.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use glq_core::token::MemoryToken;
use glq_core::traits::ExternalToken;
use glq_core::types::{Address, Amount, ApyRates, CallContext, Timestamp};

use crate::error::{OplogError, StakingError};
use crate::ledger::StakingLedger;

/// One submitted operation.
///
/// The token operations (`mint`, `approve`, `transfer`) drive the in-memory
/// token so a log can describe a complete scenario.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Mint { to: Address, amount: Amount },
    /// Approve the custody account to pull `amount` from `owner`.
    Approve { owner: Address, amount: Amount },
    Transfer { from: Address, to: Address, amount: Amount },
    Deposit { caller: Address, amount: Amount },
    Claim { caller: Address },
    Withdraw { caller: Address },
    EmergencyWithdraw { caller: Address },
    SetEmergencyWithdraw { caller: Address, enabled: bool },
    SetApyPercentRewards { caller: Address, rates: ApyRates },
    AddIncentive { caller: Address, amount: Amount },
    RemoveIncentive { caller: Address, amount: Amount },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: Timestamp,
    pub op: Operation,
}

impl LogEntry {
    pub fn new(timestamp: Timestamp, op: Operation) -> Self {
        Self { timestamp, op }
    }
}

/// An entry that reverted during replay.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Revert {
    /// Zero-based index into the replayed entries.
    pub index: usize,
    pub error: StakingError,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ReplayReport {
    pub applied: usize,
    pub reverted: Vec<Revert>,
}

/// Apply a single entry to `ledger`.
pub fn apply(ledger: &mut StakingLedger<MemoryToken>, entry: &LogEntry) -> Result<(), StakingError> {
    let now = entry.timestamp;
    let ctx = |caller: Address| CallContext::new(caller, now);
    match &entry.op {
        Operation::Mint { to, amount } => ledger.token_mut().mint(to, *amount)?,
        Operation::Approve { owner, amount } => {
            let custody = ledger.config().custody;
            ledger.token_mut().approve(owner, &custody, *amount);
        }
        Operation::Transfer { from, to, amount } => ledger.token_mut().transfer(from, to, *amount)?,
        Operation::Deposit { caller, amount } => {
            ledger.deposit(ctx(*caller), *amount)?;
        }
        Operation::Claim { caller } => {
            ledger.claim(ctx(*caller))?;
        }
        Operation::Withdraw { caller } => {
            ledger.withdraw(ctx(*caller))?;
        }
        Operation::EmergencyWithdraw { caller } => {
            ledger.emergency_withdraw(ctx(*caller))?;
        }
        Operation::SetEmergencyWithdraw { caller, enabled } => {
            ledger.set_emergency_withdraw(ctx(*caller), *enabled)?
        }
        Operation::SetApyPercentRewards { caller, rates } => {
            ledger.set_apy_percent_rewards(ctx(*caller), *rates)?
        }
        Operation::AddIncentive { caller, amount } => ledger.add_incentive(ctx(*caller), *amount)?,
        Operation::RemoveIncentive { caller, amount } => {
            ledger.remove_incentive(ctx(*caller), *amount)?
        }
    }
    Ok(())
}

/// Apply `entries` in order. Reverted entries are reported, not fatal.
pub fn replay(ledger: &mut StakingLedger<MemoryToken>, entries: &[LogEntry]) -> ReplayReport {
    let mut report = ReplayReport::default();
    for (index, entry) in entries.iter().enumerate() {
        match apply(ledger, entry) {
            Ok(()) => report.applied += 1,
            Err(error) => {
                debug!(index, %error, "entry reverted");
                report.reverted.push(Revert { index, error });
            }
        }
    }
    info!(
        applied = report.applied,
        reverted = report.reverted.len(),
        "replay finished"
    );
    report
}

/// Parse a JSON Lines log.
pub fn parse_log(text: &str) -> Result<Vec<LogEntry>, OplogError> {
    let mut entries = Vec::new();
    for (i, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let entry = serde_json::from_str(line)
            .map_err(|e| OplogError::Parse { line: i + 1, message: e.to_string() })?;
        entries.push(entry);
    }
    Ok(entries)
}

pub fn load_log(path: impl AsRef<Path>) -> Result<Vec<LogEntry>, OplogError> {
    let text = std::fs::read_to_string(path)?;
    parse_log(&text)
}

/// Render `entries` as JSON Lines.
pub fn write_log(entries: &[LogEntry]) -> Result<String, serde_json::Error> {
    let mut out = String::new();
    for entry in entries {
        out.push_str(&serde_json::to_string(entry)?);
        out.push('\n');
    }
    Ok(out)
}
