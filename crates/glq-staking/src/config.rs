//! Ledger configuration.
//!
//! [`LedgerConfig`] names the admin and custody accounts and the initial
//! reward parameters. It can be built programmatically with defaults or
//! loaded from a JSON file for the replayer.

use std::path::Path;

use serde::{Deserialize, Serialize};

use glq_core::constants::SECONDS_PER_YEAR;
use glq_core::types::{Address, ApyRates, Timestamp};

use crate::error::ConfigError;

fn default_seconds_per_year() -> u64 {
    SECONDS_PER_YEAR
}

/// Configuration for a [`StakingLedger`](crate::ledger::StakingLedger).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Account allowed to call admin operations.
    pub admin: Address,
    /// Account holding staked principal and the incentive pool.
    pub custody: Address,
    /// Initial per-tier APY in basis points.
    #[serde(default)]
    pub apy: ApyRates,
    #[serde(default)]
    pub emergency_withdraw_enabled: bool,
    /// Length of the accrual year in seconds.
    #[serde(default = "default_seconds_per_year")]
    pub seconds_per_year: u64,
    /// Start of the first APY epoch.
    #[serde(default)]
    pub genesis: Timestamp,
}

impl LedgerConfig {
    /// Config with default APY (15% / 7.5% / 5%), emergency switch off, 365-day year.
    pub fn new(admin: Address, custody: Address) -> Self {
        Self {
            admin,
            custody,
            apy: ApyRates::default(),
            emergency_withdraw_enabled: false,
            seconds_per_year: SECONDS_PER_YEAR,
            genesis: 0,
        }
    }

    /// Parse and validate a JSON config.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON config file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.custody.is_zero() {
            return Err(ConfigError::Invalid("custody address is zero".into()));
        }
        if self.custody == self.admin {
            return Err(ConfigError::Invalid("custody and admin must differ".into()));
        }
        if self.seconds_per_year == 0 {
            return Err(ConfigError::Invalid("seconds_per_year must be positive".into()));
        }
        Ok(())
    }
}
