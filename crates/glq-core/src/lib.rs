//! # glq-core
//! Foundation types and traits for the GLQ staking ledger.

pub mod constants;
pub mod error;
pub mod token;
pub mod traits;
pub mod types;
