//! Integration test suite for the GLQ staking ledger.
//!
//! Cross-crate scenarios live under `tests/`: the ranking golden vectors,
//! ledger flows against the in-memory token, and replay determinism.

pub mod helpers;
