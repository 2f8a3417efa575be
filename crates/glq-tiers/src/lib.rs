//! # glq-tiers
//! Tenure-ranked tier engine.
//!
//! Members are kept in join order in a doubly linked chain keyed by id.
//! Three contiguous segments partition the chain:
//! - **Tier 1**: the most senior `⌊15·n/100⌋` members at the head
//! - **Tier 2**: the next `⌊40·n/100⌋` members
//! - **Tier 3**: everyone else, down to the tail
//!
//! Every [`TierCompute::add`] / [`TierCompute::remove`] moves the two
//! segment boundaries by a bounded number of links, so the cost of a
//! mutation does not depend on the population size.

pub mod engine;

pub use engine::{RankingState, TierChange, TierCompute, MAX_REBALANCE_STEPS};
