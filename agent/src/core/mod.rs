//! Pure, deterministic agent logic.
//!
//! Nothing in this module performs I/O or consults the oracle, so every
//! scoring rule, ledger invariant, and decision-parsing tier is testable in
//! isolation.

pub mod decision;
pub mod score;
pub mod state;
