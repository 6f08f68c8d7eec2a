//! Autonomous coding-agent session loop.
//!
//! This crate implements a bounded decide/dispatch/record/reassess loop: a
//! reasoning oracle picks the next capability to invoke, the loop dispatches
//! it, folds the outcome into an append-only ledger, and re-derives the
//! agent's self-assessment until the oracle stops, quality is high enough, or
//! the invocation budget runs out. The architecture enforces a strict
//! separation:
//!
//! - **[`core`]**: Pure, deterministic logic (scoring, decision
//!   interpretation, ledger updates). No I/O, fully testable in isolation.
//! - **[`io`]**: Side-effecting operations (filesystem, config, process
//!   execution, prompt rendering). Isolated to enable scripted doubles in
//!   tests.
//!
//! Orchestration modules ([`looping`], [`selector`], [`report`]) coordinate
//! core logic with I/O, and [`tools`] holds the dispatchable capability set.

pub mod core;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod looping;
pub mod oracle;
pub mod report;
pub mod selector;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod tools;
