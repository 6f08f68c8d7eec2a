//! Side-effecting operations: filesystem layout, configuration, process
//! execution, prompt rendering, and durable session logs.

pub mod config;
pub mod process;
pub mod prompt;
pub mod session_log;
pub mod workspace;
