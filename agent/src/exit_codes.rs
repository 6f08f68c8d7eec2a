//! Stable exit codes for agent CLI commands.

/// Command succeeded, or the session ended by its own judgment.
pub const OK: i32 = 0;
/// Command failed due to invalid arguments/config or other errors.
pub const INVALID: i32 = 1;
/// The session ended without completing (budget exhausted or interrupted).
pub const INCOMPLETE: i32 = 2;
