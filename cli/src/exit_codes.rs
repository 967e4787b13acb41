//! Stable exit codes for `deadline-sim`.

/// Command succeeded. A run halted by its outer timeout still succeeds.
pub const OK: i32 = 0;
/// Scenario could not be read, parsed, or validated, or output failed.
pub const INVALID: i32 = 1;
