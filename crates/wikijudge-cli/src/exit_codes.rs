//! Process exit codes. Part of the CLI contract.

pub const SUCCESS: i32 = 0;
/// Bad configuration, unreadable inputs, or a fatal orchestrator error.
pub const CONFIG_ERROR: i32 = 2;
/// Cancelled by Ctrl-C; the status file was saved first.
pub const INTERRUPTED: i32 = 130;
