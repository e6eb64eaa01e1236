//! Unified exit codes. Part of the public contract: the PASS/FAIL
//! verdict is data inside the report, never an OS-level failure.

pub const SUCCESS: i32 = 0;
/// A requested action (smoke step, detection) failed.
pub const RUN_FAILED: i32 = 1;
/// Configuration prevented any measurement from starting.
pub const CONFIG_ERROR: i32 = 2;
