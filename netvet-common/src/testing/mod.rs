//! Test support shared by the netvet crates.
//!
//! Provides JSONL test logging so failed runs in CI can be inspected after
//! the fact.

pub mod log;

pub use log::{TestGuard, TestLogEntry, TestLogger, TestPhase, init_global_test_logging};
