//! Inactive User: lifecycle engine for dormant accounts.
//!
//! Periodically scans accounts and drives each one through notification,
//! warning, blocking and deletion, never acting twice on the same transition
//! and never skipping the grace period between a warning and its consequence.

// Foundation types
pub mod clock;
pub mod constants;
pub mod error;
pub mod time_utils;

// Core types
pub mod account;
pub mod config;
pub mod predicate;
pub mod repository;

// Sub-systems
pub mod engine;
pub mod notify;
pub mod run_gate;
pub mod storage;
pub mod tracing_init;

#[cfg(test)]
pub mod test_helpers;

// Re-exports for convenience
pub use error::{LifecycleError, LifecycleResult};
