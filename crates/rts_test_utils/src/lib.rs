//! # RTS Test Utilities
//!
//! Shared testing utilities for the command engine:
//! - Determinism test harness
//! - Execution drive harness
//! - Fixture spawning helpers
//! - Property-based testing strategies

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod determinism;
pub mod fixtures;
pub mod harness;

/// Re-export proptest for convenience.
pub use proptest;
