//! # RTS Development Tools
//!
//! Command-line tools for working on the command engine:
//! - Engine config validation
//! - Scripted scenario runs with state hash and replay output
//! - Replay verification

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod error;
pub mod replay_check;
pub mod script;
pub mod validate;

pub use error::{Result, ToolError};
