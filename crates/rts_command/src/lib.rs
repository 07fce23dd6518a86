//! # RTS Command
//!
//! Deterministic command-execution engine for a real-time strategy
//! simulation.
//!
//! A player's order arrives as a [`envelope::CommandEnvelope`], is checked
//! for availability across the selected element types and becomes one or
//! more [`execution::CommandExecution`]s. Each execution is a resumable,
//! per-entity state machine that advances once per tick.
//!
//! This crate contains **only** deterministic logic:
//! - No rendering
//! - No system randomness
//! - No floating-point math (uses fixed-point)
//! - No IO beyond config and replay file helpers
//!
//! Identical command streams therefore produce identical state hashes,
//! which is what lockstep multiplayer and replays rely on.
//!
//! ## Crate Structure
//!
//! - [`cell`] - Introspectable value cells holding all execution state
//! - [`execution`] - Execution state machine, postponement, chaining
//! - [`commands`] - Behaviors of the standard commands
//! - [`factory`] / [`factories`] - Availability verdicts and execution creation
//! - [`executor`] - Factory registry and dispatch
//! - [`formation`] - Formation-preserving target offsets
//! - [`envelope`] - Envelopes and their wire package
//! - [`world`] / [`scenario`] - Entities, physics and the tick driver
//! - [`replay`] - Recording and verification

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod cell;
pub mod commands;
pub mod config;
pub mod entity;
pub mod envelope;
pub mod error;
pub mod execution;
pub mod executor;
pub mod factories;
pub mod factory;
pub mod formation;
pub mod math;
pub mod player;
pub mod replay;
pub mod scenario;
pub mod world;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::cell::{CellKind, CellStore, CellType, CellValue, ValueCell};
    pub use crate::config::{ElementType, EngineConfig, WeaponStats};
    pub use crate::entity::{Entity, EntityId, MotionStatus};
    pub use crate::envelope::{CommandEnvelope, CommandPackage};
    pub use crate::error::{CommandError, Result};
    pub use crate::execution::{
        CommandExecution, ExecutionBehavior, ExecutionContext, ExecutionId, Lifecycle,
        Postponed, Transition,
    };
    pub use crate::executor::CommandExecutor;
    pub use crate::factories::{StandardCommand, StandardFactory};
    pub use crate::factory::{
        Availability, CommandExecutionFactory, DispatchRequest, FactoryKey,
    };
    pub use crate::formation::MagicBox;
    pub use crate::math::{Fixed, Vec2Fixed};
    pub use crate::player::{PlayerIndex, Race};
    pub use crate::replay::{Replay, ReplayPlayer};
    pub use crate::scenario::{Scenario, TickEvents};
    pub use crate::world::World;
}
