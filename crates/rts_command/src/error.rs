//! Error types for command dispatch and execution.
//!
//! Only recoverable failures live here. Programmer errors inside the
//! state machine (continuing a disposed execution, a stale cell handle)
//! panic instead.

use thiserror::Error;

use crate::entity::EntityId;
use crate::player::{PlayerIndex, Race};

/// Result type alias using [`CommandError`].
pub type Result<T> = std::result::Result<T, CommandError>;

/// Top-level error type for the command engine.
#[derive(Debug, Error)]
pub enum CommandError {
    /// An execution was constructed without recipients.
    #[error("Command execution requires at least one recipient")]
    EmptyRecipients,

    /// A recipient does not belong to the scenario the execution is built for.
    #[error("Entity {0} is not part of this scenario")]
    RecipientNotInScenario(EntityId),

    /// An execution built for one scenario was handed to another.
    #[error("Execution belongs to scenario {expected}, not {actual}")]
    ForeignScenario {
        /// Scenario the execution was validated against.
        expected: u32,
        /// Scenario it was registered with.
        actual: u32,
    },

    /// Recipients are owned by different players.
    #[error("Recipients have different owners: {first:?} and {other:?}")]
    MixedOwners {
        /// Owner of the first recipient.
        first: PlayerIndex,
        /// Owner that did not match.
        other: PlayerIndex,
    },

    /// Recipients have different element types.
    #[error("Recipients have different element types: '{first}' and '{other}'")]
    MixedElementTypes {
        /// Element type of the first recipient.
        first: String,
        /// Element type that did not match.
        other: String,
    },

    /// A factory was declared with a blank command type.
    #[error("Command type must be absent or non-blank, got {0:?}")]
    InvalidCommandType(String),

    /// A factory was declared with a blank entity type.
    #[error("Entity type must be non-blank, got {0:?}")]
    InvalidEntityType(String),

    /// An element type name has no definition.
    #[error("Unknown element type: {0}")]
    UnknownElementType(String),

    /// The player index does not exist in the scenario.
    #[error("Unknown player: {0:?}")]
    UnknownPlayer(PlayerIndex),

    /// Two factories registered for the same key.
    #[error("A factory is already registered for command {command_type:?} on '{entity_type}'")]
    DuplicateFactory {
        /// Command type of the duplicate key.
        command_type: Option<String>,
        /// Entity type of the duplicate key.
        entity_type: String,
    },

    /// Two initializers registered for the same race.
    #[error("A player initializer is already registered for {0:?}")]
    DuplicatePlayerInitializer(Race),

    /// No initializer registered for the race.
    #[error("No player initializer registered for {0:?}")]
    MissingPlayerInitializer(Race),

    /// Engine configuration failed to parse.
    #[error("Failed to parse engine config: {0}")]
    ConfigParse(String),

    /// Engine configuration is inconsistent.
    #[error("Invalid engine config: {0}")]
    InvalidConfig(String),

    /// Reading a file failed.
    #[error("IO error on '{path}': {message}")]
    ConfigIo {
        /// Path that was accessed.
        path: String,
        /// Error message.
        message: String,
    },

    /// A wire package did not have the expected layout.
    #[error("Malformed command package: {0}")]
    MalformedPackage(String),

    /// A wire package carried no recipients.
    #[error("Command package has an empty recipient list")]
    EmptyRecipientList,

    /// Restoring a cell snapshot onto a store with a different layout.
    #[error("Cell layout mismatch at slot {index}: expected '{expected}', found '{found}'")]
    CellLayoutMismatch {
        /// Slot index that differed.
        index: usize,
        /// Slot description in the store.
        expected: String,
        /// Slot description in the snapshot.
        found: String,
    },

    /// Replay serialization or verification failure.
    #[error("Replay error: {0}")]
    Replay(String),
}
