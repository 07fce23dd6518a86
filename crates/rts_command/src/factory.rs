//! Factory contract: turning an envelope into executions for one element type.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::entity::EntityId;
use crate::error::{CommandError, Result};
use crate::execution::CommandExecution;
use crate::math::Vec2Fixed;
use crate::world::World;

/// Whether a command can be issued to a set of entities.
///
/// Ordered so that combining verdicts is taking the minimum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Availability {
    /// The command does not apply at all.
    Unavailable,
    /// The command applies but cannot be issued right now.
    Disabled,
    /// The command can be issued.
    Enabled,
}

impl Availability {
    /// Combine two verdicts: any `Unavailable` wins, then any `Disabled`.
    #[must_use]
    pub fn combine(self, other: Self) -> Self {
        self.min(other)
    }

    /// Combine many verdicts. An empty set is `Enabled`.
    #[must_use]
    pub fn combine_all<I: IntoIterator<Item = Self>>(verdicts: I) -> Self {
        verdicts.into_iter().fold(Self::Enabled, Self::combine)
    }
}

/// Registry key of a factory: command type plus entity type.
///
/// A missing command type stands for the context-dependent smart command.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FactoryKey {
    command_type: Option<String>,
    entity_type: String,
}

impl FactoryKey {
    /// Build a key, rejecting blank names.
    pub fn new(command_type: Option<&str>, entity_type: &str) -> Result<Self> {
        if let Some(command) = command_type {
            if command.trim().is_empty() {
                return Err(CommandError::InvalidCommandType(command.to_string()));
            }
        }
        if entity_type.trim().is_empty() {
            return Err(CommandError::InvalidEntityType(entity_type.to_string()));
        }
        Ok(Self {
            command_type: command_type.map(str::to_string),
            entity_type: entity_type.to_string(),
        })
    }

    /// Command type, `None` for the smart command.
    #[must_use]
    pub fn command_type(&self) -> Option<&str> {
        self.command_type.as_deref()
    }

    /// Entity type.
    #[must_use]
    pub fn entity_type(&self) -> &str {
        &self.entity_type
    }
}

impl fmt::Display for FactoryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.command_type {
            Some(command) => write!(f, "{command}@{}", self.entity_type),
            None => write!(f, "<smart>@{}", self.entity_type),
        }
    }
}

/// Everything a factory needs to build executions for its part of a selection.
#[derive(Debug, Clone, Copy)]
pub struct DispatchRequest<'a> {
    /// Entities of the factory's element type.
    pub subset: &'a [EntityId],
    /// The whole resolved selection, all element types.
    pub selection: &'a [EntityId],
    /// Target position, zero when the command has none.
    pub target_position: Vec2Fixed,
    /// Target entity.
    pub target_entity: Option<EntityId>,
    /// Free-form parameter.
    pub parameter: Option<&'a str>,
}

/// Builds executions of one command for one element type.
pub trait CommandExecutionFactory: fmt::Debug {
    /// Registry key.
    fn key(&self) -> &FactoryKey;

    /// Verdict for issuing the command to `subset` (all of this factory's
    /// element type) as part of `selection`.
    fn availability(
        &self,
        world: &World,
        subset: &[EntityId],
        selection: &[EntityId],
        parameter: Option<&str>,
    ) -> Availability;

    /// Build one execution per entity, one for the whole subset, or fewer.
    fn create_executions(
        &self,
        world: &World,
        request: &DispatchRequest<'_>,
    ) -> Result<Vec<CommandExecution>>;
}
