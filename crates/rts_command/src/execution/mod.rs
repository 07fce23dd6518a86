//! Command executions: one order being carried out by a set of recipients.
//!
//! A [`CommandExecution`] is a small state machine:
//!
//! ```text
//! Uninitialized --first continue--> Active --behavior done--> Finished --> Disposed
//!        \______________________ recipients emptied _______/
//! ```
//!
//! Command-specific logic lives behind the [`ExecutionBehavior`] trait. All
//! mutable state of both the execution and its behavior is held in cells
//! of the execution's [`CellStore`], so the whole execution can be hashed,
//! snapshotted and restored without knowing which command it runs.

pub mod chain;
pub mod postponed;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::cell::{CellKind, CellSnapshot, CellStore, CellType, CellValue, ValueCell};
use crate::entity::{Entity, EntityId};
use crate::error::{CommandError, Result};
use crate::player::PlayerIndex;
use crate::world::World;

pub use chain::Transition;
pub use postponed::{gate, Gate, PostponeState, Postponed};

/// Identifier of an execution within a scenario. Assigned in increasing order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct ExecutionId(pub u64);

impl fmt::Display for ExecutionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "exec#{}", self.0)
    }
}

/// Lifecycle state of an execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Lifecycle {
    /// Created, not yet continued.
    Uninitialized,
    /// Initialized and running.
    Active,
    /// Done; awaiting disposal.
    Finished,
    /// Released all recipients. Must never be continued again.
    Disposed,
}

impl CellType for Lifecycle {
    const KIND: CellKind = CellKind::Int;

    fn into_value(self) -> CellValue {
        CellValue::Int(match self {
            Self::Uninitialized => 0,
            Self::Active => 1,
            Self::Finished => 2,
            Self::Disposed => 3,
        })
    }

    fn from_value(value: &CellValue) -> Option<Self> {
        match value {
            CellValue::Int(0) => Some(Self::Uninitialized),
            CellValue::Int(1) => Some(Self::Active),
            CellValue::Int(2) => Some(Self::Finished),
            CellValue::Int(3) => Some(Self::Disposed),
            _ => None,
        }
    }
}

/// Request from a running execution to start another one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubExecution {
    /// Recipients handed to the new execution.
    pub recipients: Vec<EntityId>,
    /// What the new execution should do.
    pub transition: Transition,
}

/// Command-specific logic of an execution.
///
/// Behaviors keep their state in cells declared on the execution's store
/// when they are built, and reach it through the [`ExecutionContext`].
pub trait ExecutionBehavior: fmt::Debug {
    /// Runs once, right before the first `continue_step`.
    fn initialize(&mut self, ctx: &mut ExecutionContext<'_>) {
        let _ = ctx;
    }

    /// Advance by one tick. Returns `true` when the command is complete.
    fn continue_step(&mut self, ctx: &mut ExecutionContext<'_>) -> bool;

    /// Order that should follow once this execution has finished.
    fn continuation(&self, ctx: &ExecutionContext<'_>) -> Option<Transition> {
        let _ = ctx;
        None
    }

    /// Short label shown while the command runs. `None` hides it.
    fn label(&self) -> Option<&'static str> {
        None
    }
}

/// View of the world and the execution's own state handed to behaviors.
pub struct ExecutionContext<'a> {
    world: &'a mut World,
    cells: &'a mut CellStore,
    recipients: ValueCell<Vec<EntityId>>,
    id: ExecutionId,
    requests: &'a mut Vec<SubExecution>,
}

impl<'a> ExecutionContext<'a> {
    /// Id of the running execution.
    #[must_use]
    pub const fn execution_id(&self) -> ExecutionId {
        self.id
    }

    /// The world.
    #[must_use]
    pub fn world(&self) -> &World {
        self.world
    }

    /// The world, mutably.
    pub fn world_mut(&mut self) -> &mut World {
        self.world
    }

    /// Read a cell of this execution.
    #[must_use]
    pub fn read<T: CellType>(&self, cell: ValueCell<T>) -> T {
        self.cells.read(cell)
    }

    /// Write a cell of this execution.
    pub fn write<T: CellType>(&mut self, cell: ValueCell<T>, value: T) {
        self.cells.write(cell, value);
    }

    /// Current recipients.
    #[must_use]
    pub fn recipients(&self) -> Vec<EntityId> {
        self.cells.read(self.recipients)
    }

    /// First recipient that is still live.
    #[must_use]
    pub fn recipient(&self) -> Option<EntityId> {
        self.recipients()
            .into_iter()
            .find(|&id| self.world.is_live(id))
    }

    /// Entity of the first live recipient.
    #[must_use]
    pub fn recipient_entity(&self) -> Option<&Entity> {
        self.recipient().and_then(|id| self.world.entity(id))
    }

    /// Mutable entity of the first live recipient.
    pub fn recipient_entity_mut(&mut self) -> Option<&mut Entity> {
        let id = self.recipient()?;
        self.world.entity_mut(id)
    }

    /// Hand `recipient` over to a new execution once this tick's pass is done.
    ///
    /// The new execution detaches the recipient from this one.
    pub fn start_sub_execution(&mut self, recipient: EntityId, transition: Transition) {
        tracing::debug!(parent = %self.id, recipient, ?transition, "Sub-execution requested");
        self.requests.push(SubExecution {
            recipients: vec![recipient],
            transition,
        });
    }
}

/// A command being carried out by one or more recipients.
#[derive(Debug)]
pub struct CommandExecution {
    scenario_id: u32,
    owner: PlayerIndex,
    element_type: String,
    cells: CellStore,
    recipients: ValueCell<Vec<EntityId>>,
    lifecycle: ValueCell<Lifecycle>,
    behavior: Box<dyn ExecutionBehavior>,
}

/// Flat dump of an execution's state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionSnapshot {
    /// Execution id.
    pub id: ExecutionId,
    /// Behavior label, if any.
    pub label: Option<String>,
    /// Owner of the recipients.
    pub owner: PlayerIndex,
    /// Element type of the recipients.
    pub element_type: String,
    /// All cells, in declaration order.
    pub cells: CellSnapshot,
}

impl CommandExecution {
    /// Validate `recipients` against `world` and build an execution.
    ///
    /// `build` declares the behavior's cells on the store and returns the
    /// behavior. Duplicate recipient ids are collapsed.
    pub fn new<B, F>(world: &World, recipients: &[EntityId], build: F) -> Result<Self>
    where
        B: ExecutionBehavior + 'static,
        F: FnOnce(&mut CellStore) -> B,
    {
        let mut unique: Vec<EntityId> = Vec::with_capacity(recipients.len());
        for &id in recipients {
            if !unique.contains(&id) {
                unique.push(id);
            }
        }
        let Some(&first_id) = unique.first() else {
            return Err(CommandError::EmptyRecipients);
        };
        let first = world
            .entity(first_id)
            .ok_or(CommandError::RecipientNotInScenario(first_id))?;
        for &id in &unique[1..] {
            let entity = world
                .entity(id)
                .ok_or(CommandError::RecipientNotInScenario(id))?;
            if entity.owner != first.owner {
                return Err(CommandError::MixedOwners {
                    first: first.owner,
                    other: entity.owner,
                });
            }
            if entity.element_type != first.element_type {
                return Err(CommandError::MixedElementTypes {
                    first: first.element_type.clone(),
                    other: entity.element_type.clone(),
                });
            }
        }

        let mut cells = CellStore::new();
        let recipients_cell = cells.declare("recipients", unique);
        let lifecycle = cells.declare("lifecycle", Lifecycle::Uninitialized);
        let behavior = build(&mut cells);

        Ok(Self {
            scenario_id: world.id(),
            owner: first.owner,
            element_type: first.element_type.clone(),
            cells,
            recipients: recipients_cell,
            lifecycle,
            behavior: Box::new(behavior),
        })
    }

    /// Scenario the execution was validated against.
    #[must_use]
    pub const fn scenario_id(&self) -> u32 {
        self.scenario_id
    }

    /// Owner of all recipients.
    #[must_use]
    pub const fn owner(&self) -> PlayerIndex {
        self.owner
    }

    /// Element type shared by all recipients.
    #[must_use]
    pub fn element_type(&self) -> &str {
        &self.element_type
    }

    /// Current recipients.
    #[must_use]
    pub fn recipients(&self) -> Vec<EntityId> {
        self.cells.read(self.recipients)
    }

    /// Whether `id` is a current recipient.
    #[must_use]
    pub fn has_recipient(&self, id: EntityId) -> bool {
        self.recipients().contains(&id)
    }

    /// Lifecycle state.
    #[must_use]
    pub fn lifecycle(&self) -> Lifecycle {
        self.cells.read(self.lifecycle)
    }

    /// Label of the running behavior.
    #[must_use]
    pub fn label(&self) -> Option<&'static str> {
        self.behavior.label()
    }

    /// All state cells.
    #[must_use]
    pub const fn cells(&self) -> &CellStore {
        &self.cells
    }

    /// Drop a recipient, e.g. because it received a newer order or died.
    /// Returns whether it was a recipient.
    pub fn remove_recipient(&mut self, id: EntityId) -> bool {
        let mut recipients = self.recipients();
        let before = recipients.len();
        recipients.retain(|&r| r != id);
        let removed = recipients.len() != before;
        if removed {
            self.cells.write(self.recipients, recipients);
        }
        removed
    }

    /// Advance by one tick. Returns `true` once the execution has finished.
    ///
    /// Initializes lazily on the first call. Finishes without calling the
    /// behavior once every recipient is gone.
    ///
    /// # Panics
    ///
    /// Panics if the execution has been disposed.
    pub fn continue_step(
        &mut self,
        world: &mut World,
        id: ExecutionId,
        requests: &mut Vec<SubExecution>,
    ) -> bool {
        match self.lifecycle() {
            Lifecycle::Disposed => panic!("{id} continued after disposal"),
            Lifecycle::Finished => return true,
            Lifecycle::Uninitialized | Lifecycle::Active => {}
        }

        if self.recipients().is_empty() {
            tracing::trace!(%id, "No recipients left, finishing");
            self.cells.write(self.lifecycle, Lifecycle::Finished);
            return true;
        }

        let initialize = self.lifecycle() == Lifecycle::Uninitialized;
        if initialize {
            self.cells.write(self.lifecycle, Lifecycle::Active);
        }

        let mut ctx = ExecutionContext {
            world,
            cells: &mut self.cells,
            recipients: self.recipients,
            id,
            requests,
        };
        if initialize {
            self.behavior.initialize(&mut ctx);
        }
        let finished = self.behavior.continue_step(&mut ctx);

        if finished {
            tracing::trace!(%id, label = ?self.behavior.label(), "Execution finished");
            self.cells.write(self.lifecycle, Lifecycle::Finished);
        }
        finished
    }

    /// Order that should follow this finished execution.
    ///
    /// Always `None` when no recipient is left to carry it out.
    pub fn continuation(&mut self, world: &mut World, id: ExecutionId) -> Option<Transition> {
        if self.recipients().is_empty() {
            return None;
        }
        let mut requests = Vec::new();
        let ctx = ExecutionContext {
            world,
            cells: &mut self.cells,
            recipients: self.recipients,
            id,
            requests: &mut requests,
        };
        self.behavior.continuation(&ctx)
    }

    /// Release all recipients and mark the execution disposed.
    /// Returns the recipients it held.
    pub fn dispose(&mut self) -> Vec<EntityId> {
        let recipients = self.recipients();
        self.cells.write(self.recipients, Vec::new());
        self.cells.write(self.lifecycle, Lifecycle::Disposed);
        recipients
    }

    /// Flat dump of this execution's state.
    #[must_use]
    pub fn snapshot(&self, id: ExecutionId) -> ExecutionSnapshot {
        ExecutionSnapshot {
            id,
            label: self.label().map(str::to_string),
            owner: self.owner,
            element_type: self.element_type.clone(),
            cells: self.cells.snapshot(),
        }
    }

    /// Roll the execution back to a snapshot taken from it.
    pub fn restore(&mut self, snapshot: &ExecutionSnapshot) -> Result<()> {
        self.cells.restore(&snapshot.cells)
    }
}
