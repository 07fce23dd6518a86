//! Execution drive harness.
//!
//! Drives a single [`CommandExecution`] against a bare [`World`], the way
//! the scenario does: one `continue_step` per tick followed by one physics
//! step. The harness never continues an execution after it reported
//! completion, and records how many calls it took.

use rts_command::entity::EntityId;
use rts_command::execution::{CommandExecution, ExecutionId, SubExecution, Transition};
use rts_command::world::World;

/// Id the harness gives the driven execution.
pub const HARNESS_EXECUTION: ExecutionId = ExecutionId(1);

/// Outcome of driving an execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriveReport {
    /// Number of `continue_step` calls made.
    pub calls: u64,
    /// Whether the execution reported completion.
    pub finished: bool,
    /// Sub-executions requested along the way.
    pub sub_executions: Vec<SubExecution>,
    /// Order the execution wants to chain into, if it finished.
    pub continuation: Option<Transition>,
}

/// Drives one execution against a world.
#[derive(Debug)]
pub struct ExecutionHarness {
    world: World,
    execution: CommandExecution,
    calls: u64,
    finished: bool,
    sub_executions: Vec<SubExecution>,
}

impl ExecutionHarness {
    /// Wrap a world and an execution built against it.
    #[must_use]
    pub fn new(world: World, execution: CommandExecution) -> Self {
        Self {
            world,
            execution,
            calls: 0,
            finished: false,
            sub_executions: Vec::new(),
        }
    }

    /// Advance one tick. Returns `true` once the execution has finished;
    /// further calls do nothing.
    pub fn step(&mut self) -> bool {
        if self.finished {
            return true;
        }
        self.calls += 1;
        let mut requests = Vec::new();
        self.finished = self
            .execution
            .continue_step(&mut self.world, HARNESS_EXECUTION, &mut requests);
        self.sub_executions.extend(requests);
        self.world.advance();
        self.finished
    }

    /// Step until the execution finishes or `max_ticks` have passed.
    pub fn run(&mut self, max_ticks: u64) -> DriveReport {
        for _ in 0..max_ticks {
            if self.step() {
                break;
            }
        }
        let continuation = if self.finished {
            self.execution
                .continuation(&mut self.world, HARNESS_EXECUTION)
        } else {
            None
        };
        tracing::trace!(calls = self.calls, finished = self.finished, "Harness run done");
        DriveReport {
            calls: self.calls,
            finished: self.finished,
            sub_executions: self.sub_executions.clone(),
            continuation,
        }
    }

    /// The world.
    #[must_use]
    pub const fn world(&self) -> &World {
        &self.world
    }

    /// The world, mutably, e.g. to change a recipient between ticks.
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    /// The driven execution.
    #[must_use]
    pub const fn execution(&self) -> &CommandExecution {
        &self.execution
    }

    /// Remove a recipient from the execution, as a newer order would.
    pub fn detach(&mut self, id: EntityId) -> bool {
        self.execution.remove_recipient(id)
    }

    /// Number of `continue_step` calls so far.
    #[must_use]
    pub const fn calls(&self) -> u64 {
        self.calls
    }
}
