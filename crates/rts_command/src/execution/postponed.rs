//! Postponement of commands issued to buildings in flight transition.
//!
//! A command given to an entity that is taking off or landing cannot start
//! yet. [`Postponed`] wraps any behavior and holds back its initialization
//! until the entity settles:
//!
//! | Recipient status        | Effect                                    |
//! |-------------------------|-------------------------------------------|
//! | `Fixed`                 | cancelled, finishes with no side effects  |
//! | `TakingOff` / `Landing` | waits, status re-checked every tick       |
//! | `OnGround` / `InAir`    | inner behavior initializes and runs       |

use crate::cell::{CellKind, CellStore, CellType, CellValue, ValueCell};
use crate::entity::MotionStatus;
use crate::execution::{ExecutionBehavior, ExecutionContext, Transition};

/// Decision taken for a recipient's motion status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    /// Drop the command.
    Cancel,
    /// Check again next tick.
    Wait,
    /// Start the wrapped command.
    Proceed,
}

/// Gate decision for a motion status.
#[must_use]
pub const fn gate(status: MotionStatus) -> Gate {
    match status {
        MotionStatus::Fixed => Gate::Cancel,
        MotionStatus::TakingOff | MotionStatus::Landing => Gate::Wait,
        MotionStatus::OnGround | MotionStatus::InAir => Gate::Proceed,
    }
}

/// Where a postponed command stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PostponeState {
    /// Not yet checked.
    Pending,
    /// Waiting for the recipient to finish a flight transition.
    WaitingForTransition,
    /// Wrapped behavior initialized and running.
    Ready,
    /// Dropped without effect.
    Cancelled,
}

impl CellType for PostponeState {
    const KIND: CellKind = CellKind::Int;

    fn into_value(self) -> CellValue {
        CellValue::Int(match self {
            Self::Pending => 0,
            Self::WaitingForTransition => 1,
            Self::Ready => 2,
            Self::Cancelled => 3,
        })
    }

    fn from_value(value: &CellValue) -> Option<Self> {
        match value {
            CellValue::Int(0) => Some(Self::Pending),
            CellValue::Int(1) => Some(Self::WaitingForTransition),
            CellValue::Int(2) => Some(Self::Ready),
            CellValue::Int(3) => Some(Self::Cancelled),
            _ => None,
        }
    }
}

/// Wraps a behavior so it only starts once the recipient is out of a
/// flight transition.
#[derive(Debug)]
pub struct Postponed<B> {
    state: ValueCell<PostponeState>,
    inner: B,
}

impl<B: ExecutionBehavior> Postponed<B> {
    /// Wrap `inner`, declaring the wrapper's cell after the inner ones.
    pub fn new(cells: &mut CellStore, inner: B) -> Self {
        Self {
            state: cells.declare("postponement", PostponeState::Pending),
            inner,
        }
    }

    /// Wrapped behavior.
    pub const fn inner(&self) -> &B {
        &self.inner
    }

    fn evaluate(&mut self, ctx: &mut ExecutionContext<'_>) -> PostponeState {
        let status = ctx.recipient_entity().map(|e| e.motion);
        let next = match status.map(gate) {
            None | Some(Gate::Cancel) => PostponeState::Cancelled,
            Some(Gate::Wait) => PostponeState::WaitingForTransition,
            Some(Gate::Proceed) => {
                self.inner.initialize(ctx);
                PostponeState::Ready
            }
        };
        ctx.write(self.state, next);
        tracing::trace!(id = %ctx.execution_id(), ?status, ?next, "Postponement check");
        next
    }
}

impl<B: ExecutionBehavior> ExecutionBehavior for Postponed<B> {
    fn initialize(&mut self, ctx: &mut ExecutionContext<'_>) {
        self.evaluate(ctx);
    }

    fn continue_step(&mut self, ctx: &mut ExecutionContext<'_>) -> bool {
        let state = match ctx.read(self.state) {
            PostponeState::Pending | PostponeState::WaitingForTransition => self.evaluate(ctx),
            settled => settled,
        };
        match state {
            PostponeState::Ready => self.inner.continue_step(ctx),
            PostponeState::Cancelled => true,
            PostponeState::Pending | PostponeState::WaitingForTransition => false,
        }
    }

    fn continuation(&self, ctx: &ExecutionContext<'_>) -> Option<Transition> {
        match ctx.read(self.state) {
            PostponeState::Ready => self.inner.continuation(ctx),
            _ => None,
        }
    }

    fn label(&self) -> Option<&'static str> {
        self.inner.label()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gate_table() {
        assert_eq!(gate(MotionStatus::Fixed), Gate::Cancel);
        assert_eq!(gate(MotionStatus::TakingOff), Gate::Wait);
        assert_eq!(gate(MotionStatus::Landing), Gate::Wait);
        assert_eq!(gate(MotionStatus::InAir), Gate::Proceed);
        assert_eq!(gate(MotionStatus::OnGround), Gate::Proceed);
    }

    #[test]
    fn test_state_cell_values() {
        for state in [
            PostponeState::Pending,
            PostponeState::WaitingForTransition,
            PostponeState::Ready,
            PostponeState::Cancelled,
        ] {
            assert_eq!(PostponeState::from_value(&state.into_value()), Some(state));
        }
        assert_eq!(PostponeState::from_value(&CellValue::Int(9)), None);
    }
}
