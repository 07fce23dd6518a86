use crate::cell::{CellStore, ValueCell};
use crate::execution::{ExecutionBehavior, ExecutionContext};
use crate::math::Vec2Fixed;

use super::for_each_recipient;

/// Walk or fly to a destination, ignoring enemies.
#[derive(Debug)]
pub struct MoveExecution {
    destination: ValueCell<Vec2Fixed>,
}

impl MoveExecution {
    /// Declare cells and build the behavior.
    pub fn new(cells: &mut CellStore, destination: Vec2Fixed) -> Self {
        Self {
            destination: cells.declare("destination", destination),
        }
    }
}

impl ExecutionBehavior for MoveExecution {
    fn initialize(&mut self, ctx: &mut ExecutionContext<'_>) {
        let destination = ctx.read(self.destination);
        for_each_recipient(ctx, |entity| {
            entity.attack_target = None;
            entity.move_target = Some(destination);
        });
    }

    fn continue_step(&mut self, ctx: &mut ExecutionContext<'_>) -> bool {
        let destination = ctx.read(self.destination);
        let threshold = ctx.world().config().arrival_threshold;
        ctx.recipients()
            .into_iter()
            .filter_map(|id| ctx.world().entity(id))
            .filter(|e| e.is_live())
            .all(|e| e.position.within(destination, threshold))
    }

    fn label(&self) -> Option<&'static str> {
        Some("Move")
    }
}
