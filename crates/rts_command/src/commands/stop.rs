use crate::cell::{CellStore, ValueCell};
use crate::entity::EntityId;
use crate::execution::chain::{self, Transition};
use crate::execution::{ExecutionBehavior, ExecutionContext};

use super::{for_each_recipient, is_armed, spot_enemy};

/// Drop all orders. Armed recipients keep watching their sight range and
/// finish as soon as an enemy shows up, chaining into an attack on it.
#[derive(Debug)]
pub struct StopExecution {
    spotted: ValueCell<Option<EntityId>>,
}

impl StopExecution {
    /// Declare cells and build the behavior.
    pub fn new(cells: &mut CellStore) -> Self {
        Self {
            spotted: cells.declare("spotted", None),
        }
    }
}

impl ExecutionBehavior for StopExecution {
    fn initialize(&mut self, ctx: &mut ExecutionContext<'_>) {
        for_each_recipient(ctx, |entity| entity.halt());
    }

    fn continue_step(&mut self, ctx: &mut ExecutionContext<'_>) -> bool {
        let Some(me) = ctx.recipient() else {
            return true;
        };
        if !is_armed(ctx.world(), me) {
            return true;
        }
        let enemy = spot_enemy(ctx.world(), me);
        ctx.write(self.spotted, enemy);
        enemy.is_some()
    }

    fn continuation(&self, ctx: &ExecutionContext<'_>) -> Option<Transition> {
        let armed = ctx.recipient().is_some_and(|me| is_armed(ctx.world(), me));
        chain::after_stop_scan(armed, ctx.read(self.spotted))
    }
}
