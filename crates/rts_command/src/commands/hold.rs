use crate::cell::{CellStore, ValueCell};
use crate::entity::EntityId;
use crate::execution::{ExecutionBehavior, ExecutionContext};

use super::for_each_recipient;

/// Stay in place and fire at enemies inside weapon range. Never finishes.
#[derive(Debug)]
pub struct HoldExecution {
    engaged: ValueCell<Option<EntityId>>,
}

impl HoldExecution {
    /// Declare cells and build the behavior.
    pub fn new(cells: &mut CellStore) -> Self {
        Self {
            engaged: cells.declare("engaged", None),
        }
    }
}

impl ExecutionBehavior for HoldExecution {
    fn initialize(&mut self, ctx: &mut ExecutionContext<'_>) {
        for_each_recipient(ctx, |entity| entity.halt());
    }

    fn continue_step(&mut self, ctx: &mut ExecutionContext<'_>) -> bool {
        let Some(me) = ctx.recipient() else {
            return true;
        };
        let world = ctx.world();
        let engaged = match ctx.read(self.engaged) {
            Some(target) if world.is_live(target) && world.in_weapon_range(me, target) => {
                Some(target)
            }
            _ => world
                .type_of(me)
                .and_then(|t| t.weapon)
                .and_then(|weapon| world.nearest_enemy(me, weapon.range)),
        };
        ctx.write(self.engaged, engaged);
        if let Some(entity) = ctx.world_mut().entity_mut(me) {
            entity.attack_target = engaged;
            entity.move_target = None;
        }
        false
    }

    fn label(&self) -> Option<&'static str> {
        Some("Hold")
    }
}
