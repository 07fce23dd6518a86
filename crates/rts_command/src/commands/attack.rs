use crate::cell::{CellStore, ValueCell};
use crate::entity::EntityId;
use crate::execution::chain::{self, Transition};
use crate::execution::{ExecutionBehavior, ExecutionContext};
use crate::math::Vec2Fixed;

use super::{for_each_recipient, spot_enemy};

/// Chase a target and fire at it until it is gone.
#[derive(Debug)]
pub struct AttackExecution {
    target: ValueCell<Option<EntityId>>,
}

impl AttackExecution {
    /// Declare cells and build the behavior.
    pub fn new(cells: &mut CellStore, target: EntityId) -> Self {
        Self {
            target: cells.declare("target", Some(target)),
        }
    }
}

impl ExecutionBehavior for AttackExecution {
    fn initialize(&mut self, ctx: &mut ExecutionContext<'_>) {
        for_each_recipient(ctx, |entity| entity.halt());
    }

    fn continue_step(&mut self, ctx: &mut ExecutionContext<'_>) -> bool {
        let target = match ctx.read(self.target) {
            Some(target) if ctx.world().is_live(target) => target,
            _ => {
                ctx.write(self.target, None);
                for_each_recipient(ctx, |entity| entity.halt());
                return true;
            }
        };
        let Some(target_position) = ctx.world().entity(target).map(|e| e.position) else {
            return true;
        };

        let recipients = ctx.recipients();
        let reachable = recipients.iter().any(|&id| {
            ctx.world().in_weapon_range(id, target)
                || ctx.world().type_of(id).is_some_and(|t| t.is_mobile())
        });
        if !reachable {
            tracing::trace!(target, "Attack target out of reach of immobile recipients");
            ctx.write(self.target, None);
            for_each_recipient(ctx, |entity| entity.halt());
            return true;
        }

        for id in recipients {
            let in_range = ctx.world().in_weapon_range(id, target);
            let mobile = ctx.world().type_of(id).is_some_and(|t| t.is_mobile());
            if let Some(entity) = ctx.world_mut().entity_mut(id) {
                entity.attack_target = Some(target);
                entity.move_target = if in_range || !mobile {
                    None
                } else {
                    Some(target_position)
                };
            }
        }
        false
    }

    fn continuation(&self, ctx: &ExecutionContext<'_>) -> Option<Transition> {
        let live = ctx
            .read(self.target)
            .is_some_and(|target| ctx.world().is_live(target));
        chain::after_attack(live)
    }

    fn label(&self) -> Option<&'static str> {
        Some("Attack")
    }
}

/// Move to a position, breaking off to engage any enemy spotted on the way.
///
/// Recipients that spot an enemy are handed to an attack sub-execution; the
/// rest keep going. Finishes when every remaining recipient has arrived.
#[derive(Debug)]
pub struct AttackMoveExecution {
    destination: ValueCell<Vec2Fixed>,
}

impl AttackMoveExecution {
    /// Declare cells and build the behavior.
    pub fn new(cells: &mut CellStore, destination: Vec2Fixed) -> Self {
        Self {
            destination: cells.declare("destination", destination),
        }
    }
}

impl ExecutionBehavior for AttackMoveExecution {
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
        let mut all_arrived = true;

        for id in ctx.recipients() {
            if !ctx.world().is_live(id) {
                continue;
            }
            if let Some(enemy) = spot_enemy(ctx.world(), id) {
                ctx.start_sub_execution(id, Transition::Attack { target: enemy });
                all_arrived = false;
                continue;
            }
            let arrived = ctx
                .world()
                .entity(id)
                .is_some_and(|e| e.position.within(destination, threshold));
            all_arrived &= arrived;
        }
        all_arrived
    }

    fn continuation(&self, _ctx: &ExecutionContext<'_>) -> Option<Transition> {
        Some(Transition::Stop)
    }

    fn label(&self) -> Option<&'static str> {
        Some("Attack")
    }
}
