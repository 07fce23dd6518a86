use crate::cell::{CellStore, ValueCell};
use crate::execution::{ExecutionBehavior, ExecutionContext, Transition};
use crate::math::Vec2Fixed;

use super::spot_enemy;

/// Shuttle between the starting position and a waypoint, breaking off to
/// attack any enemy spotted. Never finishes on its own.
#[derive(Debug)]
pub struct PatrolExecution {
    origin: ValueCell<Vec2Fixed>,
    waypoint: ValueCell<Vec2Fixed>,
    outbound: ValueCell<bool>,
}

impl PatrolExecution {
    /// Declare cells and build the behavior.
    pub fn new(cells: &mut CellStore, waypoint: Vec2Fixed) -> Self {
        Self {
            origin: cells.declare("origin", Vec2Fixed::ZERO),
            waypoint: cells.declare("waypoint", waypoint),
            outbound: cells.declare("outbound", true),
        }
    }

    fn leg_target(&self, ctx: &ExecutionContext<'_>) -> Vec2Fixed {
        if ctx.read(self.outbound) {
            ctx.read(self.waypoint)
        } else {
            ctx.read(self.origin)
        }
    }
}

impl ExecutionBehavior for PatrolExecution {
    fn initialize(&mut self, ctx: &mut ExecutionContext<'_>) {
        if let Some(position) = ctx.recipient_entity().map(|e| e.position) {
            ctx.write(self.origin, position);
        }
        let waypoint = ctx.read(self.waypoint);
        if let Some(entity) = ctx.recipient_entity_mut() {
            entity.attack_target = None;
            entity.move_target = Some(waypoint);
        }
    }

    fn continue_step(&mut self, ctx: &mut ExecutionContext<'_>) -> bool {
        let Some(me) = ctx.recipient() else {
            return true;
        };
        if let Some(enemy) = spot_enemy(ctx.world(), me) {
            ctx.start_sub_execution(me, Transition::Attack { target: enemy });
            return false;
        }

        let threshold = ctx.world().config().arrival_threshold;
        let mut target = self.leg_target(ctx);
        let arrived = ctx
            .world()
            .entity(me)
            .is_some_and(|e| e.position.within(target, threshold));
        if arrived {
            let outbound = ctx.read(self.outbound);
            ctx.write(self.outbound, !outbound);
            target = self.leg_target(ctx);
            tracing::trace!(id = %ctx.execution_id(), outbound = !outbound, "Patrol leg complete");
        }
        if let Some(entity) = ctx.world_mut().entity_mut(me) {
            entity.move_target = Some(target);
        }
        false
    }

    fn label(&self) -> Option<&'static str> {
        Some("Patrol")
    }
}
