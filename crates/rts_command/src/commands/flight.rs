use crate::cell::{CellStore, ValueCell};
use crate::entity::MotionStatus;
use crate::execution::{ExecutionBehavior, ExecutionContext};
use crate::math::Vec2Fixed;

/// Lift a landed building into the air.
///
/// Only buildings that are `Fixed` and idle take off; the execution then
/// waits until every one of them is airborne.
#[derive(Debug)]
pub struct LiftOffExecution {
    started: ValueCell<bool>,
}

impl LiftOffExecution {
    /// Declare cells and build the behavior.
    pub fn new(cells: &mut CellStore) -> Self {
        Self {
            started: cells.declare("started", false),
        }
    }
}

impl ExecutionBehavior for LiftOffExecution {
    fn initialize(&mut self, ctx: &mut ExecutionContext<'_>) {
        let ticks = ctx.world().config().takeoff_ticks;
        let mut started = false;
        for id in ctx.recipients() {
            let Some(entity) = ctx.world_mut().entity_mut(id) else {
                continue;
            };
            if entity.motion == MotionStatus::Fixed && entity.production.is_idle() {
                entity.halt();
                entity.motion = MotionStatus::TakingOff;
                entity.transition_ticks = ticks;
                started = true;
            }
        }
        ctx.write(self.started, started);
    }

    fn continue_step(&mut self, ctx: &mut ExecutionContext<'_>) -> bool {
        if !ctx.read(self.started) {
            return true;
        }
        ctx.recipients()
            .into_iter()
            .filter_map(|id| ctx.world().entity(id))
            .all(|e| e.motion != MotionStatus::TakingOff)
    }

    fn label(&self) -> Option<&'static str> {
        Some("LiftOff")
    }
}

/// Fly to a landing spot and touch down. Usually wrapped in
/// [`Postponed`](crate::execution::Postponed) so it can be issued mid-take-off.
#[derive(Debug)]
pub struct LandExecution {
    spot: ValueCell<Vec2Fixed>,
    touching_down: ValueCell<bool>,
}

impl LandExecution {
    /// Declare cells and build the behavior.
    pub fn new(cells: &mut CellStore, spot: Vec2Fixed) -> Self {
        Self {
            spot: cells.declare("spot", spot),
            touching_down: cells.declare("touching_down", false),
        }
    }
}

impl ExecutionBehavior for LandExecution {
    fn initialize(&mut self, ctx: &mut ExecutionContext<'_>) {
        let spot = ctx.read(self.spot);
        if let Some(entity) = ctx.recipient_entity_mut() {
            entity.attack_target = None;
            entity.move_target = Some(spot);
        }
    }

    fn continue_step(&mut self, ctx: &mut ExecutionContext<'_>) -> bool {
        let Some(entity) = ctx.recipient_entity() else {
            return true;
        };
        let motion = entity.motion;
        if ctx.read(self.touching_down) {
            return matches!(motion, MotionStatus::Fixed | MotionStatus::OnGround);
        }
        if motion != MotionStatus::InAir {
            return false;
        }

        let spot = ctx.read(self.spot);
        let threshold = ctx.world().config().arrival_threshold;
        let ticks = ctx.world().config().landing_ticks;
        let over_spot = entity.position.within(spot, threshold);
        let Some(entity) = ctx.recipient_entity_mut() else {
            return true;
        };
        if over_spot {
            entity.position = spot;
            entity.move_target = None;
            entity.motion = MotionStatus::Landing;
            entity.transition_ticks = ticks;
            ctx.write(self.touching_down, true);
        } else {
            entity.move_target = Some(spot);
        }
        false
    }

    fn label(&self) -> Option<&'static str> {
        Some("Land")
    }
}
