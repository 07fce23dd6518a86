use crate::cell::{CellStore, ValueCell};
use crate::entity::MotionStatus;
use crate::execution::{ExecutionBehavior, ExecutionContext};

/// Queue one unit at a building and pay for it. Finishes immediately.
#[derive(Debug)]
pub struct ProduceExecution {
    element_type: ValueCell<Option<String>>,
    queued: ValueCell<bool>,
}

impl ProduceExecution {
    /// Declare cells and build the behavior.
    pub fn new(cells: &mut CellStore, element_type: &str) -> Self {
        Self {
            element_type: cells.declare("element_type", Some(element_type.to_string())),
            queued: cells.declare("queued", false),
        }
    }
}

impl ExecutionBehavior for ProduceExecution {
    fn continue_step(&mut self, ctx: &mut ExecutionContext<'_>) -> bool {
        let Some(name) = ctx.read(self.element_type) else {
            return true;
        };
        let Some(building) = ctx.recipient_entity() else {
            return true;
        };
        let (id, owner) = (building.id, building.owner);
        let queue_len = building.production.queue.len();
        let fixed = building.motion == MotionStatus::Fixed;

        let world = ctx.world();
        let capacity = world.config().production_queue_capacity;
        let produces = world.type_of(id).is_some_and(|t| t.can_produce(&name));
        let Some((minerals, supply)) = world
            .element_type(&name)
            .map(|t| (t.mineral_cost, t.supply_cost))
        else {
            return true;
        };
        if !fixed || !produces || queue_len >= capacity {
            tracing::debug!(building = id, element_type = %name, "Production refused");
            return true;
        }

        let paid = ctx
            .world_mut()
            .player_mut(owner)
            .is_some_and(|player| player.pay(minerals, supply));
        if !paid {
            tracing::debug!(building = id, element_type = %name, "Cannot afford production");
            return true;
        }
        if let Some(building) = ctx.world_mut().entity_mut(id) {
            building.production.queue.push_back(name);
        }
        ctx.write(self.queued, true);
        true
    }
}

/// Remove the most recently queued unit and refund its cost. Finishes immediately.
#[derive(Debug)]
pub struct CancelProductionExecution {
    cancelled: ValueCell<Option<String>>,
}

impl CancelProductionExecution {
    /// Declare cells and build the behavior.
    pub fn new(cells: &mut CellStore) -> Self {
        Self {
            cancelled: cells.declare("cancelled", None),
        }
    }
}

impl ExecutionBehavior for CancelProductionExecution {
    fn continue_step(&mut self, ctx: &mut ExecutionContext<'_>) -> bool {
        let Some(building) = ctx.recipient_entity_mut() else {
            return true;
        };
        let owner = building.owner;
        let Some(name) = building.production.queue.pop_back() else {
            return true;
        };
        if building.production.queue.is_empty() {
            building.production.progress = 0;
        }

        let cost = ctx
            .world()
            .element_type(&name)
            .map(|t| (t.mineral_cost, t.supply_cost));
        if let (Some((minerals, supply)), Some(player)) = (cost, ctx.world_mut().player_mut(owner)) {
            player.refund(minerals, supply);
        }
        ctx.write(self.cancelled, Some(name));
        true
    }
}
