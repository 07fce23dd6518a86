//! Standard command behaviors.
//!
//! Each behavior declares its cells when built and steers recipients only
//! through move targets, attack targets, motion status and production
//! queues. The world's physics pass does the rest.

mod attack;
mod flight;
mod hold;
mod move_to;
mod patrol;
mod production;
mod stop;

pub use attack::{AttackExecution, AttackMoveExecution};
pub use flight::{LandExecution, LiftOffExecution};
pub use hold::HoldExecution;
pub use move_to::MoveExecution;
pub use patrol::PatrolExecution;
pub use production::{CancelProductionExecution, ProduceExecution};
pub use stop::StopExecution;

use crate::entity::{Entity, EntityId};
use crate::execution::ExecutionContext;
use crate::world::World;

/// Nearest enemy an armed entity can see. `None` for unarmed entities.
///
/// Immobile entities only look as far as they can shoot.
fn spot_enemy(world: &World, id: EntityId) -> Option<EntityId> {
    let element = world.type_of(id)?;
    let weapon = element.weapon?;
    let radius = if element.is_mobile() {
        element.sight_range
    } else {
        element.sight_range.min(weapon.range)
    };
    world.nearest_enemy(id, radius)
}

/// Whether an entity's type carries a weapon.
fn is_armed(world: &World, id: EntityId) -> bool {
    world.type_of(id).is_some_and(|t| t.weapon.is_some())
}

/// Apply `f` to every recipient still in the world.
fn for_each_recipient<F>(ctx: &mut ExecutionContext<'_>, mut f: F)
where
    F: FnMut(&mut Entity),
{
    for id in ctx.recipients() {
        if let Some(entity) = ctx.world_mut().entity_mut(id) {
            f(entity);
        }
    }
}
