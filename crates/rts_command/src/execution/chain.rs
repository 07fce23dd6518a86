//! Automatic order chaining.
//!
//! A finished execution may name a follow-up order. The rules are plain
//! functions of the situation so they can be tested without a scenario:
//!
//! ```text
//! Stop ──enemy in sight──> Attack ──target gone──> Stop ──> ...
//! ```

use serde::{Deserialize, Serialize};

use crate::commands::{AttackExecution, StopExecution};
use crate::entity::EntityId;
use crate::error::Result;
use crate::execution::CommandExecution;
use crate::world::World;

/// A follow-up order, either chained after completion or started as a
/// sub-execution while a command runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Transition {
    /// Stand still and watch for enemies.
    Stop,
    /// Engage a specific enemy.
    Attack {
        /// Entity to engage.
        target: EntityId,
    },
}

/// Follow-up of a stop scan: attack the spotted enemy if the recipient can.
#[must_use]
pub fn after_stop_scan(armed: bool, enemy: Option<EntityId>) -> Option<Transition> {
    match (armed, enemy) {
        (true, Some(target)) => Some(Transition::Attack { target }),
        _ => None,
    }
}

/// Follow-up of an attack: go back to watching once the target is gone.
#[must_use]
pub fn after_attack(target_live: bool) -> Option<Transition> {
    (!target_live).then_some(Transition::Stop)
}

/// Build the execution that carries out `transition` for `recipients`.
pub fn instantiate(
    transition: Transition,
    world: &World,
    recipients: &[EntityId],
) -> Result<CommandExecution> {
    match transition {
        Transition::Stop => CommandExecution::new(world, recipients, StopExecution::new),
        Transition::Attack { target } => CommandExecution::new(world, recipients, |cells| {
            AttackExecution::new(cells, target)
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_scan_chains_to_attack_only_when_armed() {
        assert_eq!(
            after_stop_scan(true, Some(4)),
            Some(Transition::Attack { target: 4 })
        );
        assert_eq!(after_stop_scan(false, Some(4)), None);
        assert_eq!(after_stop_scan(true, None), None);
    }

    #[test]
    fn test_attack_chains_back_to_stop() {
        assert_eq!(after_attack(false), Some(Transition::Stop));
        assert_eq!(after_attack(true), None);
    }
}
