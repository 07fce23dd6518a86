//! Standard command factories and their availability rules.

use std::collections::BTreeSet;

use crate::commands::{
    AttackExecution, AttackMoveExecution, CancelProductionExecution, HoldExecution,
    LandExecution, LiftOffExecution, MoveExecution, PatrolExecution, ProduceExecution,
    StopExecution,
};
use crate::config::ElementType;
use crate::entity::{Entity, EntityId, MotionStatus};
use crate::error::Result;
use crate::execution::{CommandExecution, Postponed};
use crate::factory::{Availability, CommandExecutionFactory, DispatchRequest, FactoryKey};
use crate::formation::MagicBox;
use crate::world::World;

/// The command set every element type draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StandardCommand {
    /// Context-dependent default order (no command type).
    Smart,
    /// Move to a position.
    Move,
    /// Attack an entity or attack-move to a position.
    Attack,
    /// Drop orders and watch.
    Stop,
    /// Hold position.
    Hold,
    /// Patrol between here and a waypoint.
    Patrol,
    /// Take off.
    LiftOff,
    /// Land at a position.
    Land,
    /// Queue production.
    Produce,
    /// Cancel the last queued production.
    CancelProduction,
}

impl StandardCommand {
    /// Every standard command.
    pub const ALL: [Self; 10] = [
        Self::Smart,
        Self::Move,
        Self::Attack,
        Self::Stop,
        Self::Hold,
        Self::Patrol,
        Self::LiftOff,
        Self::Land,
        Self::Produce,
        Self::CancelProduction,
    ];

    /// Wire command type, `None` for the smart command.
    #[must_use]
    pub const fn command_type(self) -> Option<&'static str> {
        match self {
            Self::Smart => None,
            Self::Move => Some("Move"),
            Self::Attack => Some("Attack"),
            Self::Stop => Some("Stop"),
            Self::Hold => Some("Hold"),
            Self::Patrol => Some("Patrol"),
            Self::LiftOff => Some("LiftOff"),
            Self::Land => Some("Land"),
            Self::Produce => Some("Produce"),
            Self::CancelProduction => Some("CancelProduction"),
        }
    }

    /// Whether an element type supports this command at all.
    #[must_use]
    pub fn supported_by(self, element: &ElementType) -> bool {
        let armed = element.weapon.is_some();
        let mobile = element.is_mobile();
        match self {
            Self::Smart | Self::Move => mobile,
            Self::Attack => armed,
            Self::Stop => mobile || armed,
            Self::Hold => mobile && armed,
            Self::Patrol => mobile && !element.liftable,
            Self::LiftOff | Self::Land => element.liftable,
            Self::Produce | Self::CancelProduction => !element.produces.is_empty(),
        }
    }
}

/// Factory for one standard command on one element type.
#[derive(Debug)]
pub struct StandardFactory {
    key: FactoryKey,
    command: StandardCommand,
}

impl StandardFactory {
    /// Factory for `command` on entities of `entity_type`.
    pub fn new(command: StandardCommand, entity_type: &str) -> Result<Self> {
        Ok(Self {
            key: FactoryKey::new(command.command_type(), entity_type)?,
            command,
        })
    }

    /// Command served by this factory.
    #[must_use]
    pub const fn command(&self) -> StandardCommand {
        self.command
    }

    fn entity_verdict(
        &self,
        world: &World,
        entity: &Entity,
        parameter: Option<&str>,
    ) -> Availability {
        let Some(element) = world.element_type(&entity.element_type) else {
            return Availability::Unavailable;
        };
        if !self.command.supported_by(element) {
            return Availability::Unavailable;
        }
        let motion = entity.motion;
        match self.command {
            StandardCommand::Smart | StandardCommand::Move => {
                if element.liftable && motion == MotionStatus::Fixed {
                    Availability::Unavailable
                } else {
                    Availability::Enabled
                }
            }
            StandardCommand::Attack | StandardCommand::Stop | StandardCommand::Hold => {
                Availability::Enabled
            }
            StandardCommand::Patrol => Availability::Enabled,
            StandardCommand::LiftOff => match motion {
                MotionStatus::Fixed if entity.production.is_idle() => Availability::Enabled,
                MotionStatus::Fixed => Availability::Disabled,
                _ => Availability::Unavailable,
            },
            StandardCommand::Land => match motion {
                MotionStatus::InAir | MotionStatus::TakingOff => Availability::Enabled,
                _ => Availability::Unavailable,
            },
            StandardCommand::Produce => {
                let Some(produced) = parameter else {
                    return Availability::Unavailable;
                };
                if motion != MotionStatus::Fixed || !element.can_produce(produced) {
                    return Availability::Unavailable;
                }
                if entity.production.queue.len() >= world.config().production_queue_capacity {
                    Availability::Disabled
                } else {
                    Availability::Enabled
                }
            }
            StandardCommand::CancelProduction => match motion {
                MotionStatus::Fixed if !entity.production.is_idle() => Availability::Enabled,
                MotionStatus::Fixed => Availability::Disabled,
                _ => Availability::Unavailable,
            },
        }
    }

    /// Formation targets over the whole selection, so mixed groups keep their shape.
    fn formation(world: &World, request: &DispatchRequest<'_>) -> MagicBox {
        MagicBox::for_selection(world, request.selection, request.target_position)
    }

    fn per_entity<F>(world: &World, subset: &[EntityId], build: F) -> Result<Vec<CommandExecution>>
    where
        F: FnMut(EntityId) -> Result<CommandExecution>,
    {
        subset
            .iter()
            .copied()
            .filter(|&id| world.is_live(id))
            .map(build)
            .collect()
    }

    fn moves(world: &World, request: &DispatchRequest<'_>) -> Result<Vec<CommandExecution>> {
        let formation = Self::formation(world, request);
        Self::per_entity(world, request.subset, |id| {
            let target = formation.target_or(id, request.target_position);
            CommandExecution::new(world, &[id], |cells| {
                let inner = MoveExecution::new(cells, target);
                Postponed::new(cells, inner)
            })
        })
    }

    fn attacks(world: &World, request: &DispatchRequest<'_>) -> Result<Vec<CommandExecution>> {
        match request.target_entity.filter(|&t| world.is_live(t)) {
            Some(target) => Self::per_entity(world, request.subset, |id| {
                CommandExecution::new(world, &[id], |cells| AttackExecution::new(cells, target))
            }),
            None => {
                let formation = Self::formation(world, request);
                Self::per_entity(world, request.subset, |id| {
                    let target = formation.target_or(id, request.target_position);
                    CommandExecution::new(world, &[id], |cells| {
                        AttackMoveExecution::new(cells, target)
                    })
                })
            }
        }
    }

    /// Smart command: attack a targeted enemy when armed, otherwise move.
    fn smart(world: &World, request: &DispatchRequest<'_>) -> Result<Vec<CommandExecution>> {
        let armed = request
            .subset
            .first()
            .and_then(|&id| world.type_of(id))
            .is_some_and(|t| t.weapon.is_some());
        let enemy_target = request.target_entity.filter(|&target| {
            world.is_live(target)
                && request
                    .subset
                    .first()
                    .is_some_and(|&id| world.are_enemies(id, target))
        });
        match enemy_target {
            Some(target) if armed => Self::per_entity(world, request.subset, |id| {
                CommandExecution::new(world, &[id], |cells| AttackExecution::new(cells, target))
            }),
            _ => Self::moves(world, request),
        }
    }

    /// The producer with the shortest queue takes the order.
    fn produce(world: &World, request: &DispatchRequest<'_>) -> Result<Vec<CommandExecution>> {
        let Some(produced) = request.parameter else {
            return Ok(Vec::new());
        };
        let producer = request
            .subset
            .iter()
            .filter_map(|&id| world.entity(id))
            .filter(|e| e.is_live() && e.motion == MotionStatus::Fixed)
            .min_by_key(|e| (e.production.queue.len(), e.id));
        match producer {
            Some(building) => Ok(vec![CommandExecution::new(world, &[building.id], |cells| {
                ProduceExecution::new(cells, produced)
            })?]),
            None => Ok(Vec::new()),
        }
    }

    /// The building with the longest queue gives up its last item.
    fn cancel_production(
        world: &World,
        request: &DispatchRequest<'_>,
    ) -> Result<Vec<CommandExecution>> {
        let building = request
            .subset
            .iter()
            .filter_map(|&id| world.entity(id))
            .filter(|e| e.is_live() && !e.production.is_idle())
            .max_by_key(|e| (e.production.queue.len(), std::cmp::Reverse(e.id)));
        match building {
            Some(building) => Ok(vec![CommandExecution::new(
                world,
                &[building.id],
                CancelProductionExecution::new,
            )?]),
            None => Ok(Vec::new()),
        }
    }
}

impl CommandExecutionFactory for StandardFactory {
    fn key(&self) -> &FactoryKey {
        &self.key
    }

    fn availability(
        &self,
        world: &World,
        subset: &[EntityId],
        _selection: &[EntityId],
        parameter: Option<&str>,
    ) -> Availability {
        let entities: Vec<&Entity> = subset.iter().filter_map(|&id| world.entity(id)).collect();
        if entities.is_empty() {
            return Availability::Unavailable;
        }
        let verdict = Availability::combine_all(
            entities
                .iter()
                .map(|e| self.entity_verdict(world, e, parameter)),
        );

        // Production is paid from one purse and one free slot suffices.
        if self.command == StandardCommand::Produce && verdict != Availability::Unavailable {
            let any_slot = entities.iter().any(|e| {
                e.production.queue.len() < world.config().production_queue_capacity
            });
            let affordable = parameter
                .and_then(|name| world.element_type(name))
                .zip(world.player(entities[0].owner))
                .is_some_and(|(t, p)| p.can_afford(t.mineral_cost, t.supply_cost));
            return if any_slot && affordable {
                Availability::Enabled
            } else {
                Availability::Disabled
            };
        }
        verdict
    }

    fn create_executions(
        &self,
        world: &World,
        request: &DispatchRequest<'_>,
    ) -> Result<Vec<CommandExecution>> {
        let subset = request.subset;
        match self.command {
            StandardCommand::Smart => Self::smart(world, request),
            StandardCommand::Move => Self::moves(world, request),
            StandardCommand::Attack => Self::attacks(world, request),
            StandardCommand::Stop => Self::per_entity(world, subset, |id| {
                CommandExecution::new(world, &[id], StopExecution::new)
            }),
            StandardCommand::Hold => Self::per_entity(world, subset, |id| {
                CommandExecution::new(world, &[id], HoldExecution::new)
            }),
            StandardCommand::Patrol => {
                let formation = Self::formation(world, request);
                Self::per_entity(world, subset, |id| {
                    let waypoint = formation.target_or(id, request.target_position);
                    CommandExecution::new(world, &[id], |cells| PatrolExecution::new(cells, waypoint))
                })
            }
            StandardCommand::LiftOff => Self::per_entity(world, subset, |id| {
                CommandExecution::new(world, &[id], LiftOffExecution::new)
            }),
            StandardCommand::Land => Self::per_entity(world, subset, |id| {
                CommandExecution::new(world, &[id], |cells| {
                    let inner = LandExecution::new(cells, request.target_position);
                    Postponed::new(cells, inner)
                })
            }),
            StandardCommand::Produce => Self::produce(world, request),
            StandardCommand::CancelProduction => Self::cancel_production(world, request),
        }
    }
}

/// Standard factories for every command each configured element type supports.
pub fn standard_factories(element_types: &[ElementType]) -> Result<Vec<StandardFactory>> {
    let mut factories = Vec::new();
    let mut seen = BTreeSet::new();
    for element in element_types {
        if !seen.insert(element.name.as_str()) {
            continue;
        }
        for command in StandardCommand::ALL {
            if command.supported_by(element) {
                factories.push(StandardFactory::new(command, &element.name)?);
            }
        }
    }
    Ok(factories)
}
