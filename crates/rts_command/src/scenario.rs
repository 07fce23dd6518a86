//! Scenario: a world plus the executions driving its entities.
//!
//! The scenario is the tick driver. Each [`Scenario::step`] runs in a fixed
//! order so identical inputs give identical states:
//!
//! 1. **Dispatch** - incoming envelopes become executions
//! 2. **Continue** - every execution advances once, in ascending id order;
//!    finished ones are disposed and may chain into a follow-up order,
//!    sub-execution requests are started
//! 3. **Physics** - movement, flight transitions, combat, production
//! 4. **Cleanup** - dead entities leave their executions and the map;
//!    freshly produced armed units get a stop order
//! 5. **Tick** - the counter advances and the state hash is logged
//!
//! Executions started during a pass (chains, sub-executions) first run on
//! the next tick.

use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

use crate::config::EngineConfig;
use crate::entity::{Entity, EntityId};
use crate::envelope::CommandEnvelope;
use crate::error::{CommandError, Result};
use crate::execution::chain::{self, Transition};
use crate::execution::{CommandExecution, ExecutionId, ExecutionSnapshot, SubExecution};
use crate::executor::CommandExecutor;
use crate::math::Vec2Fixed;
use crate::player::{PlayerIndex, Race};
use crate::world::{DamageEvent, World};

/// What happened during one step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickEvents {
    /// Executions started from incoming envelopes.
    pub dispatched: Vec<ExecutionId>,
    /// Executions that finished and were disposed.
    pub finished: Vec<ExecutionId>,
    /// Executions started by chaining or as sub-executions.
    pub follow_ups: Vec<ExecutionId>,
    /// Damage dealt.
    pub damage: Vec<DamageEvent>,
    /// Entities that died and were removed.
    pub deaths: Vec<EntityId>,
    /// Entities produced.
    pub spawned: Vec<EntityId>,
}

/// A world and its live executions.
#[derive(Debug)]
pub struct Scenario {
    world: World,
    executions: BTreeMap<ExecutionId, CommandExecution>,
    next_execution: u64,
}

impl Scenario {
    /// Create an empty scenario.
    pub fn new(id: u32, config: EngineConfig) -> Result<Self> {
        Ok(Self::from_world(World::new(id, config)?))
    }

    /// Wrap an existing world. Back-references to executions are cleared.
    #[must_use]
    pub fn from_world(mut world: World) -> Self {
        for id in world.entities().ids() {
            if let Some(entity) = world.entity_mut(id) {
                entity.current_execution = None;
            }
        }
        Self {
            world,
            executions: BTreeMap::new(),
            next_execution: 1,
        }
    }

    /// Scenario id.
    #[must_use]
    pub const fn id(&self) -> u32 {
        self.world.id()
    }

    /// Current tick.
    #[must_use]
    pub const fn tick(&self) -> u64 {
        self.world.tick()
    }

    /// The world.
    #[must_use]
    pub const fn world(&self) -> &World {
        &self.world
    }

    /// The world, mutably.
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    /// Add a player slot.
    pub fn add_player(&mut self, index: PlayerIndex, race: Race, start_location: Vec2Fixed) {
        self.world.add_player(index, race, start_location);
    }

    /// Spawn an entity.
    pub fn spawn(
        &mut self,
        element_type: &str,
        owner: PlayerIndex,
        position: Vec2Fixed,
    ) -> Result<EntityId> {
        self.world.spawn(element_type, owner, position)
    }

    /// Get an execution.
    #[must_use]
    pub fn execution(&self, id: ExecutionId) -> Option<&CommandExecution> {
        self.executions.get(&id)
    }

    /// Get an execution mutably, e.g. to roll it back to a snapshot.
    pub fn execution_mut(&mut self, id: ExecutionId) -> Option<&mut CommandExecution> {
        self.executions.get_mut(&id)
    }

    /// Execution currently driving an entity.
    #[must_use]
    pub fn execution_of(&self, entity: EntityId) -> Option<ExecutionId> {
        self.world.entity(entity).and_then(|e| e.current_execution)
    }

    /// Number of live executions.
    #[must_use]
    pub fn execution_count(&self) -> usize {
        self.executions.len()
    }

    /// Ids of live executions, ascending.
    #[must_use]
    pub fn execution_ids(&self) -> Vec<ExecutionId> {
        self.executions.keys().copied().collect()
    }

    /// Register an execution and make it the current one of its recipients.
    ///
    /// Recipients are taken away from whatever execution drove them before.
    pub fn start_execution(&mut self, execution: CommandExecution) -> Result<ExecutionId> {
        if execution.scenario_id() != self.world.id() {
            return Err(CommandError::ForeignScenario {
                expected: execution.scenario_id(),
                actual: self.world.id(),
            });
        }
        let recipients = execution.recipients();
        if let Some(&missing) = recipients.iter().find(|&&r| self.world.entity(r).is_none()) {
            return Err(CommandError::RecipientNotInScenario(missing));
        }

        let id = ExecutionId(self.next_execution);
        self.next_execution += 1;
        for &recipient in &recipients {
            self.detach(recipient);
            if let Some(entity) = self.world.entity_mut(recipient) {
                entity.current_execution = Some(id);
            }
        }
        tracing::trace!(%id, label = ?execution.label(), ?recipients, "Execution started");
        self.executions.insert(id, execution);
        Ok(id)
    }

    /// Remove an entity from the map, detaching it from its execution first.
    pub fn remove_entity(&mut self, id: EntityId) -> Option<Entity> {
        self.detach(id);
        self.world.despawn(id)
    }

    /// Take an entity away from its current execution.
    fn detach(&mut self, entity: EntityId) {
        let Some(previous) = self.world.entity_mut(entity).and_then(|e| e.current_execution.take())
        else {
            return;
        };
        if let Some(execution) = self.executions.get_mut(&previous) {
            execution.remove_recipient(entity);
            tracing::trace!(%previous, entity, "Recipient detached");
        }
    }

    /// Advance the scenario by one tick.
    pub fn step(&mut self, executor: &CommandExecutor, incoming: &[CommandEnvelope]) -> TickEvents {
        let mut events = TickEvents::default();

        for envelope in incoming {
            match executor.start_execution(self, envelope) {
                Ok(ids) => events.dispatched.extend(ids),
                Err(error) => tracing::warn!(%error, "Failed to dispatch command"),
            }
        }

        self.continue_executions(&mut events);

        let physics = self.world.advance();
        events.damage = physics.damage;
        for &dead in &physics.deaths {
            self.remove_entity(dead);
        }
        events.deaths = physics.deaths;

        for &unit in &physics.spawned {
            let armed = self.world.type_of(unit).is_some_and(|t| t.weapon.is_some());
            if armed {
                if let Some(id) = self.start_transition(Transition::Stop, vec![unit]) {
                    events.follow_ups.push(id);
                }
            }
        }
        events.spawned = physics.spawned;

        self.world.increment_tick();

        #[cfg(feature = "debug-validation")]
        self.validate_back_references();

        #[cfg(debug_assertions)]
        {
            let hash = self.state_hash();
            tracing::debug!(tick = self.tick(), state_hash = hash, "Scenario state hash");
        }

        events
    }

    fn continue_executions(&mut self, events: &mut TickEvents) {
        let mut requests: Vec<SubExecution> = Vec::new();

        for id in self.execution_ids() {
            let Some(mut execution) = self.executions.remove(&id) else {
                continue;
            };
            if execution.continue_step(&mut self.world, id, &mut requests) {
                let transition = execution.continuation(&mut self.world, id);
                let recipients = self.dispose(id, &mut execution);
                events.finished.push(id);
                if let Some(transition) = transition {
                    if let Some(next) = self.start_transition(transition, recipients) {
                        tracing::trace!(%id, %next, ?transition, "Chained");
                        events.follow_ups.push(next);
                    }
                }
            } else {
                self.executions.insert(id, execution);
            }

            for request in requests.drain(..) {
                if let Some(sub) = self.start_transition(request.transition, request.recipients) {
                    events.follow_ups.push(sub);
                }
            }
        }
    }

    /// Release a finished execution's recipients. Returns those still live.
    fn dispose(&mut self, id: ExecutionId, execution: &mut CommandExecution) -> Vec<EntityId> {
        let recipients = execution.dispose();
        for &recipient in &recipients {
            if let Some(entity) = self.world.entity_mut(recipient) {
                if entity.current_execution == Some(id) {
                    entity.current_execution = None;
                }
            }
        }
        recipients
            .into_iter()
            .filter(|&r| self.world.is_live(r))
            .collect()
    }

    /// Start a follow-up order for the live part of `recipients`.
    fn start_transition(
        &mut self,
        transition: Transition,
        recipients: Vec<EntityId>,
    ) -> Option<ExecutionId> {
        let live: Vec<EntityId> = recipients
            .into_iter()
            .filter(|&r| self.world.is_live(r))
            .collect();
        if live.is_empty() {
            return None;
        }
        let started = chain::instantiate(transition, &self.world, &live)
            .and_then(|execution| self.start_execution(execution));
        match started {
            Ok(id) => Some(id),
            Err(error) => {
                tracing::warn!(%error, ?transition, "Dropped follow-up order");
                None
            }
        }
    }

    /// Hash of the world and every execution's cells.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.world.hash_into(&mut hasher);
        self.executions.len().hash(&mut hasher);
        for (id, execution) in &self.executions {
            id.hash(&mut hasher);
            execution.cells().hash_into(&mut hasher);
        }
        hasher.finish()
    }

    /// Flat records of every live execution, ascending by id.
    #[must_use]
    pub fn execution_snapshots(&self) -> Vec<ExecutionSnapshot> {
        self.executions
            .iter()
            .map(|(id, execution)| execution.snapshot(*id))
            .collect()
    }

    #[cfg(feature = "debug-validation")]
    fn validate_back_references(&self) {
        for entity in self.world.entities().iter() {
            if let Some(id) = entity.current_execution {
                let held = self
                    .executions
                    .get(&id)
                    .is_some_and(|execution| execution.has_recipient(entity.id));
                assert!(held, "entity {} points at {id} which does not hold it", entity.id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::StopExecution;

    fn scenario() -> Scenario {
        let mut scenario = Scenario::new(11, EngineConfig::default()).unwrap();
        scenario.add_player(PlayerIndex(0), Race::Terran, Vec2Fixed::ZERO);
        scenario.add_player(PlayerIndex(1), Race::Terran, Vec2Fixed::ZERO);
        scenario
    }

    #[test]
    fn test_foreign_execution_rejected() {
        let mut other = Scenario::new(12, EngineConfig::default()).unwrap();
        other.add_player(PlayerIndex(0), Race::Terran, Vec2Fixed::ZERO);
        let unit = other.spawn("Marine", PlayerIndex(0), Vec2Fixed::ZERO).unwrap();
        let execution = CommandExecution::new(other.world(), &[unit], StopExecution::new).unwrap();

        let mut scenario = scenario();
        scenario.spawn("Marine", PlayerIndex(0), Vec2Fixed::ZERO).unwrap();
        assert!(matches!(
            scenario.start_execution(execution),
            Err(CommandError::ForeignScenario {
                expected: 12,
                actual: 11
            })
        ));
    }

    #[test]
    fn test_new_execution_supersedes_old() {
        let mut scenario = scenario();
        let unit = scenario.spawn("Marine", PlayerIndex(0), Vec2Fixed::ZERO).unwrap();

        let first = CommandExecution::new(scenario.world(), &[unit], StopExecution::new).unwrap();
        let first = scenario.start_execution(first).unwrap();
        let second = CommandExecution::new(scenario.world(), &[unit], StopExecution::new).unwrap();
        let second = scenario.start_execution(second).unwrap();

        assert_eq!(scenario.execution_of(unit), Some(second));
        assert!(scenario.execution(first).unwrap().recipients().is_empty());
        assert!(scenario.execution(second).unwrap().has_recipient(unit));
    }

    #[test]
    fn test_emptied_execution_is_disposed_next_step() {
        let mut scenario = scenario();
        let executor = CommandExecutor::new();
        let unit = scenario.spawn("Marine", PlayerIndex(0), Vec2Fixed::ZERO).unwrap();
        let execution = CommandExecution::new(scenario.world(), &[unit], StopExecution::new).unwrap();
        let id = scenario.start_execution(execution).unwrap();

        scenario.remove_entity(unit);
        let events = scenario.step(&executor, &[]);
        assert_eq!(events.finished, vec![id]);
        assert_eq!(scenario.execution_count(), 0);
    }

    #[test]
    fn test_unarmed_stop_finishes_without_chain() {
        let mut scenario = scenario();
        let executor = CommandExecutor::new();
        let cc = scenario
            .spawn("CommandCenter", PlayerIndex(0), Vec2Fixed::ZERO)
            .unwrap();
        let execution = CommandExecution::new(scenario.world(), &[cc], StopExecution::new).unwrap();
        scenario.start_execution(execution).unwrap();

        let events = scenario.step(&executor, &[]);
        assert_eq!(events.finished.len(), 1);
        assert!(events.follow_ups.is_empty());
        assert_eq!(scenario.execution_of(cc), None);
    }

    #[test]
    fn test_tick_advances_and_hash_changes() {
        let mut scenario = scenario();
        let executor = CommandExecutor::new();
        let before = scenario.state_hash();
        scenario.step(&executor, &[]);
        assert_eq!(scenario.tick(), 1);
        assert_ne!(scenario.state_hash(), before);
    }
}
