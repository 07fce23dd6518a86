//! Command dispatch: resolving a selection, checking availability across
//! element types and handing executions to the scenario.
//!
//! The executor is a plain registry object passed by reference. It owns
//! the factories (keyed by command type and entity type) and the per-race
//! player initializers.
//!
//! A selection is only dispatched when every element type in it is
//! covered by a factory and the combined verdict is `Enabled`. A partially
//! covered selection gets nothing, matching the `Unavailable` verdict the
//! UI shows for it.

use std::collections::{BTreeMap, BTreeSet};

use crate::config::EngineConfig;
use crate::entity::EntityId;
use crate::envelope::CommandEnvelope;
use crate::error::{CommandError, Result};
use crate::execution::{CommandExecution, ExecutionId};
use crate::factories::standard_factories;
use crate::factory::{Availability, CommandExecutionFactory, DispatchRequest, FactoryKey};
use crate::math::Vec2Fixed;
use crate::player::{PlayerIndex, Race};
use crate::scenario::Scenario;
use crate::world::World;

/// Sets up a freshly joined player: starting units, resources.
pub type PlayerInitializer = Box<dyn Fn(&mut Scenario, PlayerIndex) -> Result<()>>;

/// Number of workers a Terran player starts with.
const STARTING_WORKERS: i32 = 4;

/// Registry of command factories and player initializers.
#[derive(Default)]
pub struct CommandExecutor {
    factories: BTreeMap<FactoryKey, Box<dyn CommandExecutionFactory>>,
    initializers: BTreeMap<Race, PlayerInitializer>,
}

impl std::fmt::Debug for CommandExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandExecutor")
            .field("factories", &self.factories.keys().collect::<Vec<_>>())
            .field("initializers", &self.initializers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl CommandExecutor {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the standard factories for every element type of
    /// `config` and the Terran player initializer.
    pub fn standard(config: &EngineConfig) -> Result<Self> {
        let mut executor = Self::new();
        for factory in standard_factories(&config.element_types)? {
            executor.register_factory(factory)?;
        }
        executor.register_player_initializer(Race::Terran, initialize_terran)?;
        tracing::debug!(factories = executor.factories.len(), "Standard command executor ready");
        Ok(executor)
    }

    /// Register a factory. Fails if its key is already taken.
    pub fn register_factory<F>(&mut self, factory: F) -> Result<()>
    where
        F: CommandExecutionFactory + 'static,
    {
        let key = factory.key().clone();
        if self.factories.contains_key(&key) {
            return Err(CommandError::DuplicateFactory {
                command_type: key.command_type().map(str::to_string),
                entity_type: key.entity_type().to_string(),
            });
        }
        self.factories.insert(key, Box::new(factory));
        Ok(())
    }

    /// Register the initializer for a race. Fails if one exists.
    pub fn register_player_initializer<F>(&mut self, race: Race, initializer: F) -> Result<()>
    where
        F: Fn(&mut Scenario, PlayerIndex) -> Result<()> + 'static,
    {
        if self.initializers.contains_key(&race) {
            return Err(CommandError::DuplicatePlayerInitializer(race));
        }
        self.initializers.insert(race, Box::new(initializer));
        Ok(())
    }

    /// Number of registered factories.
    #[must_use]
    pub fn factory_count(&self) -> usize {
        self.factories.len()
    }

    /// Whether a factory exists for the key.
    #[must_use]
    pub fn has_factory(&self, command_type: Option<&str>, entity_type: &str) -> bool {
        FactoryKey::new(command_type, entity_type)
            .is_ok_and(|key| self.factories.contains_key(&key))
    }

    /// Verdict for issuing a command to `entity_ids`.
    ///
    /// Stale and detached ids are ignored. No live entity, or any element
    /// type without a factory, gives `Unavailable`.
    #[must_use]
    pub fn command_availability(
        &self,
        scenario: &Scenario,
        command_type: Option<&str>,
        parameter: Option<&str>,
        entity_ids: &[EntityId],
    ) -> Availability {
        let world = scenario.world();
        let selection = resolve(world, entity_ids);
        match self.cover(world, command_type, &selection) {
            Some(groups) => self.verdict(world, &groups, &selection, parameter),
            None => Availability::Unavailable,
        }
    }

    /// Dispatch an envelope: build executions and register them with the scenario.
    ///
    /// Returns the ids of the started executions, empty when nothing was dispatched.
    pub fn start_execution(
        &self,
        scenario: &mut Scenario,
        envelope: &CommandEnvelope,
    ) -> Result<Vec<ExecutionId>> {
        let command_type = envelope.command_type();
        let parameter = envelope.parameter();
        let world = scenario.world();
        let selection = resolve(world, envelope.recipients());

        let Some(groups) = self.cover(world, command_type, &selection) else {
            tracing::debug!(
                command = ?command_type,
                recipients = ?envelope.recipients(),
                "Selection not fully covered by factories, nothing dispatched"
            );
            return Ok(Vec::new());
        };
        let verdict = self.verdict(world, &groups, &selection, parameter);
        if verdict != Availability::Enabled {
            tracing::debug!(command = ?command_type, ?verdict, "Command not enabled, nothing dispatched");
            return Ok(Vec::new());
        }

        let mut executions: Vec<CommandExecution> = Vec::new();
        for (factory, subset) in &groups {
            let request = DispatchRequest {
                subset,
                selection: &selection,
                target_position: envelope.target_position(),
                target_entity: envelope.target_entity(),
                parameter,
            };
            executions.extend(factory.create_executions(world, &request)?);
        }

        let mut started = Vec::with_capacity(executions.len());
        for execution in executions {
            started.push(scenario.start_execution(execution)?);
        }
        tracing::debug!(
            command = ?command_type,
            executions = started.len(),
            "Command dispatched"
        );
        Ok(started)
    }

    /// Labels of the commands the given entities are running.
    #[must_use]
    pub fn commands_being_executed(
        &self,
        scenario: &Scenario,
        entity_ids: &[EntityId],
    ) -> BTreeSet<String> {
        let world = scenario.world();
        resolve(world, entity_ids)
            .into_iter()
            .filter_map(|id| world.entity(id).and_then(|e| e.current_execution))
            .filter_map(|exec| scenario.execution(exec).and_then(CommandExecution::label))
            .map(str::to_string)
            .collect()
    }

    /// Run the initializer registered for the player's race.
    pub fn initialize_player(&self, scenario: &mut Scenario, player: PlayerIndex) -> Result<()> {
        let race = scenario
            .world()
            .player(player)
            .map(|p| p.race)
            .ok_or(CommandError::UnknownPlayer(player))?;
        let initializer = self
            .initializers
            .get(&race)
            .ok_or(CommandError::MissingPlayerInitializer(race))?;
        tracing::debug!(?player, ?race, "Initializing player");
        initializer(scenario, player)
    }

    /// Group the selection by element type and look up a factory for each.
    /// `None` when the selection is empty or any type is uncovered.
    fn cover<'a>(
        &'a self,
        world: &World,
        command_type: Option<&str>,
        selection: &[EntityId],
    ) -> Option<Vec<(&'a dyn CommandExecutionFactory, Vec<EntityId>)>> {
        if selection.is_empty() {
            return None;
        }
        let mut by_type: BTreeMap<&str, Vec<EntityId>> = BTreeMap::new();
        for &id in selection {
            let entity = world.entity(id)?;
            by_type.entry(entity.element_type.as_str()).or_default().push(id);
        }
        by_type
            .into_iter()
            .map(|(entity_type, subset)| {
                let key = FactoryKey::new(command_type, entity_type).ok()?;
                let factory = self.factories.get(&key)?;
                Some((factory.as_ref(), subset))
            })
            .collect()
    }

    fn verdict(
        &self,
        world: &World,
        groups: &[(&dyn CommandExecutionFactory, Vec<EntityId>)],
        selection: &[EntityId],
        parameter: Option<&str>,
    ) -> Availability {
        Availability::combine_all(
            groups
                .iter()
                .map(|(factory, subset)| factory.availability(world, subset, selection, parameter)),
        )
    }
}

/// Live, attached ids in selection order, duplicates removed.
fn resolve(world: &World, entity_ids: &[EntityId]) -> Vec<EntityId> {
    let mut seen = BTreeSet::new();
    entity_ids
        .iter()
        .copied()
        .filter(|&id| world.is_live(id) && seen.insert(id))
        .collect()
}

/// Terran start: a command center at the start location, workers beside it,
/// starting minerals.
fn initialize_terran(scenario: &mut Scenario, player: PlayerIndex) -> Result<()> {
    let start = scenario
        .world()
        .player(player)
        .map(|p| p.start_location)
        .ok_or(CommandError::UnknownPlayer(player))?;
    let minerals = scenario.world().config().starting_minerals;

    scenario.spawn("CommandCenter", player, start)?;
    for i in 0..STARTING_WORKERS {
        let offset = Vec2Fixed::from_int(2 * i - 3, 4);
        scenario.spawn("SCV", player, start + offset)?;
    }
    if let Some(p) = scenario.world_mut().player_mut(player) {
        p.minerals = minerals;
        p.supply_used += STARTING_WORKERS as u32;
    }
    Ok(())
}
