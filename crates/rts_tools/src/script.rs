//! Scripted scenario runs.
//!
//! A script is a RON file describing players, starting entities and a list
//! of timed orders:
//!
//! ```ron
//! (
//!     scenario_id: 1,
//!     players: [
//!         (index: 0, race: Terran, start: (0, 0), initialize: true),
//!         (index: 1, race: Terran, start: (40, 0), initialize: false),
//!     ],
//!     spawns: [(element_type: "Marine", owner: 1, x: 40, y: 2)],
//!     orders: [
//!         (tick: 0, command: Some("Attack"), recipients: [2, 3], target: Some((40, 2))),
//!     ],
//! )
//! ```
//!
//! Running a script records a replay alongside, so a run can be verified
//! later with the same engine config.

use std::path::Path;

use rts_command::config::EngineConfig;
use rts_command::entity::EntityId;
use rts_command::envelope::CommandEnvelope;
use rts_command::executor::CommandExecutor;
use rts_command::math::Vec2Fixed;
use rts_command::player::{PlayerIndex, Race};
use rts_command::replay::Replay;
use rts_command::scenario::Scenario;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ToolError};

/// A player slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSpec {
    /// Slot index.
    pub index: u8,
    /// Race.
    pub race: Race,
    /// Start location in whole map units.
    pub start: (i32, i32),
    /// Run the race's player initializer.
    #[serde(default)]
    pub initialize: bool,
}

/// An entity present at tick zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpawnSpec {
    /// Element type name.
    pub element_type: String,
    /// Owning slot.
    pub owner: u8,
    /// X in whole map units.
    pub x: i32,
    /// Y in whole map units.
    pub y: i32,
}

/// An order arriving at a given tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSpec {
    /// Tick the order arrives at.
    pub tick: u64,
    /// Command type, `None` for the smart command.
    #[serde(default)]
    pub command: Option<String>,
    /// Recipient ids.
    pub recipients: Vec<EntityId>,
    /// Target position in whole map units.
    #[serde(default)]
    pub target: Option<(i32, i32)>,
    /// Target entity.
    #[serde(default)]
    pub target_entity: Option<EntityId>,
    /// Parameter, e.g. the element type to produce.
    #[serde(default)]
    pub parameter: Option<String>,
}

impl OrderSpec {
    fn to_envelope(&self) -> Result<CommandEnvelope> {
        let mut envelope =
            CommandEnvelope::new(self.command.as_deref(), self.recipients.clone())?;
        if let Some((x, y)) = self.target {
            envelope = envelope.with_target_position(Vec2Fixed::from_int(x, y));
        }
        if let Some(target) = self.target_entity {
            envelope = envelope.with_target_entity(target);
        }
        if let Some(parameter) = &self.parameter {
            envelope = envelope.with_parameter(parameter);
        }
        Ok(envelope)
    }
}

/// A complete scenario script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioScript {
    /// Scenario id.
    pub scenario_id: u32,
    /// Player slots.
    pub players: Vec<PlayerSpec>,
    /// Starting entities, spawned after player initialization.
    #[serde(default)]
    pub spawns: Vec<SpawnSpec>,
    /// Timed orders.
    #[serde(default)]
    pub orders: Vec<OrderSpec>,
}

impl ScenarioScript {
    /// Parse a script from a RON string.
    pub fn from_ron_str(ron: &str) -> Result<Self> {
        ron::from_str(ron).map_err(|e| ToolError::ScriptParse(e.to_string()))
    }

    /// Load a script from a RON file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|source| ToolError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_ron_str(&contents)
    }

    /// Build the starting scenario.
    pub fn build(&self, config: EngineConfig, executor: &CommandExecutor) -> Result<Scenario> {
        let mut scenario = Scenario::new(self.scenario_id, config)?;
        for player in &self.players {
            let (x, y) = player.start;
            scenario.add_player(PlayerIndex(player.index), player.race, Vec2Fixed::from_int(x, y));
        }
        for player in self.players.iter().filter(|p| p.initialize) {
            executor.initialize_player(&mut scenario, PlayerIndex(player.index))?;
        }
        for spawn in &self.spawns {
            if scenario.world().player(PlayerIndex(spawn.owner)).is_none() {
                return Err(ToolError::InvalidScript(format!(
                    "spawn of '{}' owned by undeclared player {}",
                    spawn.element_type, spawn.owner
                )));
            }
            scenario.spawn(
                &spawn.element_type,
                PlayerIndex(spawn.owner),
                Vec2Fixed::from_int(spawn.x, spawn.y),
            )?;
        }
        Ok(scenario)
    }
}

/// Result of running a script.
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Final tick.
    pub ticks: u64,
    /// Final state hash.
    pub state_hash: u64,
    /// Entities left on the map.
    pub entities: usize,
    /// Executions still running.
    pub executions: usize,
    /// Executions started from scripted orders.
    pub dispatched: usize,
    /// Recorded replay of the run.
    pub replay: Replay,
}

/// Run a script for `ticks` ticks and record a replay.
pub fn run_script(
    script: &ScenarioScript,
    config: EngineConfig,
    ticks: u64,
) -> Result<RunSummary> {
    let executor = CommandExecutor::standard(&config)?;
    let mut scenario = script.build(config, &executor)?;
    let mut replay = Replay::new(format!("scenario-{}", script.scenario_id), &scenario)?;

    let mut orders: Vec<(u64, CommandEnvelope)> = script
        .orders
        .iter()
        .map(|order| order.to_envelope().map(|envelope| (order.tick, envelope)))
        .collect::<Result<_>>()?;
    orders.sort_by_key(|(tick, _)| *tick);

    let mut dispatched = 0;
    let mut next = 0;
    for _ in 0..ticks {
        let tick = scenario.tick();
        let start = next;
        while next < orders.len() && orders[next].0 <= tick {
            next += 1;
        }
        let incoming: Vec<CommandEnvelope> =
            orders[start..next].iter().map(|(_, e)| e.clone()).collect();

        replay.record(tick, &incoming);
        let events = scenario.step(&executor, &incoming);
        dispatched += events.dispatched.len();
        if !events.deaths.is_empty() {
            tracing::info!(tick, deaths = ?events.deaths, "Entities destroyed");
        }
    }
    replay.finalize(&scenario);

    let summary = RunSummary {
        ticks: scenario.tick(),
        state_hash: scenario.state_hash(),
        entities: scenario.world().entities().len(),
        executions: scenario.execution_count(),
        dispatched,
        replay,
    };
    tracing::info!(
        ticks = summary.ticks,
        state_hash = summary.state_hash,
        entities = summary.entities,
        executions = summary.executions,
        "Scenario run complete"
    );
    Ok(summary)
}
