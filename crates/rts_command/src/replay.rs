//! Replays: the initial world plus every envelope, by tick.
//!
//! Because the engine is deterministic, re-applying the recorded envelopes
//! to the recorded world with the same executor setup reproduces the final
//! state hash exactly.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::envelope::CommandEnvelope;
use crate::error::{CommandError, Result};
use crate::executor::CommandExecutor;
use crate::scenario::Scenario;
use crate::world::World;

/// A single envelope record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayCommand {
    /// Tick at whose start the envelope was applied.
    pub tick: u64,
    /// The envelope.
    pub envelope: CommandEnvelope,
}

/// Replay file format version for compatibility.
pub const REPLAY_VERSION: u32 = 1;

/// Complete replay data structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Replay {
    /// Replay format version.
    pub version: u32,
    /// Free-form scenario name.
    pub scenario_name: String,
    /// Serialized initial world.
    pub initial_state: Vec<u8>,
    /// Envelopes in tick order.
    pub commands: Vec<ReplayCommand>,
    /// Tick at which recording stopped.
    pub final_tick: u64,
    /// State hash at `final_tick`.
    pub final_hash: u64,
}

impl Replay {
    /// Start a replay from a scenario's current state.
    ///
    /// Live executions cannot be captured, so the scenario must have none.
    pub fn new(scenario_name: impl Into<String>, scenario: &Scenario) -> Result<Self> {
        if scenario.execution_count() > 0 {
            return Err(CommandError::Replay(format!(
                "cannot capture a scenario with {} live executions",
                scenario.execution_count()
            )));
        }
        Ok(Self {
            version: REPLAY_VERSION,
            scenario_name: scenario_name.into(),
            initial_state: scenario.world().to_bytes()?,
            commands: Vec::new(),
            final_tick: scenario.tick(),
            final_hash: scenario.state_hash(),
        })
    }

    /// Record the envelopes applied at `tick`.
    pub fn record(&mut self, tick: u64, envelopes: &[CommandEnvelope]) {
        self.commands
            .extend(envelopes.iter().cloned().map(|envelope| ReplayCommand { tick, envelope }));
    }

    /// Stamp the end state.
    pub fn finalize(&mut self, scenario: &Scenario) {
        self.final_tick = scenario.tick();
        self.final_hash = scenario.state_hash();
    }

    /// Save the replay to a file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let bytes = bincode::serialize(self)
            .map_err(|e| CommandError::Replay(format!("Failed to serialize replay: {e}")))?;
        std::fs::write(path.as_ref(), bytes)
            .map_err(|e| CommandError::Replay(format!("Failed to write replay file: {e}")))
    }

    /// Load a replay from a file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = std::fs::read(path.as_ref())
            .map_err(|e| CommandError::Replay(format!("Failed to read replay file: {e}")))?;
        let replay: Self = bincode::deserialize(&bytes)
            .map_err(|e| CommandError::Replay(format!("Failed to deserialize replay: {e}")))?;

        if replay.version != REPLAY_VERSION {
            return Err(CommandError::Replay(format!(
                "Replay version mismatch: expected {REPLAY_VERSION}, got {}",
                replay.version
            )));
        }
        Ok(replay)
    }

    /// Rebuild the recorded starting scenario.
    pub fn restore_initial_state(&self) -> Result<Scenario> {
        Ok(Scenario::from_world(World::from_bytes(&self.initial_state)?))
    }

    /// Envelopes applied at `tick`.
    #[must_use]
    pub fn commands_at_tick(&self, tick: u64) -> Vec<&CommandEnvelope> {
        self.commands
            .iter()
            .filter(|cmd| cmd.tick == tick)
            .map(|cmd| &cmd.envelope)
            .collect()
    }

    /// Number of recorded envelopes.
    #[must_use]
    pub fn command_count(&self) -> usize {
        self.commands.len()
    }
}

/// Re-drives a replay against a fresh scenario.
#[derive(Debug)]
pub struct ReplayPlayer<'a> {
    replay: Replay,
    executor: &'a CommandExecutor,
    scenario: Scenario,
    command_index: usize,
}

impl<'a> ReplayPlayer<'a> {
    /// Restore the initial state of `replay`.
    pub fn new(replay: Replay, executor: &'a CommandExecutor) -> Result<Self> {
        let scenario = replay.restore_initial_state()?;
        Ok(Self {
            replay,
            executor,
            scenario,
            command_index: 0,
        })
    }

    /// Play one tick. Returns whether ticks remain.
    pub fn advance(&mut self) -> bool {
        if self.is_finished() {
            return false;
        }
        let tick = self.scenario.tick();
        let mut incoming = Vec::new();
        while let Some(cmd) = self.replay.commands.get(self.command_index) {
            if cmd.tick > tick {
                break;
            }
            if cmd.tick == tick {
                incoming.push(cmd.envelope.clone());
            }
            self.command_index += 1;
        }
        self.scenario.step(self.executor, &incoming);
        !self.is_finished()
    }

    /// Restart from the initial state and play up to `target_tick`.
    pub fn seek(&mut self, target_tick: u64) -> Result<()> {
        self.scenario = self.replay.restore_initial_state()?;
        self.command_index = 0;
        while self.scenario.tick() < target_tick && self.advance() {}
        Ok(())
    }

    /// Current tick.
    #[must_use]
    pub const fn current_tick(&self) -> u64 {
        self.scenario.tick()
    }

    /// Scenario being played.
    #[must_use]
    pub const fn scenario(&self) -> &Scenario {
        &self.scenario
    }

    /// Whether the final tick has been reached.
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.scenario.tick() >= self.replay.final_tick
    }

    /// Play the whole replay and compare the final state hash.
    pub fn verify(&mut self) -> Result<bool> {
        self.seek(self.replay.final_tick)?;
        let actual = self.scenario.state_hash();
        if actual != self.replay.final_hash {
            tracing::warn!(
                expected = self.replay.final_hash,
                actual,
                tick = self.current_tick(),
                "Replay diverged"
            );
        }
        Ok(actual == self.replay.final_hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::math::Vec2Fixed;
    use crate::player::{PlayerIndex, Race};

    fn scenario() -> Scenario {
        let mut scenario = Scenario::new(1, EngineConfig::default()).unwrap();
        scenario.add_player(PlayerIndex(0), Race::Terran, Vec2Fixed::ZERO);
        scenario
            .spawn("Marine", PlayerIndex(0), Vec2Fixed::ZERO)
            .unwrap();
        scenario
    }

    fn record(ticks: u64) -> (Replay, CommandExecutor) {
        let executor = CommandExecutor::standard(&EngineConfig::default()).unwrap();
        let mut scenario = scenario();
        let mut replay = Replay::new("patrol", &scenario).unwrap();
        for tick in 0..ticks {
            let incoming = if tick == 2 {
                vec![CommandEnvelope::new(Some("Patrol"), vec![1])
                    .unwrap()
                    .with_target_position(Vec2Fixed::from_int(6, 0))]
            } else {
                Vec::new()
            };
            replay.record(scenario.tick(), &incoming);
            scenario.step(&executor, &incoming);
        }
        replay.finalize(&scenario);
        (replay, executor)
    }

    #[test]
    fn test_replay_record_commands() {
        let (replay, _) = record(10);
        assert_eq!(replay.command_count(), 1);
        assert_eq!(replay.commands_at_tick(2).len(), 1);
        assert!(replay.commands_at_tick(3).is_empty());
        assert_eq!(replay.final_tick, 10);
    }

    #[test]
    fn test_replay_verifies() {
        let (replay, executor) = record(30);
        let mut player = ReplayPlayer::new(replay, &executor).unwrap();
        assert!(player.verify().unwrap());
        assert!(player.is_finished());
    }

    #[test]
    fn test_tampered_replay_fails_verification() {
        let (mut replay, executor) = record(30);
        replay.commands.clear();
        let mut player = ReplayPlayer::new(replay, &executor).unwrap();
        assert!(!player.verify().unwrap());
    }

    #[test]
    fn test_replay_player_seek() {
        let (replay, executor) = record(20);
        let mut player = ReplayPlayer::new(replay, &executor).unwrap();
        player.seek(12).unwrap();
        assert_eq!(player.current_tick(), 12);
        player.seek(4).unwrap();
        assert_eq!(player.current_tick(), 4);
    }

    #[test]
    fn test_capture_with_live_executions_rejected() {
        let executor = CommandExecutor::standard(&EngineConfig::default()).unwrap();
        let mut scenario = scenario();
        let stop = CommandEnvelope::new(Some("Hold"), vec![1]).unwrap();
        scenario.step(&executor, &[stop]);
        assert!(matches!(
            Replay::new("busy", &scenario),
            Err(CommandError::Replay(_))
        ));
    }

    #[test]
    fn test_version_mismatch_rejected() {
        let (mut replay, _) = record(1);
        replay.version = REPLAY_VERSION + 1;
        let dir = std::env::temp_dir().join("rts_command_replay_version_test.bin");
        replay.save(&dir).unwrap();
        assert!(matches!(Replay::load(&dir), Err(CommandError::Replay(_))));
        let _ = std::fs::remove_file(dir);
    }

    #[test]
    fn test_replay_save_load() {
        let (replay, _) = record(5);
        let path = std::env::temp_dir().join("rts_command_replay_roundtrip_test.bin");
        replay.save(&path).unwrap();
        let loaded = Replay::load(&path).unwrap();
        assert_eq!(loaded, replay);
        let _ = std::fs::remove_file(path);
    }
}
