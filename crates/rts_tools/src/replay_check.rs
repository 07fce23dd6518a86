//! Replay verification.

use std::path::Path;

use rts_command::config::EngineConfig;
use rts_command::executor::CommandExecutor;
use rts_command::replay::{Replay, ReplayPlayer};

use crate::error::Result;

/// Outcome of re-running a replay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayReport {
    /// Scenario name stored in the replay.
    pub scenario_name: String,
    /// Recorded envelopes.
    pub commands: usize,
    /// Final tick reached.
    pub final_tick: u64,
    /// Whether the final state hash matched.
    pub matches: bool,
}

/// Re-run a loaded replay with the standard executor for `config`.
///
/// # Errors
///
/// Returns an error if the executor cannot be built or the initial state
/// does not decode.
pub fn verify_replay(replay: Replay, config: &EngineConfig) -> Result<ReplayReport> {
    let executor = CommandExecutor::standard(config)?;
    let scenario_name = replay.scenario_name.clone();
    let commands = replay.command_count();
    let mut player = ReplayPlayer::new(replay, &executor)?;
    let matches = player.verify()?;
    Ok(ReplayReport {
        scenario_name,
        commands,
        final_tick: player.current_tick(),
        matches,
    })
}

/// Load a replay file and re-run it.
///
/// # Errors
///
/// Returns an error if the file cannot be loaded or has another version.
pub fn verify_replay_file(path: &Path, config: &EngineConfig) -> Result<ReplayReport> {
    let replay = Replay::load(path)?;
    verify_replay(replay, config)
}
