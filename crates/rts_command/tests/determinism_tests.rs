//! Lockstep guarantees: identical inputs give identical states, replays
//! reproduce live runs, and executions roll back from snapshots.

use proptest::prelude::*;
use rts_command::envelope::CommandEnvelope;
use rts_command::executor::CommandExecutor;
use rts_command::replay::{Replay, ReplayPlayer};
use rts_command::scenario::Scenario;
use rts_test_utils::determinism::{
    find_first_divergence, run_parallel_scenarios, strategies, verify_scenario_determinism,
    CommandScript,
};
use rts_test_utils::fixtures::{
    order, skirmish_scenario, spawn, standard_executor, two_player_scenario, BLUE, RED,
};

/// A base that lifts off and lands while its marines skirmish.
fn base_and_battle() -> (Scenario, CommandExecutor) {
    let (mut scenario, _, _) = skirmish_scenario();
    spawn(&mut scenario, "CommandCenter", RED, -10, 0);
    spawn(&mut scenario, "Barracks", BLUE, 40, 0);
    let blue = scenario.world_mut().player_mut(BLUE).unwrap();
    blue.minerals = 200;
    blue.supply_limit = 10;
    (scenario, standard_executor())
}

fn mixed_script() -> CommandScript {
    let produce = CommandEnvelope::new(Some("Produce"), vec![8])
        .unwrap()
        .with_parameter("Marine");
    CommandScript::new()
        .at(0, order(Some("LiftOff"), &[7], 0, 0))
        .at(0, produce)
        .at(2, order(Some("Land"), &[7], -4, 6))
        .at(5, order(Some("Attack"), &[1, 2, 3], 30, 2))
        .at(5, order(Some("Hold"), &[4, 5, 6], 0, 0))
        .at(40, order(Some("Patrol"), &[1], 10, 10))
}

fn record(ticks: u64) -> (Replay, Vec<u64>) {
    let (mut scenario, executor) = base_and_battle();
    let script = mixed_script();
    let mut replay = Replay::new("mixed", &scenario).unwrap();
    let mut hashes = Vec::new();
    for _ in 0..ticks {
        let tick = scenario.tick();
        let incoming = script.commands_at(tick);
        replay.record(tick, incoming);
        scenario.step(&executor, incoming);
        hashes.push(scenario.state_hash());
    }
    replay.finalize(&scenario);
    (replay, hashes)
}

#[test]
fn test_mixed_commands_are_deterministic() {
    assert!(verify_scenario_determinism(base_and_battle, &mixed_script(), 150));
    assert_eq!(find_first_divergence(base_and_battle, &mixed_script(), 150), None);
}

#[test]
fn test_parallel_runs_agree() {
    run_parallel_scenarios(base_and_battle, &mixed_script(), 3, 120).assert_deterministic();
}

#[test]
fn test_replay_file_reproduces_run() {
    let (replay, hashes) = record(90);
    assert_eq!(replay.command_count(), 6);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mixed.replay");
    replay.save(&path).unwrap();
    let loaded = Replay::load(&path).unwrap();
    assert_eq!(loaded.final_hash, *hashes.last().unwrap());

    let executor = standard_executor();
    let mut player = ReplayPlayer::new(loaded, &executor).unwrap();
    assert!(player.verify().unwrap());
    assert!(player.is_finished());
}

#[test]
fn test_seek_matches_live_state() {
    let (replay, hashes) = record(60);
    let executor = standard_executor();
    let mut player = ReplayPlayer::new(replay, &executor).unwrap();

    player.seek(25).unwrap();
    assert_eq!(player.current_tick(), 25);
    assert_eq!(player.scenario().state_hash(), hashes[24]);

    // Seeking backwards restarts from the initial state.
    player.seek(10).unwrap();
    assert_eq!(player.scenario().state_hash(), hashes[9]);
}

#[test]
fn test_execution_rolls_back_to_snapshot() {
    let mut scenario = two_player_scenario();
    let executor = standard_executor();
    let marine = spawn(&mut scenario, "Marine", RED, 0, 0);

    scenario.step(&executor, &[order(Some("Patrol"), &[marine], 2, 0)]);
    let id = scenario.execution_of(marine).unwrap();
    let outbound = scenario.execution(id).unwrap().snapshot(id);

    // Out to the waypoint and one step back.
    for _ in 0..3 {
        scenario.step(&executor, &[]);
    }
    assert_ne!(scenario.execution(id).unwrap().snapshot(id), outbound);

    scenario.execution_mut(id).unwrap().restore(&outbound).unwrap();
    assert_eq!(scenario.execution(id).unwrap().snapshot(id), outbound);
    assert_eq!(scenario.execution_snapshots(), vec![outbound]);
}

proptest! {
    #[test]
    fn prop_envelopes_survive_the_wire(envelope in strategies::arb_envelope()) {
        let bytes = envelope.encode().unwrap();
        prop_assert_eq!(CommandEnvelope::decode(&bytes).unwrap(), envelope);
    }
}
