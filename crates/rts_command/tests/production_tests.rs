//! Production queues, refunds and player setup.

use rts_command::entity::EntityId;
use rts_command::envelope::CommandEnvelope;
use rts_command::error::CommandError;
use rts_command::factory::Availability;
use rts_command::player::{PlayerIndex, Race};
use rts_command::scenario::Scenario;
use rts_test_utils::fixtures::{pos, spawn, standard_executor, two_player_scenario, RED};

fn produce(building: EntityId, element_type: &str) -> CommandEnvelope {
    CommandEnvelope::new(Some("Produce"), vec![building])
        .unwrap()
        .with_parameter(element_type)
}

fn with_base(minerals: u32) -> (Scenario, EntityId) {
    let mut scenario = two_player_scenario();
    let cc = spawn(&mut scenario, "CommandCenter", RED, 10, 10);
    scenario.world_mut().player_mut(RED).unwrap().minerals = minerals;
    (scenario, cc)
}

#[test]
fn test_produce_pays_queues_and_spawns() {
    let (mut scenario, cc) = with_base(100);
    let executor = standard_executor();

    let events = scenario.step(&executor, &[produce(cc, "SCV")]);
    assert_eq!(events.finished, events.dispatched);
    let player = scenario.world().player(RED).unwrap();
    assert_eq!(player.minerals, 50);
    assert_eq!(player.supply_used, 1);
    assert_eq!(
        executor.command_availability(&scenario, Some("CancelProduction"), None, &[cc]),
        Availability::Enabled
    );

    let build_time = scenario.world().element_type("SCV").unwrap().build_time;
    let mut spawned = Vec::new();
    let mut follow_ups = Vec::new();
    for _ in 1..build_time {
        let events = scenario.step(&executor, &[]);
        spawned.extend(events.spawned);
        follow_ups.extend(events.follow_ups);
    }

    assert_eq!(spawned.len(), 1);
    let scv = scenario.world().entity(spawned[0]).unwrap();
    assert_eq!(scv.position, pos(12, 12));
    assert_eq!(scv.owner, RED);
    // Armed units come out watching for enemies.
    assert_eq!(follow_ups.len(), 1);
    assert_eq!(scenario.execution_of(spawned[0]), Some(follow_ups[0]));
    assert!(scenario.world().entity(cc).unwrap().production.is_idle());
    assert_eq!(scenario.world().player(RED).unwrap().supply_used, 1);
}

#[test]
fn test_cancel_refunds_last_item() {
    let (mut scenario, cc) = with_base(100);
    let executor = standard_executor();

    scenario.step(&executor, &[produce(cc, "SCV")]);
    scenario.step(&executor, &[produce(cc, "SCV")]);
    assert_eq!(scenario.world().player(RED).unwrap().minerals, 0);

    let cancel = CommandEnvelope::new(Some("CancelProduction"), vec![cc]).unwrap();
    scenario.step(&executor, &[cancel]);

    let player = scenario.world().player(RED).unwrap();
    assert_eq!(player.minerals, 50);
    assert_eq!(player.supply_used, 1);
    let line = &scenario.world().entity(cc).unwrap().production;
    assert_eq!(line.queue.len(), 1);
    assert!(line.progress > 0);
}

#[test]
fn test_cancel_of_only_item_resets_progress() {
    let (mut scenario, cc) = with_base(50);
    let executor = standard_executor();

    scenario.step(&executor, &[produce(cc, "SCV")]);
    scenario.step(&executor, &[]);
    let cancel = CommandEnvelope::new(Some("CancelProduction"), vec![cc]).unwrap();
    scenario.step(&executor, &[cancel]);

    let line = &scenario.world().entity(cc).unwrap().production;
    assert!(line.is_idle());
    assert_eq!(line.progress, 0);
    assert_eq!(scenario.world().player(RED).unwrap().minerals, 50);
    assert_eq!(
        executor.command_availability(&scenario, Some("CancelProduction"), None, &[cc]),
        Availability::Disabled
    );
}

#[test]
fn test_unaffordable_production_is_disabled() {
    let (mut scenario, cc) = with_base(0);
    let executor = standard_executor();

    assert_eq!(
        executor.command_availability(&scenario, Some("Produce"), Some("SCV"), &[cc]),
        Availability::Disabled
    );
    let events = scenario.step(&executor, &[produce(cc, "SCV")]);
    assert!(events.dispatched.is_empty());
    assert!(scenario.world().entity(cc).unwrap().production.is_idle());
}

#[test]
fn test_full_queue_is_disabled() {
    let (mut scenario, cc) = with_base(1000);
    let executor = standard_executor();
    let capacity = scenario.world().config().production_queue_capacity;

    for _ in 0..capacity {
        scenario.step(&executor, &[produce(cc, "SCV")]);
    }
    assert_eq!(
        scenario.world().entity(cc).unwrap().production.queue.len(),
        capacity
    );
    assert_eq!(
        executor.command_availability(&scenario, Some("Produce"), Some("SCV"), &[cc]),
        Availability::Disabled
    );
}

#[test]
fn test_wrong_producer_is_unavailable() {
    let (scenario, cc) = with_base(1000);
    let executor = standard_executor();

    assert_eq!(
        executor.command_availability(&scenario, Some("Produce"), Some("Marine"), &[cc]),
        Availability::Unavailable
    );
    assert_eq!(
        executor.command_availability(&scenario, Some("Produce"), None, &[cc]),
        Availability::Unavailable
    );
}

#[test]
fn test_shortest_queue_takes_the_order() {
    let (mut scenario, first) = with_base(1000);
    let executor = standard_executor();
    let second = spawn(&mut scenario, "CommandCenter", RED, 30, 10);

    scenario.step(&executor, &[produce(first, "SCV")]);
    scenario.step(&executor, &[produce(first, "SCV")]);
    let both = CommandEnvelope::new(Some("Produce"), vec![first, second])
        .unwrap()
        .with_parameter("SCV");
    scenario.step(&executor, &[both]);

    let world = scenario.world();
    assert_eq!(world.entity(first).unwrap().production.queue.len(), 2);
    assert_eq!(world.entity(second).unwrap().production.queue.len(), 1);
}

#[test]
fn test_terran_player_setup() {
    let mut scenario = two_player_scenario();
    let executor = standard_executor();
    executor.initialize_player(&mut scenario, RED).unwrap();

    let world = scenario.world();
    let types: Vec<&str> = world
        .entities()
        .iter()
        .map(|e| e.element_type.as_str())
        .collect();
    assert_eq!(types, vec!["CommandCenter", "SCV", "SCV", "SCV", "SCV"]);
    let player = world.player(RED).unwrap();
    assert_eq!(player.minerals, world.config().starting_minerals);
    assert_eq!(player.supply_used, 4);
    assert_eq!(player.supply_limit, 10);
}

#[test]
fn test_player_setup_errors() {
    let mut scenario = two_player_scenario();
    let executor = standard_executor();
    scenario.add_player(PlayerIndex(2), Race::Zerg, pos(0, 60));

    assert!(matches!(
        executor.initialize_player(&mut scenario, PlayerIndex(2)),
        Err(CommandError::MissingPlayerInitializer(Race::Zerg))
    ));
    assert!(matches!(
        executor.initialize_player(&mut scenario, PlayerIndex(9)),
        Err(CommandError::UnknownPlayer(PlayerIndex(9)))
    ));
}
