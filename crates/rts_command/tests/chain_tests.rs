//! Chained orders and sub-executions: stop, attack, attack-move, patrol, hold.

use rts_command::entity::EntityId;
use rts_command::scenario::Scenario;
use rts_test_utils::fixtures::{
    order, order_on, pos, spawn, standard_executor, two_player_scenario, BLUE, RED,
};

fn label(scenario: &Scenario, id: EntityId) -> Option<&'static str> {
    scenario
        .execution_of(id)
        .and_then(|exec| scenario.execution(exec))
        .and_then(|exec| exec.label())
}

#[test]
fn test_stop_attack_stop_chain() {
    let mut scenario = two_player_scenario();
    let executor = standard_executor();
    let marine = spawn(&mut scenario, "Marine", RED, 0, 0);
    let scv = spawn(&mut scenario, "SCV", BLUE, 5, 0);

    let events = scenario.step(&executor, &[order(Some("Stop"), &[marine], 0, 0)]);
    assert_eq!(events.dispatched.len(), 1);
    assert_eq!(events.finished, events.dispatched);
    assert_eq!(events.follow_ups.len(), 1);
    assert_eq!(label(&scenario, marine), Some("Attack"));

    let mut damage = 0;
    let mut died_at = None;
    for _ in 0..200 {
        let events = scenario.step(&executor, &[]);
        damage += events.damage.iter().map(|d| d.damage).sum::<u32>();
        if events.deaths.contains(&scv) {
            died_at = Some(scenario.tick());
        }
    }

    assert!(died_at.is_some());
    assert_eq!(damage, 60);
    assert!(scenario.world().entity(scv).is_none());
    // Back to a watching stop, which never finishes without enemies.
    assert!(scenario.execution_of(marine).is_some());
    assert_eq!(label(&scenario, marine), None);
    assert_eq!(scenario.execution_count(), 1);
}

#[test]
fn test_unarmed_stop_does_not_chain() {
    let mut scenario = two_player_scenario();
    let executor = standard_executor();
    let cc = spawn(&mut scenario, "CommandCenter", RED, 0, 0);
    spawn(&mut scenario, "Marine", BLUE, 3, 0);

    let events = scenario.step(&executor, &[order(Some("Stop"), &[cc], 0, 0)]);
    assert_eq!(events.finished.len(), 1);
    assert!(events.follow_ups.is_empty());
    assert_eq!(scenario.execution_of(cc), None);
}

#[test]
fn test_attack_move_breaks_off_to_engage() {
    let mut scenario = two_player_scenario();
    let executor = standard_executor();
    let marine = spawn(&mut scenario, "Marine", RED, 0, 0);
    let scv = spawn(&mut scenario, "SCV", BLUE, 12, 0);

    let events = scenario.step(&executor, &[order(Some("Attack"), &[marine], 20, 0)]);
    let attack_move = events.dispatched[0];
    assert_eq!(label(&scenario, marine), Some("Attack"));

    let mut handed_over = false;
    for _ in 0..20 {
        scenario.step(&executor, &[]);
        let current = scenario.execution_of(marine);
        if current.is_some() && current != Some(attack_move) {
            handed_over = true;
            break;
        }
    }
    assert!(handed_over);
    assert_eq!(label(&scenario, marine), Some("Attack"));

    // The emptied attack-move is disposed on the following pass.
    scenario.step(&executor, &[]);
    assert!(scenario.execution(attack_move).is_none());
    assert_eq!(scenario.world().entity(marine).unwrap().attack_target, Some(scv));
}

#[test]
fn test_patrol_shuttles_between_legs() {
    let mut scenario = two_player_scenario();
    let executor = standard_executor();
    let marine = spawn(&mut scenario, "Marine", RED, 0, 0);

    scenario.step(&executor, &[order(Some("Patrol"), &[marine], 4, 0)]);
    let mut reached_waypoint = false;
    let mut returned = false;
    for _ in 0..20 {
        scenario.step(&executor, &[]);
        let position = scenario.world().entity(marine).unwrap().position;
        if position == pos(4, 0) {
            reached_waypoint = true;
        }
        if reached_waypoint && position == pos(0, 0) {
            returned = true;
        }
    }
    assert!(reached_waypoint);
    assert!(returned);
    assert_eq!(label(&scenario, marine), Some("Patrol"));
}

#[test]
fn test_hold_fires_without_moving() {
    let mut scenario = two_player_scenario();
    let executor = standard_executor();
    let tank = spawn(&mut scenario, "Tank", RED, 0, 0);
    let near = spawn(&mut scenario, "SCV", BLUE, 6, 0);
    spawn(&mut scenario, "SCV", BLUE, 0, 9);

    let mut hits = Vec::new();
    scenario.step(&executor, &[order(Some("Hold"), &[tank], 0, 0)]);
    for _ in 0..40 {
        let events = scenario.step(&executor, &[]);
        hits.extend(events.damage.iter().map(|d| d.target));
    }
    assert!(!hits.is_empty());
    assert!(hits.iter().all(|&t| t == near));
    assert_eq!(scenario.world().entity(tank).unwrap().position, pos(0, 0));
    assert_eq!(label(&scenario, tank), Some("Hold"));
}

#[test]
fn test_immobile_attacker_drops_unreachable_target() {
    let mut scenario = two_player_scenario();
    let executor = standard_executor();
    let turret = spawn(&mut scenario, "MissileTurret", RED, 0, 0);
    let far = spawn(&mut scenario, "SCV", BLUE, 9, 0);

    let events = scenario.step(&executor, &[order_on(Some("Attack"), &[turret], far)]);
    let attack = events.dispatched[0];
    let mut finished = false;
    for _ in 0..3 {
        let events = scenario.step(&executor, &[]);
        finished |= events.finished.contains(&attack);
    }
    assert!(finished);
    // Falls back to a watching stop instead of locking on.
    assert!(scenario.execution_of(turret).is_some());
    assert_eq!(label(&scenario, turret), None);
    assert_eq!(scenario.world().entity(turret).unwrap().attack_target, None);

    let near = spawn(&mut scenario, "SCV", BLUE, 3, 0);
    let mut hits = Vec::new();
    for _ in 0..60 {
        let events = scenario.step(&executor, &[]);
        hits.extend(events.damage.iter().map(|d| d.target));
    }
    assert!(!hits.is_empty());
    assert!(hits.iter().all(|&t| t == near));
}

#[test]
fn test_immobile_stop_engages_enemy_walking_into_range() {
    let mut scenario = two_player_scenario();
    let executor = standard_executor();
    let turret = spawn(&mut scenario, "MissileTurret", RED, 0, 0);
    let far = spawn(&mut scenario, "SCV", BLUE, 9, 0);

    let events = scenario.step(&executor, &[order(Some("Stop"), &[turret], 0, 0)]);
    assert!(events.follow_ups.is_empty());

    let near = spawn(&mut scenario, "SCV", BLUE, 3, 0);
    let mut hits = Vec::new();
    for _ in 0..60 {
        let events = scenario.step(&executor, &[]);
        hits.extend(events.damage.iter().map(|d| d.target));
    }
    assert!(!hits.is_empty());
    assert!(hits.iter().all(|&t| t == near));
    assert!(scenario.world().entity(far).is_some());
}
