//! Group moves keep or collapse their formation.

use proptest::prelude::*;
use rts_command::formation::MagicBox;
use rts_command::math::Vec2Fixed;
use rts_test_utils::determinism::strategies::arb_ground_group;
use rts_test_utils::fixtures::{order, pos, spawn, standard_executor, two_player_scenario, RED};

#[test]
fn test_line_moves_as_a_line() {
    let mut scenario = two_player_scenario();
    let executor = standard_executor();
    let a = spawn(&mut scenario, "Marine", RED, 0, 0);
    let b = spawn(&mut scenario, "Marine", RED, 4, 0);

    scenario.step(&executor, &[order(Some("Move"), &[a, b], 10, 0)]);
    for _ in 0..20 {
        scenario.step(&executor, &[]);
    }

    assert_eq!(scenario.world().entity(a).unwrap().position, pos(8, 0));
    assert_eq!(scenario.world().entity(b).unwrap().position, pos(12, 0));
    assert_eq!(scenario.execution_count(), 0);
}

#[test]
fn test_far_off_move_keeps_ticking() {
    let mut scenario = two_player_scenario();
    let executor = standard_executor();
    let a = spawn(&mut scenario, "Marine", RED, 0, 0);
    let b = spawn(&mut scenario, "Marine", RED, 0, 4);

    scenario.step(&executor, &[order(Some("Move"), &[a, b], 50_000, 0)]);
    for _ in 0..4 {
        scenario.step(&executor, &[]);
    }

    let world = scenario.world();
    for id in [a, b] {
        let position = world.entity(id).unwrap().position;
        assert!(position.x > pos(3, 0).x && position.x < pos(6, 0).x);
    }
    assert_eq!(scenario.execution_count(), 1);
}

#[test]
fn test_click_inside_group_gathers_everyone() {
    let mut scenario = two_player_scenario();
    let executor = standard_executor();
    let a = spawn(&mut scenario, "Marine", RED, 0, 0);
    let b = spawn(&mut scenario, "Marine", RED, 4, 4);

    scenario.step(&executor, &[order(Some("Move"), &[a, b], 2, 2)]);
    for _ in 0..10 {
        scenario.step(&executor, &[]);
    }

    let world = scenario.world();
    let threshold = world.config().arrival_threshold;
    for id in [a, b] {
        assert!(world.entity(id).unwrap().position.within(pos(2, 2), threshold));
    }
}

#[test]
fn test_mixed_air_and_ground_share_one_box() {
    let mut scenario = two_player_scenario();
    let executor = standard_executor();
    let marine = spawn(&mut scenario, "Marine", RED, 0, 0);
    let wraith = spawn(&mut scenario, "Wraith", RED, 4, 0);

    scenario.step(&executor, &[order(Some("Move"), &[marine, wraith], 30, 0)]);
    for _ in 0..40 {
        scenario.step(&executor, &[]);
    }

    assert_eq!(scenario.world().entity(marine).unwrap().position, pos(28, 0));
    assert_eq!(scenario.world().entity(wraith).unwrap().position, pos(32, 0));
}

proptest! {
    #[test]
    fn prop_target_inside_group_is_shared(group in arb_ground_group(8)) {
        let target = group[0].position;
        let result = MagicBox::compute(
            &group,
            target,
            Vec2Fixed::from_int(12, 12),
            Vec2Fixed::from_int(20, 20),
        );
        prop_assert!(!result.preserves_formation());
        for member in &group {
            prop_assert_eq!(result.target_of(member.id), Some(target));
        }
    }

    #[test]
    fn prop_roomy_boxes_keep_offsets(group in arb_ground_group(8)) {
        let roomy = Vec2Fixed::from_int(1000, 1000);
        let result = MagicBox::compute(&group, Vec2Fixed::from_int(200, 200), roomy, roomy);
        prop_assert!(result.preserves_formation());

        let anchor = group[0];
        let anchor_target = result.target_of(anchor.id).unwrap();
        for member in &group {
            let target = result.target_of(member.id).unwrap();
            prop_assert_eq!(target - anchor_target, member.position - anchor.position);
        }
    }
}
