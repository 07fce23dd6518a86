//! Test fixtures and helpers.
//!
//! Pre-built scenarios and entity placements for consistent testing.
//! Fixtures panic on setup failure; they are for tests only.

use fixed::types::I32F32;
use rts_command::config::EngineConfig;
use rts_command::entity::EntityId;
use rts_command::envelope::CommandEnvelope;
use rts_command::executor::CommandExecutor;
use rts_command::math::Vec2Fixed;
use rts_command::player::{PlayerIndex, Race};
use rts_command::scenario::Scenario;

/// Scenario id used by fixture scenarios.
pub const FIXTURE_SCENARIO: u32 = 1;

/// The first player.
pub const RED: PlayerIndex = PlayerIndex(0);

/// The second player.
pub const BLUE: PlayerIndex = PlayerIndex(1);

/// Create a fixed-point number from an integer.
#[must_use]
pub fn fixed(n: i32) -> I32F32 {
    I32F32::from_num(n)
}

/// Create a fixed-point number from a float (for tests only).
///
/// Note: In real simulation code, never use floats.
/// This is only for convenient test setup.
#[must_use]
pub fn fixed_f(n: f64) -> I32F32 {
    I32F32::from_num(n)
}

/// Create a position from integer coordinates.
#[must_use]
pub fn pos(x: i32, y: i32) -> Vec2Fixed {
    Vec2Fixed::from_int(x, y)
}

/// Executor with the standard factories for the default config.
///
/// # Panics
///
/// Panics if the default config does not produce a valid registry.
#[must_use]
pub fn standard_executor() -> CommandExecutor {
    CommandExecutor::standard(&EngineConfig::default()).expect("default executor")
}

/// Empty two-player Terran scenario, red starting at the origin and blue at (60, 60).
///
/// # Panics
///
/// Panics if the default config is invalid.
#[must_use]
pub fn two_player_scenario() -> Scenario {
    let mut scenario = Scenario::new(FIXTURE_SCENARIO, EngineConfig::default()).expect("scenario");
    scenario.add_player(RED, Race::Terran, pos(0, 0));
    scenario.add_player(BLUE, Race::Terran, pos(60, 60));
    scenario
}

/// Spawn an entity at integer coordinates.
///
/// # Panics
///
/// Panics if the element type is unknown.
pub fn spawn(
    scenario: &mut Scenario,
    element_type: &str,
    owner: PlayerIndex,
    x: i32,
    y: i32,
) -> EntityId {
    scenario
        .spawn(element_type, owner, pos(x, y))
        .unwrap_or_else(|e| panic!("spawn {element_type}: {e}"))
}

/// Two marine squads facing each other across a gap.
///
/// Returns the scenario, red's marines and blue's marines.
#[must_use]
pub fn skirmish_scenario() -> (Scenario, Vec<EntityId>, Vec<EntityId>) {
    let mut scenario = two_player_scenario();
    let red = (0..3)
        .map(|i| spawn(&mut scenario, "Marine", RED, 0, 2 * i))
        .collect();
    let blue = (0..3)
        .map(|i| spawn(&mut scenario, "Marine", BLUE, 30, 2 * i))
        .collect();
    (scenario, red, blue)
}

/// Envelope with a target position.
///
/// # Panics
///
/// Panics if `recipients` is empty.
#[must_use]
pub fn order(command_type: Option<&str>, recipients: &[EntityId], x: i32, y: i32) -> CommandEnvelope {
    CommandEnvelope::new(command_type, recipients.to_vec())
        .expect("non-empty recipients")
        .with_target_position(pos(x, y))
}

/// Envelope aimed at an entity.
///
/// # Panics
///
/// Panics if `recipients` is empty.
#[must_use]
pub fn order_on(
    command_type: Option<&str>,
    recipients: &[EntityId],
    target: EntityId,
) -> CommandEnvelope {
    CommandEnvelope::new(command_type, recipients.to_vec())
        .expect("non-empty recipients")
        .with_target_entity(target)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skirmish_layout() {
        let (scenario, red, blue) = skirmish_scenario();
        assert_eq!(red.len(), 3);
        assert_eq!(blue.len(), 3);
        assert!(scenario.world().are_enemies(red[0], blue[0]));
        assert!(!scenario.world().are_enemies(red[0], red[1]));
    }

    #[test]
    fn test_order_builders() {
        let envelope = order(Some("Move"), &[1, 2], 5, -3);
        assert_eq!(envelope.recipients(), &[1, 2]);
        assert_eq!(envelope.target_position(), pos(5, -3));

        let envelope = order_on(None, &[4], 9);
        assert_eq!(envelope.command_type(), None);
        assert_eq!(envelope.target_entity(), Some(9));
    }
}
