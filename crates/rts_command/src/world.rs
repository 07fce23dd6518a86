//! Entity world the command engine drives.
//!
//! The world owns entities, players and the engine configuration, and runs
//! the physics pass executions rely on. Executions never move entities
//! directly: they set move and attack targets, and [`World::advance`] turns
//! those into motion, damage, deaths and production.
//!
//! # Determinism
//!
//! - All math is fixed-point
//! - Entities are processed in ascending id order
//! - Nearest-entity queries break distance ties by lower id

use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::config::{ElementType, EngineConfig};
use crate::entity::{Entity, EntityId, EntityStorage, MotionStatus};
use crate::error::{CommandError, Result};
use crate::math::{Fixed, Vec2Fixed};
use crate::player::{Player, PlayerIndex, Race};

/// Damage dealt during a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DamageEvent {
    /// Entity that fired.
    pub attacker: EntityId,
    /// Entity that was hit.
    pub target: EntityId,
    /// Damage dealt.
    pub damage: u32,
}

/// Outcome of one physics pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PhysicsEvents {
    /// Damage dealt this tick.
    pub damage: Vec<DamageEvent>,
    /// Entities whose hit points reached zero. Still stored; the owner removes them.
    pub deaths: Vec<EntityId>,
    /// Entities produced this tick.
    pub spawned: Vec<EntityId>,
}

/// Offset from a building at which produced units appear.
const SPAWN_OFFSET: i32 = 2;

/// Entities, players and configuration of one scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct World {
    id: u32,
    tick: u64,
    config: EngineConfig,
    entities: EntityStorage,
    players: BTreeMap<PlayerIndex, Player>,
}

impl World {
    /// Create an empty world with a validated config.
    pub fn new(id: u32, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            id,
            tick: 0,
            config,
            entities: EntityStorage::new(),
            players: BTreeMap::new(),
        })
    }

    /// Scenario id this world belongs to.
    #[must_use]
    pub const fn id(&self) -> u32 {
        self.id
    }

    /// Current tick.
    #[must_use]
    pub const fn tick(&self) -> u64 {
        self.tick
    }

    pub(crate) fn increment_tick(&mut self) {
        self.tick += 1;
    }

    /// Engine configuration.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Entity storage.
    #[must_use]
    pub const fn entities(&self) -> &EntityStorage {
        &self.entities
    }

    /// Look up an element type by name.
    #[must_use]
    pub fn element_type(&self, name: &str) -> Option<&ElementType> {
        self.config.element_type(name)
    }

    /// Element type of an entity.
    #[must_use]
    pub fn type_of(&self, id: EntityId) -> Option<&ElementType> {
        self.entities
            .get(id)
            .and_then(|e| self.config.element_type(&e.element_type))
    }

    /// Get an entity by id.
    #[must_use]
    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(id)
    }

    /// Get a mutable entity by id.
    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(id)
    }

    /// Whether the entity exists, is attached and alive.
    #[must_use]
    pub fn is_live(&self, id: EntityId) -> bool {
        self.entities.get(id).is_some_and(Entity::is_live)
    }

    /// Add a player slot, replacing any existing one with the same index.
    pub fn add_player(&mut self, index: PlayerIndex, race: Race, start_location: Vec2Fixed) {
        let mut player = Player::new(index, race);
        player.start_location = start_location;
        self.players.insert(index, player);
    }

    /// Get a player.
    #[must_use]
    pub fn player(&self, index: PlayerIndex) -> Option<&Player> {
        self.players.get(&index)
    }

    /// Get a mutable player.
    pub fn player_mut(&mut self, index: PlayerIndex) -> Option<&mut Player> {
        self.players.get_mut(&index)
    }

    /// Iterate players in index order.
    pub fn players(&self) -> impl Iterator<Item = &Player> {
        self.players.values()
    }

    /// Spawn an entity of a known element type for an existing player.
    ///
    /// Flying types start in the air, liftable buildings and immobile types
    /// start fixed, everything else on the ground.
    pub fn spawn(
        &mut self,
        element_type: &str,
        owner: PlayerIndex,
        position: Vec2Fixed,
    ) -> Result<EntityId> {
        let element = self
            .config
            .element_type(element_type)
            .ok_or_else(|| CommandError::UnknownElementType(element_type.to_string()))?;
        let motion = if element.flying {
            MotionStatus::InAir
        } else if element.liftable || !element.is_mobile() {
            MotionStatus::Fixed
        } else {
            MotionStatus::OnGround
        };
        let max_hp = element.max_hp;
        let supply_provided = element.supply_provided;

        let player = self
            .players
            .get_mut(&owner)
            .ok_or(CommandError::UnknownPlayer(owner))?;
        player.supply_limit += supply_provided;

        let id = self.entities.allocate_id();
        self.entities
            .insert(Entity::new(id, element_type, owner, position, max_hp, motion));
        tracing::trace!(id, element_type, ?owner, "Spawned entity");
        Ok(id)
    }

    /// Remove an entity and release the supply it held.
    ///
    /// Callers owning executions should go through the scenario so the
    /// entity is detached from its execution first.
    pub fn despawn(&mut self, id: EntityId) -> Option<Entity> {
        let mut entity = self.entities.remove(id)?;
        entity.attached = false;
        if let Some(element) = self.config.element_type(&entity.element_type) {
            let (cost, provided) = (element.supply_cost, element.supply_provided);
            if let Some(player) = self.players.get_mut(&entity.owner) {
                player.supply_used = player.supply_used.saturating_sub(cost);
                player.supply_limit = player.supply_limit.saturating_sub(provided);
            }
        }
        Some(entity)
    }

    /// Whether two entities belong to different players.
    #[must_use]
    pub fn are_enemies(&self, a: EntityId, b: EntityId) -> bool {
        match (self.entities.get(a), self.entities.get(b)) {
            (Some(a), Some(b)) => a.owner != b.owner,
            _ => false,
        }
    }

    /// Nearest live enemy of `of` within `radius`.
    ///
    /// Ties are broken by the lower entity id.
    #[must_use]
    pub fn nearest_enemy(&self, of: EntityId, radius: Fixed) -> Option<EntityId> {
        let me = self.entities.get(of)?;
        let radius_sq = radius.saturating_mul(radius);
        self.entities
            .iter()
            .filter(|e| e.owner != me.owner && e.is_live())
            .map(|e| (me.position.distance_squared(e.position), e.id))
            .filter(|(dist_sq, _)| *dist_sq <= radius_sq)
            .min()
            .map(|(_, id)| id)
    }

    /// Whether `target` is within weapon range of `attacker`.
    #[must_use]
    pub fn in_weapon_range(&self, attacker: EntityId, target: EntityId) -> bool {
        let Some(weapon) = self.type_of(attacker).and_then(|t| t.weapon) else {
            return false;
        };
        match (self.entities.get(attacker), self.entities.get(target)) {
            (Some(a), Some(t)) => a.position.within(t.position, weapon.range),
            _ => false,
        }
    }

    /// Run one physics pass: flight transitions, movement, combat, production.
    ///
    /// Does not remove dead entities and does not advance the tick counter.
    pub fn advance(&mut self) -> PhysicsEvents {
        let ids = self.entities.ids();
        let mut events = PhysicsEvents::default();

        self.run_flight_transitions(&ids);
        self.run_movement(&ids);
        events.damage = self.run_combat(&ids);
        events.deaths = ids
            .iter()
            .copied()
            .filter(|&id| self.entities.get(id).is_some_and(|e| e.hp == 0))
            .collect();
        events.spawned = self.run_production(&ids);
        events
    }

    fn run_flight_transitions(&mut self, ids: &[EntityId]) {
        for &id in ids {
            let liftable = self.type_of(id).is_some_and(|t| t.liftable);
            let Some(entity) = self.entities.get_mut(id) else {
                continue;
            };
            if !entity.motion.is_transitional() {
                continue;
            }
            entity.transition_ticks = entity.transition_ticks.saturating_sub(1);
            if entity.transition_ticks > 0 {
                continue;
            }
            entity.motion = match entity.motion {
                MotionStatus::TakingOff => MotionStatus::InAir,
                _ if liftable => MotionStatus::Fixed,
                _ => MotionStatus::OnGround,
            };
            tracing::trace!(id, motion = ?entity.motion, "Flight transition complete");
        }
    }

    fn run_movement(&mut self, ids: &[EntityId]) {
        let threshold = self.config.arrival_threshold;
        for &id in ids {
            let speed = self.type_of(id).map_or(Fixed::ZERO, |t| t.speed);
            let Some(entity) = self.entities.get_mut(id) else {
                continue;
            };
            let Some(target) = entity.move_target else {
                continue;
            };
            if !entity.motion.can_move() || speed == Fixed::ZERO {
                continue;
            }
            entity.position = entity.position.step_towards(target, speed);
            if entity.position.within(target, threshold) {
                entity.move_target = None;
            }
        }
    }

    fn run_combat(&mut self, ids: &[EntityId]) -> Vec<DamageEvent> {
        let mut damage_events = Vec::new();

        for &attacker in ids {
            let Some(weapon) = self.type_of(attacker).and_then(|t| t.weapon) else {
                continue;
            };
            let Some(entity) = self.entities.get_mut(attacker) else {
                continue;
            };
            entity.weapon_cooldown = entity.weapon_cooldown.saturating_sub(1);
            let Some(target) = entity.attack_target else {
                continue;
            };
            if !entity.is_live() {
                continue;
            }
            let ready = entity.weapon_cooldown == 0;

            if !self.is_live(target) {
                if let Some(entity) = self.entities.get_mut(attacker) {
                    entity.attack_target = None;
                }
                continue;
            }
            if !ready || !self.in_weapon_range(attacker, target) {
                continue;
            }

            if let Some(victim) = self.entities.get_mut(target) {
                victim.hp = victim.hp.saturating_sub(weapon.damage);
            }
            if let Some(entity) = self.entities.get_mut(attacker) {
                entity.weapon_cooldown = weapon.cooldown;
            }
            damage_events.push(DamageEvent {
                attacker,
                target,
                damage: weapon.damage,
            });
        }

        damage_events
    }

    fn run_production(&mut self, ids: &[EntityId]) -> Vec<EntityId> {
        let mut spawned = Vec::new();

        for &id in ids {
            let Some(entity) = self.entities.get_mut(id) else {
                continue;
            };
            if entity.motion != MotionStatus::Fixed || !entity.is_live() {
                continue;
            }
            let Some(front) = entity.production.queue.front().cloned() else {
                continue;
            };
            entity.production.progress += 1;
            let (owner, position, progress) =
                (entity.owner, entity.position, entity.production.progress);

            let build_time = self.config.element_type(&front).map_or(0, |t| t.build_time);
            if progress < build_time {
                continue;
            }

            if let Some(entity) = self.entities.get_mut(id) {
                entity.production.queue.pop_front();
                entity.production.progress = 0;
            }
            let offset = Vec2Fixed::from_int(SPAWN_OFFSET, SPAWN_OFFSET);
            match self.spawn_produced(&front, owner, position + offset) {
                Some(unit) => {
                    tracing::debug!(building = id, unit, element_type = %front, "Production complete");
                    spawned.push(unit);
                }
                None => tracing::warn!(building = id, element_type = %front, "Produced type vanished"),
            }
        }

        spawned
    }

    /// Spawn a produced unit. Supply was already paid at enqueue time.
    fn spawn_produced(
        &mut self,
        element_type: &str,
        owner: PlayerIndex,
        position: Vec2Fixed,
    ) -> Option<EntityId> {
        self.spawn(element_type, owner, position).ok()
    }

    /// Feed the world state into a hasher.
    pub fn hash_into<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
        self.tick.hash(state);
        self.entities.len().hash(state);
        for entity in self.entities.iter() {
            entity.hash(state);
        }
        for player in self.players.values() {
            player.hash(state);
        }
    }

    /// Serialize the world with bincode.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serialize(self)
            .map_err(|e| CommandError::Replay(format!("Failed to serialize world: {e}")))
    }

    /// Deserialize a world produced by [`World::to_bytes`].
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        bincode::deserialize(data)
            .map_err(|e| CommandError::Replay(format!("Failed to deserialize world: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn world() -> World {
        let mut world = World::new(1, EngineConfig::default()).unwrap();
        world.add_player(PlayerIndex(0), Race::Terran, Vec2Fixed::ZERO);
        world.add_player(PlayerIndex(1), Race::Terran, Vec2Fixed::from_int(50, 50));
        world
    }

    #[test]
    fn test_spawn_sets_motion_status() {
        let mut world = world();
        let marine = world.spawn("Marine", PlayerIndex(0), Vec2Fixed::ZERO).unwrap();
        let wraith = world.spawn("Wraith", PlayerIndex(0), Vec2Fixed::ZERO).unwrap();
        let cc = world
            .spawn("CommandCenter", PlayerIndex(0), Vec2Fixed::ZERO)
            .unwrap();
        let turret = world
            .spawn("MissileTurret", PlayerIndex(0), Vec2Fixed::ZERO)
            .unwrap();

        assert_eq!(world.entity(marine).unwrap().motion, MotionStatus::OnGround);
        assert_eq!(world.entity(wraith).unwrap().motion, MotionStatus::InAir);
        assert_eq!(world.entity(cc).unwrap().motion, MotionStatus::Fixed);
        assert_eq!(world.entity(turret).unwrap().motion, MotionStatus::Fixed);
        assert_eq!(world.player(PlayerIndex(0)).unwrap().supply_limit, 10);
    }

    #[test]
    fn test_spawn_unknown_type_or_player() {
        let mut world = world();
        assert!(matches!(
            world.spawn("Zealot", PlayerIndex(0), Vec2Fixed::ZERO),
            Err(CommandError::UnknownElementType(_))
        ));
        assert!(matches!(
            world.spawn("Marine", PlayerIndex(7), Vec2Fixed::ZERO),
            Err(CommandError::UnknownPlayer(PlayerIndex(7)))
        ));
    }

    #[test]
    fn test_movement_reaches_target() {
        let mut world = world();
        let id = world.spawn("Marine", PlayerIndex(0), Vec2Fixed::ZERO).unwrap();
        world.entity_mut(id).unwrap().move_target = Some(Vec2Fixed::from_int(3, 0));

        for _ in 0..3 {
            world.advance();
        }
        let entity = world.entity(id).unwrap();
        assert_eq!(entity.position, Vec2Fixed::from_int(3, 0));
        assert_eq!(entity.move_target, None);
    }

    #[test]
    fn test_distant_move_target_steps_normally() {
        let mut world = world();
        let id = world.spawn("Marine", PlayerIndex(0), Vec2Fixed::ZERO).unwrap();
        let target = Vec2Fixed::from_int(50_000, 0);
        world.entity_mut(id).unwrap().move_target = Some(target);

        world.advance();
        let entity = world.entity(id).unwrap();
        assert_eq!(entity.position.y, Fixed::ZERO);
        assert!(entity.position.x > Fixed::from_num(0.99));
        assert!(entity.position.x < Fixed::from_num(1.01));
        assert_eq!(entity.move_target, Some(target));
    }

    #[test]
    fn test_fixed_entities_do_not_move() {
        let mut world = world();
        let id = world
            .spawn("CommandCenter", PlayerIndex(0), Vec2Fixed::ZERO)
            .unwrap();
        world.entity_mut(id).unwrap().move_target = Some(Vec2Fixed::from_int(3, 0));
        world.advance();
        assert_eq!(world.entity(id).unwrap().position, Vec2Fixed::ZERO);
    }

    #[test]
    fn test_takeoff_transition() {
        let mut world = world();
        let id = world
            .spawn("CommandCenter", PlayerIndex(0), Vec2Fixed::ZERO)
            .unwrap();
        {
            let entity = world.entity_mut(id).unwrap();
            entity.motion = MotionStatus::TakingOff;
            entity.transition_ticks = 2;
        }
        world.advance();
        assert_eq!(world.entity(id).unwrap().motion, MotionStatus::TakingOff);
        world.advance();
        assert_eq!(world.entity(id).unwrap().motion, MotionStatus::InAir);
    }

    #[test]
    fn test_combat_deals_damage_in_range() {
        let mut world = world();
        let marine = world.spawn("Marine", PlayerIndex(0), Vec2Fixed::ZERO).unwrap();
        let enemy = world
            .spawn("Marine", PlayerIndex(1), Vec2Fixed::from_int(3, 0))
            .unwrap();
        world.entity_mut(marine).unwrap().attack_target = Some(enemy);

        let events = world.advance();
        assert_eq!(
            events.damage,
            vec![DamageEvent {
                attacker: marine,
                target: enemy,
                damage: 6
            }]
        );
        assert_eq!(world.entity(enemy).unwrap().hp, 34);

        // Cooldown blocks the next shot.
        let events = world.advance();
        assert!(events.damage.is_empty());
    }

    #[test]
    fn test_deaths_are_reported() {
        let mut world = world();
        let marine = world.spawn("Marine", PlayerIndex(0), Vec2Fixed::ZERO).unwrap();
        let enemy = world
            .spawn("Marine", PlayerIndex(1), Vec2Fixed::from_int(1, 0))
            .unwrap();
        world.entity_mut(enemy).unwrap().hp = 5;
        world.entity_mut(marine).unwrap().attack_target = Some(enemy);

        let events = world.advance();
        assert_eq!(events.deaths, vec![enemy]);
    }

    #[test]
    fn test_nearest_enemy_tie_breaks_by_id() {
        let mut world = world();
        let me = world.spawn("Marine", PlayerIndex(0), Vec2Fixed::ZERO).unwrap();
        let a = world
            .spawn("Marine", PlayerIndex(1), Vec2Fixed::from_int(3, 0))
            .unwrap();
        let _b = world
            .spawn("Marine", PlayerIndex(1), Vec2Fixed::from_int(0, 3))
            .unwrap();
        let _far = world
            .spawn("Marine", PlayerIndex(1), Vec2Fixed::from_int(30, 0))
            .unwrap();

        assert_eq!(world.nearest_enemy(me, Fixed::from_num(7)), Some(a));
        assert_eq!(world.nearest_enemy(me, Fixed::from_num(2)), None);
    }

    #[test]
    fn test_production_spawns_unit() {
        let mut world = world();
        let cc = world
            .spawn("CommandCenter", PlayerIndex(0), Vec2Fixed::ZERO)
            .unwrap();
        world
            .entity_mut(cc)
            .unwrap()
            .production
            .queue
            .push_back("SCV".to_string());

        let build_time = world.element_type("SCV").unwrap().build_time;
        let mut spawned = Vec::new();
        for _ in 0..build_time {
            spawned.extend(world.advance().spawned);
        }
        assert_eq!(spawned.len(), 1);
        let scv = world.entity(spawned[0]).unwrap();
        assert_eq!(scv.element_type, "SCV");
        assert_eq!(scv.position, Vec2Fixed::from_int(2, 2));
        assert!(world.entity(cc).unwrap().production.is_idle());
    }

    #[test]
    fn test_despawn_releases_supply() {
        let mut world = world();
        let cc = world
            .spawn("CommandCenter", PlayerIndex(0), Vec2Fixed::ZERO)
            .unwrap();
        assert_eq!(world.player(PlayerIndex(0)).unwrap().supply_limit, 10);
        let removed = world.despawn(cc).unwrap();
        assert!(!removed.attached);
        assert_eq!(world.player(PlayerIndex(0)).unwrap().supply_limit, 0);
    }

    #[test]
    fn test_world_bytes_roundtrip() {
        let mut world = world();
        world.spawn("Marine", PlayerIndex(0), Vec2Fixed::ZERO).unwrap();
        let bytes = world.to_bytes().unwrap();
        assert_eq!(World::from_bytes(&bytes).unwrap(), world);
    }
}
