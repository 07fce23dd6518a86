//! Recipient entities and their storage.
//!
//! Entities are collaborators of the command engine: executions reference
//! them by id and steer them through a handful of fields (move target,
//! attack target, motion status, production line). Each entity points back
//! at the single execution currently driving it.

use std::collections::{BTreeMap, VecDeque};

use serde::{Deserialize, Serialize};

use crate::execution::ExecutionId;
use crate::math::Vec2Fixed;
use crate::player::PlayerIndex;

/// Unique identifier for entities.
pub type EntityId = u32;

/// Physical status of an entity with respect to flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MotionStatus {
    /// Grounded and immobile (landed building, static defense).
    Fixed,
    /// Mobile ground unit.
    OnGround,
    /// Transitioning from `Fixed` to `InAir`.
    TakingOff,
    /// Airborne.
    InAir,
    /// Transitioning from `InAir` to the ground.
    Landing,
}

impl MotionStatus {
    /// Whether the entity is between two stable states.
    #[must_use]
    pub const fn is_transitional(self) -> bool {
        matches!(self, Self::TakingOff | Self::Landing)
    }

    /// Whether the entity may move this tick.
    #[must_use]
    pub const fn can_move(self) -> bool {
        matches!(self, Self::OnGround | Self::InAir)
    }
}

/// Production queue of a building.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ProductionLine {
    /// Element type names waiting to be produced, front first.
    pub queue: VecDeque<String>,
    /// Ticks spent on the front item.
    pub progress: u32,
}

impl ProductionLine {
    /// Whether nothing is queued.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.queue.is_empty()
    }
}

/// A unit or building on the map.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Entity {
    /// Unique identifier.
    pub id: EntityId,
    /// Element type name.
    pub element_type: String,
    /// Owning player.
    pub owner: PlayerIndex,
    /// World position.
    pub position: Vec2Fixed,
    /// Remaining hit points.
    pub hp: u32,
    /// Flight status.
    pub motion: MotionStatus,
    /// Ticks left in the current take-off or landing transition.
    pub transition_ticks: u32,
    /// Where the entity is heading, if anywhere.
    pub move_target: Option<Vec2Fixed>,
    /// Entity to fire at when in range.
    pub attack_target: Option<EntityId>,
    /// Ticks until the weapon can fire again.
    pub weapon_cooldown: u32,
    /// Production queue (buildings only).
    pub production: ProductionLine,
    /// Whether the entity is attached to the map.
    pub attached: bool,
    /// Execution currently driving this entity.
    pub current_execution: Option<ExecutionId>,
}

impl Entity {
    /// Create an attached entity with no orders.
    #[must_use]
    pub fn new(
        id: EntityId,
        element_type: impl Into<String>,
        owner: PlayerIndex,
        position: Vec2Fixed,
        hp: u32,
        motion: MotionStatus,
    ) -> Self {
        Self {
            id,
            element_type: element_type.into(),
            owner,
            position,
            hp,
            motion,
            transition_ticks: 0,
            move_target: None,
            attack_target: None,
            weapon_cooldown: 0,
            production: ProductionLine::default(),
            attached: true,
            current_execution: None,
        }
    }

    /// Whether the entity is alive and on the map.
    #[must_use]
    pub const fn is_live(&self) -> bool {
        self.attached && self.hp > 0
    }

    /// Drop movement and firing orders.
    pub fn halt(&mut self) {
        self.move_target = None;
        self.attack_target = None;
    }
}

/// Storage for all entities in a scenario.
///
/// Backed by a `BTreeMap` so every iteration is in ascending id order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityStorage {
    entities: BTreeMap<EntityId, Entity>,
    next_id: EntityId,
}

impl Default for EntityStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityStorage {
    /// Create empty entity storage.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entities: BTreeMap::new(),
            next_id: 1,
        }
    }

    /// Reserve the next entity id.
    pub fn allocate_id(&mut self) -> EntityId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Insert an entity under its own id.
    pub fn insert(&mut self, entity: Entity) {
        self.entities.insert(entity.id, entity);
    }

    /// Remove an entity by id.
    pub fn remove(&mut self, id: EntityId) -> Option<Entity> {
        self.entities.remove(&id)
    }

    /// Get an entity by id.
    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    /// Get a mutable reference to an entity by id.
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    /// Number of entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Whether storage is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Entity ids in ascending order.
    #[must_use]
    pub fn ids(&self) -> Vec<EntityId> {
        self.entities.keys().copied().collect()
    }

    /// Iterate entities in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(id: EntityId) -> Entity {
        Entity::new(
            id,
            "Marine",
            PlayerIndex(0),
            Vec2Fixed::ZERO,
            40,
            MotionStatus::OnGround,
        )
    }

    #[test]
    fn test_storage_orders_ids() {
        let mut storage = EntityStorage::new();
        let a = storage.allocate_id();
        let b = storage.allocate_id();
        storage.insert(unit(b));
        storage.insert(unit(a));
        assert_eq!(storage.ids(), vec![1, 2]);
        assert_eq!(storage.iter().map(|e| e.id).collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn test_liveness() {
        let mut entity = unit(1);
        assert!(entity.is_live());
        entity.hp = 0;
        assert!(!entity.is_live());
        entity.hp = 10;
        entity.attached = false;
        assert!(!entity.is_live());
    }

    #[test]
    fn test_motion_status_classes() {
        assert!(MotionStatus::TakingOff.is_transitional());
        assert!(MotionStatus::Landing.is_transitional());
        assert!(!MotionStatus::Fixed.is_transitional());
        assert!(MotionStatus::InAir.can_move());
        assert!(!MotionStatus::Fixed.can_move());
    }
}
