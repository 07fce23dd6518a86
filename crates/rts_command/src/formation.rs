//! Formation-preserving move targets ("magic box").
//!
//! When a group is sent somewhere outside its own bounding box and the
//! group is tight enough, every member keeps its offset from the group
//! center. Otherwise everyone heads for the clicked point.

use std::collections::BTreeMap;

use crate::entity::{EntityId, MotionStatus};
use crate::math::{RectFixed, Vec2Fixed};
use crate::world::World;

/// Input of the computation: where a member is and whether it flies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormationMember {
    /// Entity id.
    pub id: EntityId,
    /// Current position.
    pub position: Vec2Fixed,
    /// Airborne members use the air box threshold.
    pub flying: bool,
}

/// Per-member move targets for a group order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MagicBox {
    targets: BTreeMap<EntityId, Vec2Fixed>,
    preserved: bool,
}

impl MagicBox {
    /// Compute targets for `members` ordered towards `target`.
    ///
    /// `ground_box` and `air_box` bound how far (per axis) a member may sit
    /// from the group box origin for the formation to be kept.
    #[must_use]
    pub fn compute(
        members: &[FormationMember],
        target: Vec2Fixed,
        ground_box: Vec2Fixed,
        air_box: Vec2Fixed,
    ) -> Self {
        let common = |preserved| Self {
            targets: members.iter().map(|m| (m.id, target)).collect(),
            preserved,
        };

        let Some(bounds) = RectFixed::bounding(members.iter().map(|m| m.position)) else {
            return Self::default();
        };
        if bounds.contains(target) {
            return common(false);
        }

        let bounds = bounds.padded();
        let within = |m: &FormationMember| {
            let limit = if m.flying { air_box } else { ground_box };
            let dx = (m.position.x - bounds.origin.x).abs();
            let dy = (m.position.y - bounds.origin.y).abs();
            dx <= limit.x && dy <= limit.y
        };
        if !members.iter().all(within) {
            return common(false);
        }

        let center = bounds.center();
        Self {
            targets: members
                .iter()
                .map(|m| (m.id, target + (m.position - center)))
                .collect(),
            preserved: true,
        }
    }

    /// Compute targets for live entities of `world`, using the configured boxes.
    #[must_use]
    pub fn for_selection(world: &World, selection: &[EntityId], target: Vec2Fixed) -> Self {
        let members: Vec<FormationMember> = selection
            .iter()
            .filter_map(|&id| {
                let entity = world.entity(id)?;
                Some(FormationMember {
                    id,
                    position: entity.position,
                    flying: matches!(
                        entity.motion,
                        MotionStatus::InAir | MotionStatus::TakingOff | MotionStatus::Landing
                    ),
                })
            })
            .collect();
        let config = world.config();
        Self::compute(&members, target, config.ground_box, config.air_box)
    }

    /// Target assigned to a member.
    #[must_use]
    pub fn target_of(&self, id: EntityId) -> Option<Vec2Fixed> {
        self.targets.get(&id).copied()
    }

    /// Target of a member, or `fallback` for non-members.
    #[must_use]
    pub fn target_or(&self, id: EntityId, fallback: Vec2Fixed) -> Vec2Fixed {
        self.target_of(id).unwrap_or(fallback)
    }

    /// Whether members kept their relative offsets.
    #[must_use]
    pub const fn preserves_formation(&self) -> bool {
        self.preserved
    }

    /// Number of members with a target.
    #[must_use]
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    /// Whether no member has a target.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}
