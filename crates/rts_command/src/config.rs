//! Engine configuration and element-type metadata.
//!
//! Everything tunable lives in [`EngineConfig`]: formation box sizes,
//! movement thresholds, take-off and landing durations and the element
//! type table that stands in for unit metadata. The defaults are built in;
//! a RON file can override them.
//!
//! # Example RON
//!
//! ```ron
//! EngineConfig(
//!     ground_box: (x: 51539607552, y: 51539607552),  // 12.0
//!     air_box: (x: 85899345920, y: 85899345920),     // 20.0
//!     arrival_threshold: 2147483648,                 // 0.5
//!     takeoff_ticks: 8,
//!     landing_ticks: 8,
//!     production_queue_capacity: 5,
//!     starting_minerals: 50,
//!     element_types: [],
//! )
//! ```

use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CommandError, Result};
use crate::math::{fixed_serde, Fixed, Vec2Fixed};

/// Weapon statistics of an armed element type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WeaponStats {
    /// Damage per shot.
    pub damage: u32,
    /// Firing range in map units.
    #[serde(with = "fixed_serde")]
    pub range: Fixed,
    /// Ticks between shots.
    pub cooldown: u32,
}

/// Static description of an element type (unit or building).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementType {
    /// Unique type name, also the factory entity-type key.
    pub name: String,
    /// Maximum hit points.
    pub max_hp: u32,
    /// Movement speed in map units per tick. Zero for immobile types.
    #[serde(with = "fixed_serde")]
    pub speed: Fixed,
    /// Always airborne.
    #[serde(default)]
    pub flying: bool,
    /// Building that can take off and land.
    #[serde(default)]
    pub liftable: bool,
    /// Weapon, if the type can attack.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weapon: Option<WeaponStats>,
    /// Radius for spotting enemies.
    #[serde(with = "fixed_serde")]
    pub sight_range: Fixed,
    /// Mineral cost to produce.
    #[serde(default)]
    pub mineral_cost: u32,
    /// Supply taken when produced.
    #[serde(default)]
    pub supply_cost: u32,
    /// Supply provided while alive.
    #[serde(default)]
    pub supply_provided: u32,
    /// Ticks to produce.
    #[serde(default)]
    pub build_time: u32,
    /// Element types this type can produce.
    #[serde(default)]
    pub produces: Vec<String>,
}

impl ElementType {
    /// Whether entities of this type can ever move.
    #[must_use]
    pub fn is_mobile(&self) -> bool {
        self.speed > Fixed::ZERO
    }

    /// Whether this type can produce `other`.
    #[must_use]
    pub fn can_produce(&self, other: &str) -> bool {
        self.produces.iter().any(|p| p == other)
    }

    fn unit(name: &str, max_hp: u32, speed: i32, sight: i32) -> Self {
        Self {
            name: name.to_string(),
            max_hp,
            speed: Fixed::from_num(speed),
            flying: false,
            liftable: false,
            weapon: None,
            sight_range: Fixed::from_num(sight),
            mineral_cost: 0,
            supply_cost: 0,
            supply_provided: 0,
            build_time: 0,
            produces: Vec::new(),
        }
    }

    fn with_weapon(mut self, damage: u32, range: i32, cooldown: u32) -> Self {
        self.weapon = Some(WeaponStats {
            damage,
            range: Fixed::from_num(range),
            cooldown,
        });
        self
    }

    fn with_cost(mut self, minerals: u32, supply: u32, build_time: u32) -> Self {
        self.mineral_cost = minerals;
        self.supply_cost = supply;
        self.build_time = build_time;
        self
    }
}

/// Tunables of the command engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Max distance of a ground unit from the group box origin for formation moves.
    pub ground_box: Vec2Fixed,
    /// Same threshold for airborne units.
    pub air_box: Vec2Fixed,
    /// Distance at which a move target counts as reached.
    #[serde(with = "fixed_serde")]
    pub arrival_threshold: Fixed,
    /// Ticks spent in the take-off transition.
    pub takeoff_ticks: u32,
    /// Ticks spent in the landing transition.
    pub landing_ticks: u32,
    /// Maximum queued items per producing building.
    pub production_queue_capacity: usize,
    /// Minerals granted by player initializers.
    pub starting_minerals: u32,
    /// Element type table.
    pub element_types: Vec<ElementType>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let mut command_center = ElementType::unit("CommandCenter", 1500, 1, 10);
        command_center.liftable = true;
        command_center.supply_provided = 10;
        command_center.produces = vec!["SCV".to_string()];

        let mut barracks = ElementType::unit("Barracks", 1000, 1, 8);
        barracks.liftable = true;
        barracks.produces = vec!["Marine".to_string()];

        let mut wraith = ElementType::unit("Wraith", 120, 2, 7)
            .with_weapon(9, 5, 22)
            .with_cost(150, 2, 60);
        wraith.flying = true;

        Self {
            ground_box: Vec2Fixed::from_int(12, 12),
            air_box: Vec2Fixed::from_int(20, 20),
            arrival_threshold: Fixed::from_num(1) / Fixed::from_num(2),
            takeoff_ticks: 8,
            landing_ticks: 8,
            production_queue_capacity: 5,
            starting_minerals: 50,
            element_types: vec![
                ElementType::unit("SCV", 60, 1, 7)
                    .with_weapon(5, 1, 15)
                    .with_cost(50, 1, 20),
                ElementType::unit("Marine", 40, 1, 7)
                    .with_weapon(6, 4, 15)
                    .with_cost(50, 1, 24),
                ElementType::unit("Tank", 150, 1, 10)
                    .with_weapon(30, 7, 37)
                    .with_cost(150, 2, 50),
                wraith,
                ElementType::unit("MissileTurret", 200, 0, 11).with_weapon(20, 7, 15),
                command_center,
                barracks,
            ],
        }
    }
}

impl EngineConfig {
    /// Parse a config from a RON string and validate it.
    pub fn from_ron_str(ron: &str) -> Result<Self> {
        let config: Self =
            ron::from_str(ron).map_err(|e| CommandError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config from a RON file and validate it.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| CommandError::ConfigIo {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_ron_str(&contents)
    }

    /// Serialize the config as pretty RON.
    pub fn to_ron_string(&self) -> Result<String> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| CommandError::ConfigParse(e.to_string()))
    }

    /// Look up an element type by name.
    #[must_use]
    pub fn element_type(&self, name: &str) -> Option<&ElementType> {
        self.element_types.iter().find(|t| t.name == name)
    }

    /// Check internal consistency.
    pub fn validate(&self) -> Result<()> {
        let positive = |v: Vec2Fixed| v.x > Fixed::ZERO && v.y > Fixed::ZERO;
        if !positive(self.ground_box) || !positive(self.air_box) {
            return Err(CommandError::InvalidConfig(
                "formation boxes must be positive".to_string(),
            ));
        }
        if self.arrival_threshold < Fixed::ZERO {
            return Err(CommandError::InvalidConfig(
                "arrival threshold must not be negative".to_string(),
            ));
        }

        let mut names = BTreeSet::new();
        for element in &self.element_types {
            if element.name.trim().is_empty() {
                return Err(CommandError::InvalidConfig(
                    "element type with blank name".to_string(),
                ));
            }
            if !names.insert(element.name.as_str()) {
                return Err(CommandError::InvalidConfig(format!(
                    "duplicate element type '{}'",
                    element.name
                )));
            }
            if element.flying && element.liftable {
                return Err(CommandError::InvalidConfig(format!(
                    "'{}' cannot be both flying and liftable",
                    element.name
                )));
            }
            if let Some(weapon) = element.weapon {
                if weapon.range <= Fixed::ZERO {
                    return Err(CommandError::InvalidConfig(format!(
                        "'{}' has a weapon with non-positive range",
                        element.name
                    )));
                }
            }
        }

        for element in &self.element_types {
            for produced in &element.produces {
                if !names.contains(produced.as_str()) {
                    return Err(CommandError::UnknownElementType(produced.clone()));
                }
            }
        }

        Ok(())
    }
}
