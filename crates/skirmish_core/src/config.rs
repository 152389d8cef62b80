//! World and unit configuration.
//!
//! All structs here deserialize from RON. This module contains no file IO:
//! callers read the text and hand it over together with a label used in
//! error messages.

use serde::{Deserialize, Serialize};

use crate::entity::CollisionLayer;
use crate::error::{GameError, Result};
use crate::geometry::Size;
use crate::math::{fixed_decimal, Fixed};
use crate::zones::MAX_ZONE_COUNT;

/// Number of zones per axis used by the spatial index.
pub const DEFAULT_ZONE_COUNT: u32 = 8;

const fn default_zone_count() -> u32 {
    DEFAULT_ZONE_COUNT
}

/// World dimensions and index tuning.
///
/// # Example RON
///
/// ```ron
/// WorldConfig(
///     width: 128,
///     height: 96,
///     zone_count: 8,
///     terrain: Some(TerrainConfig(seed: 7, obstacle_density: 0.2)),
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldConfig {
    /// Width in tiles.
    pub width: u32,
    /// Height in tiles.
    pub height: u32,
    /// Zones per axis in the spatial index.
    #[serde(default = "default_zone_count")]
    pub zone_count: u32,
    /// Procedural terrain settings. `None` yields an open map.
    #[serde(default)]
    pub terrain: Option<TerrainConfig>,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            width: 64,
            height: 64,
            zone_count: DEFAULT_ZONE_COUNT,
            terrain: None,
        }
    }
}

impl WorldConfig {
    /// Create a config for an open world of the given size.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Default::default()
        }
    }

    /// Attach terrain generation settings.
    #[must_use]
    pub fn with_terrain(mut self, terrain: TerrainConfig) -> Self {
        self.terrain = Some(terrain);
        self
    }

    /// World size in tiles.
    #[must_use]
    pub fn size(&self) -> Size {
        Size::new(self.width as i32, self.height as i32)
    }

    /// Parse a config from RON text.
    ///
    /// `source` labels the text in error messages.
    pub fn from_ron_str(source: &str, text: &str) -> Result<Self> {
        let config: Self = ron::from_str(text).map_err(|e| GameError::ConfigParseError {
            path: source.to_string(),
            message: e.to_string(),
        })?;
        config.validate(source)?;
        Ok(config)
    }

    fn validate(&self, source: &str) -> Result<()> {
        let message = if self.width == 0 || self.height == 0 {
            "world dimensions must be positive"
        } else if !(1..=MAX_ZONE_COUNT).contains(&self.zone_count) {
            "zone_count must be between 1 and 64"
        } else {
            return Ok(());
        };
        Err(GameError::ConfigParseError {
            path: source.to_string(),
            message: message.to_string(),
        })
    }
}

/// Parameters for noise-based terrain generation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TerrainConfig {
    /// Random seed for deterministic generation.
    pub seed: u64,
    /// Fraction of tiles that end up blocked (0.0 = open, 1.0 = solid).
    pub obstacle_density: f32,
    /// Noise lattice spacing in tiles. Larger values give bigger blobs.
    #[serde(default = "default_feature_size")]
    pub feature_size: u32,
}

const fn default_feature_size() -> u32 {
    6
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            seed: 12345,
            obstacle_density: 0.15,
            feature_size: default_feature_size(),
        }
    }
}

impl TerrainConfig {
    /// Set the random seed.
    #[must_use]
    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set obstacle density.
    #[must_use]
    pub fn with_obstacle_density(mut self, density: f32) -> Self {
        self.obstacle_density = density.clamp(0.0, 1.0);
        self
    }
}

/// Data-driven unit definition.
///
/// Buildings are units with `is_building` set; they occupy their whole
/// footprint and only grant line of sight once construction completes.
///
/// # Example RON
///
/// ```ron
/// UnitData(
///     id: "scout",
///     size: (width: 1, height: 1),
///     collision_layer: Ground,
///     sight_range: 7.5,
///     food_cost: 1,
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitData {
    /// Unique string identifier for this unit type.
    pub id: String,
    /// Footprint in tiles.
    #[serde(default = "default_unit_size")]
    pub size: Size,
    /// Layer the unit collides on.
    #[serde(default = "default_layer")]
    pub collision_layer: CollisionLayer,
    /// Line-of-sight radius in tiles.
    #[serde(with = "fixed_decimal")]
    pub sight_range: Fixed,
    /// Whether this is a building.
    #[serde(default)]
    pub is_building: bool,
    /// Food consumed while alive.
    #[serde(default)]
    pub food_cost: u32,
    /// Food provided once built.
    #[serde(default)]
    pub food_provided: u32,
}

const fn default_unit_size() -> Size {
    Size::ONE
}

const fn default_layer() -> CollisionLayer {
    CollisionLayer::Ground
}

impl UnitData {
    /// A ground unit with a single-tile footprint.
    #[must_use]
    pub fn ground(id: &str, sight_range: Fixed) -> Self {
        Self {
            id: id.to_string(),
            size: Size::ONE,
            collision_layer: CollisionLayer::Ground,
            sight_range,
            is_building: false,
            food_cost: 1,
            food_provided: 0,
        }
    }

    /// A ground building.
    #[must_use]
    pub fn building(id: &str, size: Size, sight_range: Fixed, food_provided: u32) -> Self {
        Self {
            id: id.to_string(),
            size,
            collision_layer: CollisionLayer::Ground,
            sight_range,
            is_building: true,
            food_cost: 0,
            food_provided,
        }
    }

    /// Parse a list of unit definitions from RON text.
    pub fn list_from_ron_str(source: &str, text: &str) -> Result<Vec<Self>> {
        let units: Vec<Self> = ron::from_str(text).map_err(|e| GameError::ConfigParseError {
            path: source.to_string(),
            message: e.to_string(),
        })?;
        if let Some(bad) = units.iter().find(|u| u.size.width <= 0 || u.size.height <= 0) {
            return Err(GameError::ConfigParseError {
                path: source.to_string(),
                message: format!("unit '{}' has an empty footprint", bad.id),
            });
        }
        Ok(units)
    }
}
