//! # Skirmish Core
//!
//! Deterministic world core for a real-time strategy game: entity
//! registry, spatial index, collision layers and per-faction fog of war.
//!
//! This crate contains **only** deterministic logic:
//! - No rendering
//! - No IO
//! - No system randomness
//! - No floating-point math in the simulation (uses fixed-point)
//!
//! Rendering, input, networking and AI sit outside and talk to the core
//! through spatial queries, the entity event log and faction visibility
//! events.
//!
//! ## Crate Structure
//!
//! - [`terrain`] - Per-tile walkability
//! - [`zones`] - Zone-bucket spatial index
//! - [`grid`] - Ground and Air collision grids
//! - [`manager`] - Entity registry with deferred mutation
//! - [`fog`] - Tile visibility map
//! - [`faction`] - Factions, alliances and merged visibility
//! - [`world`] - Everything above wired together
//! - [`math`] - Fixed-point math utilities

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod config;
pub mod entity;
pub mod error;
pub mod faction;
pub mod fog;
pub mod geometry;
pub mod grid;
pub mod manager;
pub mod math;
pub mod pool;
pub mod terrain;
pub mod world;
pub mod zones;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::{TerrainConfig, UnitData, WorldConfig};
    pub use crate::entity::{CollisionLayer, Entity, EntityEvent, EntityKind, Handle};
    pub use crate::error::{GameError, Result};
    pub use crate::faction::{Faction, FactionEvent, FactionId, Factions};
    pub use crate::fog::{FogOfWar, TileVisibility};
    pub use crate::geometry::{Circle, Point, Rect, Region, Size};
    pub use crate::manager::EntityManager;
    pub use crate::math::{Fixed, Vec2Fixed};
    pub use crate::terrain::Terrain;
    pub use crate::world::World;
    pub use crate::zones::EntityZoneManager;
}
