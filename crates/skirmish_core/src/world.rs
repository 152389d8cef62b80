//! The simulation world: terrain, entities and factions in one place.
//!
//! [`World`] is the entry point callers outside the core use. Every
//! mutating operation forwards the entity events it caused to the
//! factions before returning, so fog of war is always current when the
//! call completes.

use crate::config::{UnitData, WorldConfig};
use crate::entity::{grid_region_at, CollisionLayer, Handle};
use crate::error::{GameError, Result};
use crate::faction::{Faction, FactionEvent, FactionId, Factions};
use crate::fog::TileVisibility;
use crate::geometry::{Point, Region, Size};
use crate::manager::EntityManager;
use crate::math::{Fixed, Vec2Fixed};
use crate::terrain::Terrain;

/// Terrain, entity registry and faction registry.
#[derive(Debug, Clone)]
pub struct World {
    terrain: Terrain,
    entities: EntityManager,
    factions: Factions,
    tick: u64,
}

impl World {
    /// Create a world over existing terrain.
    #[must_use]
    pub fn new(terrain: Terrain, zone_count: u32) -> Self {
        let entities = EntityManager::new(terrain.size(), zone_count);
        Self {
            terrain,
            entities,
            factions: Factions::new(),
            tick: 0,
        }
    }

    /// Create a world from configuration, generating terrain if requested.
    #[must_use]
    pub fn from_config(config: &WorldConfig) -> Self {
        let size = config.size();
        let terrain = match &config.terrain {
            Some(terrain) => Terrain::generate(size, terrain),
            None => Terrain::open(size),
        };
        Self::new(terrain, config.zone_count)
    }

    /// Walkability grid.
    #[must_use]
    pub const fn terrain(&self) -> &Terrain {
        &self.terrain
    }

    /// Entity registry.
    #[must_use]
    pub const fn entities(&self) -> &EntityManager {
        &self.entities
    }

    /// Faction registry.
    #[must_use]
    pub const fn factions(&self) -> &Factions {
        &self.factions
    }

    /// World size in tiles.
    #[must_use]
    pub const fn size(&self) -> Size {
        self.terrain.size()
    }

    /// Number of completed ticks.
    #[must_use]
    pub const fn tick_count(&self) -> u64 {
        self.tick
    }

    /// Register a new faction.
    ///
    /// # Errors
    ///
    /// Returns an error if the identifier is already taken.
    pub fn add_faction(&mut self, id: FactionId, name: &str) -> Result<()> {
        self.factions.add(Faction::new(id, name, self.size()))
    }

    /// Let `faction` see through `ally`, or stop doing so.
    ///
    /// # Errors
    ///
    /// Returns an error if either faction is unknown.
    pub fn set_allied(&mut self, faction: FactionId, ally: FactionId, allied: bool) -> Result<()> {
        self.factions.set_allied(faction, ally, allied)
    }

    /// Check whether `region` can be occupied on `layer`: inside the world,
    /// walkable for ground entities, and with no occupant on the layer.
    #[must_use]
    pub fn is_free(&self, region: &Region, layer: CollisionLayer) -> bool {
        self.first_blocked(region, layer, None).is_none()
    }

    /// First tile of `region` an entity on `layer` cannot occupy. Tiles held
    /// by `except` count as free.
    fn first_blocked(&self, region: &Region, layer: CollisionLayer, except: Option<Handle>) -> Option<Point> {
        region.points().find(|&point| {
            if !self.terrain.contains(point) {
                return true;
            }
            if layer == CollisionLayer::Ground && !self.terrain.is_walkable(point) {
                return true;
            }
            let occupant = self.entities.grids().get(point, layer);
            occupant.is_some() && occupant != except
        })
    }

    fn placement_error(&self, point: Point, layer: CollisionLayer) -> GameError {
        if self.terrain.contains(point) {
            GameError::CellOccupied {
                x: point.x,
                y: point.y,
                layer,
            }
        } else {
            GameError::OutOfBounds {
                x: point.x,
                y: point.y,
            }
        }
    }

    /// Create a unit or building for `faction` at `position`.
    ///
    /// Buildings start under construction.
    ///
    /// # Errors
    ///
    /// Returns an error if the faction is unknown or the footprint is not
    /// free.
    pub fn spawn_unit(&mut self, faction: FactionId, data: UnitData, position: Vec2Fixed) -> Result<Handle> {
        self.factions.get(faction)?;
        let region = grid_region_at(position, data.size);
        if let Some(point) = self.first_blocked(&region, data.collision_layer, None) {
            return Err(self.placement_error(point, data.collision_layer));
        }
        let handle = self.entities.create_unit(faction, data, position);
        self.dispatch();
        Ok(handle)
    }

    /// Create a unit or building that is already finished.
    ///
    /// # Errors
    ///
    /// Same as [`spawn_unit`](Self::spawn_unit).
    pub fn spawn_completed(&mut self, faction: FactionId, data: UnitData, position: Vec2Fixed) -> Result<Handle> {
        let is_building = data.is_building;
        let handle = self.spawn_unit(faction, data, position)?;
        if is_building {
            self.complete_construction(handle)?;
        }
        Ok(handle)
    }

    /// Create a resource node. It must sit on free, walkable ground.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::CellOccupied`] or [`GameError::OutOfBounds`]
    /// when the footprint is not free.
    pub fn spawn_resource_node(&mut self, position: Vec2Fixed, size: Size, amount: u32) -> Result<Handle> {
        let region = grid_region_at(position, size);
        if let Some(point) = self.first_blocked(&region, CollisionLayer::Ground, None) {
            return Err(self.placement_error(point, CollisionLayer::Ground));
        }
        let handle = self.entities.create_resource_node(position, size, amount);
        self.dispatch();
        Ok(handle)
    }

    /// Move a unit, checking the destination footprint first.
    ///
    /// # Errors
    ///
    /// Returns an error if the unit is unknown, dead or immobile, or if the
    /// destination is not free.
    pub fn move_unit(&mut self, handle: Handle, position: Vec2Fixed) -> Result<()> {
        let entity = self
            .entities
            .from_handle(handle)
            .ok_or(GameError::EntityNotFound(handle))?;
        let layer = entity.collision_layer();
        let region = grid_region_at(position, entity.size());
        if let Some(point) = self.first_blocked(&region, layer, Some(handle)) {
            return Err(self.placement_error(point, layer));
        }
        self.entities.move_entity(handle, position)?;
        self.dispatch();
        Ok(())
    }

    /// Kill an entity.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity is unknown or already dead.
    pub fn kill(&mut self, handle: Handle) -> Result<()> {
        self.entities.kill(handle)?;
        self.dispatch();
        Ok(())
    }

    /// Finish a building under construction.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity is not a building under construction.
    pub fn complete_construction(&mut self, handle: Handle) -> Result<()> {
        self.entities.complete_construction(handle)?;
        self.dispatch();
        Ok(())
    }

    /// Advance the simulation by one tick.
    ///
    /// Runs `behavior` for every living entity through
    /// [`EntityManager::update`], then brings the factions up to date with
    /// everything that happened, even when a behavior failed.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by a behavior.
    pub fn tick<F>(&mut self, step: Fixed, behavior: F) -> Result<()>
    where
        F: FnMut(&mut EntityManager, Handle, Fixed) -> Result<()>,
    {
        let result = self.entities.update(step, behavior);
        self.dispatch();
        self.tick += 1;
        tracing::trace!(tick = self.tick, entities = self.entities.len(), "Tick complete");
        result
    }

    /// Visibility of a tile for `faction`, merged across its allies.
    ///
    /// # Errors
    ///
    /// Returns an error if the faction is unknown.
    pub fn tile_visibility(&self, faction: FactionId, point: Point) -> Result<TileVisibility> {
        self.factions.tile_visibility(faction, point)
    }

    /// Whether `faction` currently sees any tile of `region`.
    ///
    /// # Errors
    ///
    /// Returns an error if the faction is unknown.
    pub fn can_see(&self, faction: FactionId, region: &Region) -> Result<bool> {
        self.factions.can_see(faction, region)
    }

    /// Take every faction event produced since the last drain.
    pub fn drain_faction_events(&mut self) -> Vec<FactionEvent> {
        self.factions.drain_events()
    }

    fn dispatch(&mut self) {
        let events = self.entities.drain_events();
        self.factions.handle_events(&self.entities, events);
    }
}
