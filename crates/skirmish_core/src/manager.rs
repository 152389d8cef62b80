//! Entity registry and lifecycle.
//!
//! [`EntityManager`] owns every entity and keeps three derived structures in
//! step with it: the [`EntityZoneManager`] spatial index, the Ground/Air
//! [`CollisionGrids`], and an outgoing [`EntityEvent`] log.
//!
//! # Deferred changes
//!
//! During [`update`](EntityManager::update) entity behaviors may spawn,
//! move, kill or remove entities. The registry and zone index are not
//! touched while the pass runs; instead each affected entity accumulates a
//! [`DeferredChange`] that is committed once the pass finishes, in the
//! fixed order Add, Move, Remove. Collision grids are updated immediately
//! in all cases so that mid-tick placement checks see current occupancy.

use std::collections::BTreeMap;

use crate::config::{UnitData, WorldConfig};
use crate::entity::{
    bounding_rect_at, CollisionLayer, Entity, EntityEvent, EntityKind, Handle,
    HandleGenerator,
};
use crate::error::{GameError, Result};
use crate::faction::FactionId;
use crate::geometry::{Circle, Point, Rect, Region, Size};
use crate::grid::CollisionGrids;
use crate::math::{Fixed, Vec2Fixed};
use crate::zones::EntityZoneManager;

/// Structural changes buffered for one entity during an update pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeferredChange {
    /// The entity was created during the pass.
    pub add: bool,
    /// Position before the first move of the pass.
    pub moved_from: Option<Vec2Fixed>,
    /// The entity left the registry during the pass.
    pub remove: bool,
}

/// Authoritative entity collection.
#[derive(Debug, Clone)]
pub struct EntityManager {
    world_size: Size,
    handles: HandleGenerator,
    /// Committed entities, in handle order.
    entities: BTreeMap<Handle, Entity>,
    /// Entities created during the current pass, awaiting commit.
    spawned: BTreeMap<Handle, Entity>,
    pending: BTreeMap<Handle, DeferredChange>,
    zones: EntityZoneManager,
    grids: CollisionGrids,
    events: Vec<EntityEvent>,
    is_updating: bool,
}

impl EntityManager {
    /// Create an empty manager for a world of `world_size` tiles.
    #[must_use]
    pub fn new(world_size: Size, zone_count: u32) -> Self {
        Self {
            world_size,
            handles: HandleGenerator::default(),
            entities: BTreeMap::new(),
            spawned: BTreeMap::new(),
            pending: BTreeMap::new(),
            zones: EntityZoneManager::new(world_size, zone_count),
            grids: CollisionGrids::new(world_size),
            events: Vec::new(),
            is_updating: false,
        }
    }

    /// Create an empty manager from a world config.
    #[must_use]
    pub fn from_config(config: &WorldConfig) -> Self {
        Self::new(config.size(), config.zone_count)
    }

    // ------------------------------------------------------------------
    // Creation and removal
    // ------------------------------------------------------------------

    /// Create a unit or building for `faction` and register it.
    ///
    /// The caller is responsible for checking the footprint is free.
    pub fn create_unit(&mut self, faction: FactionId, data: UnitData, position: Vec2Fixed) -> Handle {
        let handle = self.handles.generate();
        self.add(Entity::unit(handle, faction, data, position));
        handle
    }

    /// Create a resource node and register it.
    pub fn create_resource_node(&mut self, position: Vec2Fixed, size: Size, amount: u32) -> Handle {
        let handle = self.handles.generate();
        self.add(Entity::resource_node(handle, position, size, amount));
        handle
    }

    fn add(&mut self, entity: Entity) {
        let handle = entity.handle();
        self.grids
            .add(handle, &entity.grid_region(), entity.collision_layer());

        if self.is_updating {
            let change = self.pending.entry(handle).or_default();
            debug_assert!(!change.remove, "{handle} added after removal");
            change.add = true;
            self.spawned.insert(handle, entity);
        } else {
            self.commit_add(entity);
        }
    }

    fn commit_add(&mut self, entity: Entity) {
        let handle = entity.handle();
        self.zones.add(handle, entity.bounding_rect());
        self.entities.insert(handle, entity);
        self.events.push(EntityEvent::Added(handle));
        tracing::debug!(%handle, "Entity added");
    }

    /// Kill an entity. Emits [`EntityEvent::Died`] and removes it.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity is unknown or already dead.
    pub fn kill(&mut self, handle: Handle) -> Result<()> {
        let entity = self.live_entity_mut(handle)?;
        entity.mark_dead();
        self.events.push(EntityEvent::Died(handle));
        self.schedule_remove(handle);
        Ok(())
    }

    /// Remove an entity without killing it.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity is unknown or already removed.
    pub fn remove(&mut self, handle: Handle) -> Result<()> {
        if self.get_any(handle).is_none() || self.is_pending_removal(handle) {
            return Err(GameError::EntityNotFound(handle));
        }
        self.schedule_remove(handle);
        Ok(())
    }

    fn schedule_remove(&mut self, handle: Handle) {
        if let Some(entity) = self.get_any(handle) {
            let (region, layer) = (entity.grid_region(), entity.collision_layer());
            self.grids.remove(handle, &region, layer);
        }

        if self.is_updating {
            let change = self.pending.entry(handle).or_default();
            debug_assert!(!change.remove, "{handle} removed twice");
            change.remove = true;
        } else {
            self.erase(handle);
        }
    }

    fn erase(&mut self, handle: Handle) {
        if let Some(entity) = self.entities.remove(&handle) {
            self.zones.remove(handle, entity.bounding_rect());
            self.events.push(EntityEvent::Removed(handle));
            tracing::debug!(%handle, "Entity removed");
        }
    }

    // ------------------------------------------------------------------
    // Movement and state changes
    // ------------------------------------------------------------------

    /// Move an entity's top-left corner to `position`.
    ///
    /// Moving to the current position is a no-op and emits nothing.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity is unknown, dead, or immobile.
    pub fn move_entity(&mut self, handle: Handle, position: Vec2Fixed) -> Result<()> {
        let entity = self.live_entity_mut(handle)?;
        if !entity.is_mobile() {
            return Err(GameError::InvalidState(format!("{handle} cannot move")));
        }
        if entity.position() == position {
            return Ok(());
        }

        let old_region = entity.grid_region();
        let from = entity.set_position(position);
        let (size, layer, new_region) = (entity.size(), entity.collision_layer(), entity.grid_region());
        self.events.push(EntityEvent::Moved {
            handle,
            from,
            to: position,
        });

        if old_region != new_region {
            self.grids.remove(handle, &old_region, layer);
            self.grids.add(handle, &new_region, layer);
        }

        if self.is_updating {
            self.pending
                .entry(handle)
                .or_default()
                .moved_from
                .get_or_insert(from);
        } else {
            self.zones
                .update(handle, bounding_rect_at(from, size), bounding_rect_at(position, size));
        }
        Ok(())
    }

    /// Mark a building as finished.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity is unknown, dead, or not a building
    /// under construction.
    pub fn complete_construction(&mut self, handle: Handle) -> Result<()> {
        let entity = self.live_entity_mut(handle)?;
        match entity.kind_mut() {
            EntityKind::Unit(unit) if unit.under_construction => {
                unit.under_construction = false;
            }
            _ => {
                return Err(GameError::InvalidState(format!(
                    "{handle} is not under construction"
                )))
            }
        }
        self.events.push(EntityEvent::ConstructionCompleted(handle));
        Ok(())
    }

    // ------------------------------------------------------------------
    // Update pass
    // ------------------------------------------------------------------

    /// Run `behavior` once for every living entity, then commit the
    /// structural changes it requested.
    ///
    /// Entities are visited in handle order from a snapshot taken before
    /// the pass; entities spawned during the pass are first visited on the
    /// next update. An entity killed or removed mid-pass is skipped. The
    /// first behavior error stops the pass, but changes made so far are
    /// still committed.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::ReentrantUpdate`] when called from inside a
    /// behavior, or the first error a behavior returned.
    pub fn update<F>(&mut self, step: Fixed, mut behavior: F) -> Result<()>
    where
        F: FnMut(&mut Self, Handle, Fixed) -> Result<()>,
    {
        if self.is_updating {
            return Err(GameError::ReentrantUpdate);
        }
        self.is_updating = true;

        let snapshot: Vec<Handle> = self
            .entities
            .values()
            .filter(|e| e.is_alive())
            .map(Entity::handle)
            .collect();

        let mut result = Ok(());
        for handle in snapshot {
            let still_here = self.entities.get(&handle).is_some_and(Entity::is_alive)
                && !self.is_pending_removal(handle);
            if still_here {
                result = behavior(self, handle, step);
                if result.is_err() {
                    break;
                }
            }
        }

        self.commit_deferred_changes();
        self.is_updating = false;

        #[cfg(feature = "debug-validation")]
        {
            if let Err(e) = self.validate() {
                tracing::error!(error = %e, "Entity index out of sync after commit");
            }
        }
        result
    }

    fn commit_deferred_changes(&mut self) {
        let pending = std::mem::take(&mut self.pending);
        for (handle, change) in pending {
            if change.add && change.remove {
                // Spawned and destroyed within one pass. Its grid cells were
                // already released by the removal.
                tracing::warn!(%handle, "Entity added and removed within the same tick");
                self.spawned.remove(&handle);
                continue;
            }

            if change.add {
                if let Some(entity) = self.spawned.remove(&handle) {
                    self.commit_add(entity);
                }
            } else if let Some(from) = change.moved_from {
                if let Some(entity) = self.entities.get(&handle) {
                    let old_bounds = bounding_rect_at(from, entity.size());
                    self.zones.update(handle, old_bounds, entity.bounding_rect());
                }
            }

            if change.remove {
                self.erase(handle);
            }
        }
        debug_assert!(self.spawned.is_empty(), "spawned entities left uncommitted");
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Committed entity by handle.
    #[must_use]
    pub fn from_handle(&self, handle: Handle) -> Option<&Entity> {
        self.entities.get(&handle)
    }

    /// Entity by handle, including ones spawned during the current pass.
    #[must_use]
    pub fn get_any(&self, handle: Handle) -> Option<&Entity> {
        self.entities
            .get(&handle)
            .or_else(|| self.spawned.get(&handle))
    }

    fn live_entity_mut(&mut self, handle: Handle) -> Result<&mut Entity> {
        let pending_removal = self.is_pending_removal(handle);
        let entity = match self.entities.get_mut(&handle) {
            Some(entity) => entity,
            None => self
                .spawned
                .get_mut(&handle)
                .ok_or(GameError::EntityNotFound(handle))?,
        };
        if !entity.is_alive() {
            return Err(GameError::EntityDead(handle));
        }
        if pending_removal {
            return Err(GameError::EntityNotFound(handle));
        }
        Ok(entity)
    }

    fn is_pending_removal(&self, handle: Handle) -> bool {
        self.pending.get(&handle).is_some_and(|c| c.remove)
    }

    /// Occupant of a tile on a collision layer. `None` when out of bounds
    /// or empty.
    #[must_use]
    pub fn get_entity_at(&self, point: Point, layer: CollisionLayer) -> Option<&Entity> {
        if !self.contains(point) {
            return None;
        }
        self.grids
            .get(point, layer)
            .and_then(|handle| self.get_any(handle))
    }

    /// Ground occupant of a tile.
    #[must_use]
    pub fn ground_entity_at(&self, point: Point) -> Option<&Entity> {
        self.get_entity_at(point, CollisionLayer::Ground)
    }

    /// Air occupant of a tile.
    #[must_use]
    pub fn air_entity_at(&self, point: Point) -> Option<&Entity> {
        self.get_entity_at(point, CollisionLayer::Air)
    }

    /// Check whether every tile of `region` is inside the world and
    /// unoccupied on `layer`.
    #[must_use]
    pub fn is_free(&self, region: &Region, layer: CollisionLayer) -> bool {
        let inside = region.intersection(&self.bounds()) == *region;
        inside
            && self
                .grids
                .layer(layer)
                .map_or(true, |grid| grid.is_free(region))
    }

    /// Committed entities whose bounding rectangle intersects `rect`.
    #[must_use]
    pub fn intersecting_rect(&self, rect: &Rect) -> Vec<Handle> {
        self.zones.intersecting_rect(rect)
    }

    /// Committed entities whose bounding rectangle touches `circle`.
    #[must_use]
    pub fn intersecting_circle(&self, circle: &Circle) -> Vec<Handle> {
        self.zones.intersecting_circle(circle)
    }

    /// Committed entities whose bounding rectangle contains `point`.
    pub fn intersecting_point(&self, point: Vec2Fixed) -> impl Iterator<Item = Handle> + '_ {
        self.zones.intersecting_point(point)
    }

    /// Iterate committed entities in handle order.
    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    /// Number of committed entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Whether no entity is committed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Whether an update pass is running.
    #[must_use]
    pub const fn is_updating(&self) -> bool {
        self.is_updating
    }

    /// Deferred change buffered for an entity in the current pass.
    #[must_use]
    pub fn deferred_change(&self, handle: Handle) -> Option<&DeferredChange> {
        self.pending.get(&handle)
    }

    /// Take every event recorded since the last drain.
    pub fn drain_events(&mut self) -> Vec<EntityEvent> {
        std::mem::take(&mut self.events)
    }

    /// Spatial index.
    #[must_use]
    pub const fn zones(&self) -> &EntityZoneManager {
        &self.zones
    }

    /// Collision grids.
    #[must_use]
    pub const fn grids(&self) -> &CollisionGrids {
        &self.grids
    }

    /// World size in tiles.
    #[must_use]
    pub const fn world_size(&self) -> Size {
        self.world_size
    }

    fn bounds(&self) -> Region {
        Region::new(Point::new(0, 0), self.world_size)
    }

    fn contains(&self, point: Point) -> bool {
        self.bounds().contains(point)
    }

    /// Exhaustively check the zone index and collision grids against the
    /// registry. Only meaningful outside an update pass.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidState`] describing the first mismatch.
    pub fn validate(&self) -> Result<()> {
        let fail = |message: String| Err(GameError::InvalidState(message));

        if self.zones.len() != self.entities.len() {
            return fail(format!(
                "zone index holds {} entities, registry {}",
                self.zones.len(),
                self.entities.len()
            ));
        }
        for (&handle, entity) in &self.entities {
            let expected: Vec<(i32, i32)> = self
                .zones
                .zone_range(&entity.bounding_rect())
                .zones()
                .collect();
            let actual = self.zones.zones_containing(handle);
            if expected != actual {
                return fail(format!("{handle} listed in zones {actual:?}, expected {expected:?}"));
            }

            let region = entity.grid_region().intersection(&self.bounds());
            if entity.collision_layer() != CollisionLayer::None {
                if let Some(point) = region
                    .points()
                    .find(|p| self.grids.get(*p, entity.collision_layer()) != Some(handle))
                {
                    return fail(format!("{handle} missing from collision grid at {point:?}"));
                }
            }
        }
        Ok(())
    }
}
