//! Positioned, sized, handle-identified simulation objects.
//!
//! Entities are plain data. Every structural change (creation, movement,
//! death) goes through [`EntityManager`](crate::manager::EntityManager),
//! which keeps the zone index and collision grids in sync and records the
//! matching [`EntityEvent`].

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::UnitData;
use crate::faction::FactionId;
use crate::geometry::{Circle, Point, Rect, Region, Size};
use crate::math::{Fixed, Vec2Fixed};

/// Margin trimmed from each side of the bounding rectangle to obtain the
/// collision rectangle.
pub const COLLISION_MARGIN: Fixed = Fixed::from_bits(858_993_459); // 0.2

/// Stable, never reused entity identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Handle(u64);

impl Handle {
    /// Wrap a raw identifier.
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw identifier.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Per-world monotonic handle sequence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandleGenerator {
    next: u64,
}

impl Default for HandleGenerator {
    fn default() -> Self {
        Self { next: 1 }
    }
}

impl HandleGenerator {
    /// Allocate the next handle.
    pub fn generate(&mut self) -> Handle {
        let handle = Handle(self.next);
        self.next += 1;
        handle
    }
}

/// Collision partition. Entities on different layers never collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CollisionLayer {
    /// Does not occupy any collision grid (resource nodes, effects).
    #[default]
    None,
    /// Walks on terrain.
    Ground,
    /// Flies over terrain.
    Air,
}

/// State of a faction-owned unit or building.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitState {
    /// Owning faction.
    pub faction: FactionId,
    /// Unit type definition.
    pub data: UnitData,
    /// Buildings start under construction; always `false` for units.
    pub under_construction: bool,
}

/// Variant data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EntityKind {
    /// Mobile unit or building.
    Unit(UnitState),
    /// Harvestable resource with a fixed position.
    ResourceNode {
        /// Remaining amount.
        amount: u32,
    },
}

/// A positioned simulation object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    handle: Handle,
    kind: EntityKind,
    /// Top-left corner in world space.
    position: Vec2Fixed,
    size: Size,
    collision_layer: CollisionLayer,
    alive: bool,
}

impl Entity {
    /// Create a unit or building.
    #[must_use]
    pub fn unit(handle: Handle, faction: FactionId, data: UnitData, position: Vec2Fixed) -> Self {
        let size = data.size;
        let collision_layer = data.collision_layer;
        let under_construction = data.is_building;
        Self {
            handle,
            kind: EntityKind::Unit(UnitState {
                faction,
                data,
                under_construction,
            }),
            position,
            size,
            collision_layer,
            alive: true,
        }
    }

    /// Create a resource node. Resource nodes never collide.
    #[must_use]
    pub fn resource_node(handle: Handle, position: Vec2Fixed, size: Size, amount: u32) -> Self {
        Self {
            handle,
            kind: EntityKind::ResourceNode { amount },
            position,
            size,
            collision_layer: CollisionLayer::None,
            alive: true,
        }
    }

    /// Identity.
    #[must_use]
    pub const fn handle(&self) -> Handle {
        self.handle
    }

    /// Variant data.
    #[must_use]
    pub const fn kind(&self) -> &EntityKind {
        &self.kind
    }

    /// Top-left corner.
    #[must_use]
    pub const fn position(&self) -> Vec2Fixed {
        self.position
    }

    /// Footprint in tiles.
    #[must_use]
    pub const fn size(&self) -> Size {
        self.size
    }

    /// Collision layer.
    #[must_use]
    pub const fn collision_layer(&self) -> CollisionLayer {
        self.collision_layer
    }

    /// `false` once the entity died.
    #[must_use]
    pub const fn is_alive(&self) -> bool {
        self.alive
    }

    /// Unit state, if this is a unit.
    #[must_use]
    pub const fn as_unit(&self) -> Option<&UnitState> {
        match &self.kind {
            EntityKind::Unit(unit) => Some(unit),
            EntityKind::ResourceNode { .. } => None,
        }
    }

    /// Owning faction, if any.
    #[must_use]
    pub fn faction(&self) -> Option<FactionId> {
        self.as_unit().map(|u| u.faction)
    }

    /// Whether the entity's position can change.
    #[must_use]
    pub const fn is_mobile(&self) -> bool {
        matches!(self.kind, EntityKind::Unit(_))
    }

    /// Centre of the bounding rectangle.
    #[must_use]
    pub fn center(&self) -> Vec2Fixed {
        center_of(self.position, self.size)
    }

    /// Bounding rectangle `[position, position + size)`.
    #[must_use]
    pub fn bounding_rect(&self) -> Rect {
        bounding_rect_at(self.position, self.size)
    }

    /// Bounding rectangle shrunk by [`COLLISION_MARGIN`] on each side.
    #[must_use]
    pub fn collision_rect(&self) -> Rect {
        self.bounding_rect().shrink(COLLISION_MARGIN)
    }

    /// Tiles occupied, from the rounded position.
    #[must_use]
    pub fn grid_region(&self) -> Region {
        grid_region_at(self.position, self.size)
    }

    /// Line-of-sight circle of a unit.
    #[must_use]
    pub fn line_of_sight(&self) -> Option<Circle> {
        self.as_unit()
            .map(|u| Circle::new(self.center(), u.data.sight_range))
    }

    pub(crate) fn set_position(&mut self, position: Vec2Fixed) -> Vec2Fixed {
        debug_assert!(self.alive, "moving dead entity {}", self.handle);
        std::mem::replace(&mut self.position, position)
    }

    pub(crate) fn mark_dead(&mut self) {
        debug_assert!(self.alive, "entity {} died twice", self.handle);
        self.alive = false;
    }

    pub(crate) fn kind_mut(&mut self) -> &mut EntityKind {
        &mut self.kind
    }
}

/// Bounding rectangle an entity of `size` would have at `position`.
#[must_use]
pub fn bounding_rect_at(position: Vec2Fixed, size: Size) -> Rect {
    Rect::from_origin_size(position, size.to_vec())
}

/// Centre an entity of `size` would have at `position`.
#[must_use]
pub fn center_of(position: Vec2Fixed, size: Size) -> Vec2Fixed {
    let two = Fixed::from_num(2);
    let half = Vec2Fixed::new(
        Fixed::from_num(size.width) / two,
        Fixed::from_num(size.height) / two,
    );
    position + half
}

/// Tile region an entity of `size` would occupy at `position`.
#[must_use]
pub fn grid_region_at(position: Vec2Fixed, size: Size) -> Region {
    let (x, y) = position.round_to_ints();
    Region::new(Point::new(x, y), size)
}

/// Structural signal recorded by the entity manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityEvent {
    /// The entity was committed to the registry.
    Added(Handle),
    /// The entity's position changed.
    Moved {
        /// Entity that moved.
        handle: Handle,
        /// Position before the move.
        from: Vec2Fixed,
        /// Position after the move.
        to: Vec2Fixed,
    },
    /// The entity died. Emitted once, before removal.
    Died(Handle),
    /// The entity left the registry.
    Removed(Handle),
    /// A building finished construction.
    ConstructionCompleted(Handle),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scout(position: Vec2Fixed) -> Entity {
        Entity::unit(
            Handle::from_raw(1),
            FactionId(0),
            UnitData::ground("scout", Fixed::from_num(5)),
            position,
        )
    }

    #[test]
    fn test_handles_are_monotonic() {
        let mut handles = HandleGenerator::default();
        let a = handles.generate();
        let b = handles.generate();
        assert!(b > a);
        assert_eq!(a.raw(), 1);
        assert_eq!(b.to_string(), "#2");
    }

    #[test]
    fn test_collision_margin_is_point_two() {
        let expected = Fixed::from_num(0.2);
        assert!((COLLISION_MARGIN - expected).abs() <= Fixed::DELTA);
    }

    #[test]
    fn test_derived_geometry() {
        let entity = Entity::resource_node(
            Handle::from_raw(3),
            Vec2Fixed::from_ints(4, 6),
            Size::new(2, 2),
            500,
        );
        assert_eq!(entity.center(), Vec2Fixed::from_ints(5, 7));
        assert_eq!(entity.bounding_rect().max, Vec2Fixed::from_ints(6, 8));
        assert_eq!(entity.collision_rect().min.x, Fixed::from_num(4) + COLLISION_MARGIN);
        assert_eq!(entity.grid_region(), Region::new(Point::new(4, 6), Size::new(2, 2)));
        assert_eq!(entity.collision_layer(), CollisionLayer::None);
        assert!(!entity.is_mobile());
        assert!(entity.line_of_sight().is_none());
    }

    #[test]
    fn test_grid_region_rounds_position() {
        let entity = scout(Vec2Fixed::new(Fixed::from_num(2.5), Fixed::from_num(3.4)));
        assert_eq!(entity.grid_region().min, Point::new(3, 3));
    }

    #[test]
    fn test_unit_line_of_sight_centred() {
        let entity = scout(Vec2Fixed::from_ints(10, 10));
        let los = entity.line_of_sight().unwrap();
        assert_eq!(los.center, Vec2Fixed::new(Fixed::from_num(10.5), Fixed::from_num(10.5)));
        assert_eq!(los.radius, Fixed::from_num(5));
        assert_eq!(entity.faction(), Some(FactionId(0)));
    }

    #[test]
    fn test_buildings_start_under_construction() {
        let farm = Entity::unit(
            Handle::from_raw(9),
            FactionId(1),
            UnitData::building("farm", Size::new(2, 2), Fixed::from_num(3), 8),
            Vec2Fixed::ZERO,
        );
        assert!(farm.as_unit().unwrap().under_construction);
        assert_eq!(farm.size(), Size::new(2, 2));
    }
}
