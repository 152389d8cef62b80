//! Tile-space and world-space shapes.
//!
//! [`Point`], [`Size`] and [`Region`] address whole tiles. [`Rect`] and
//! [`Circle`] live in fixed-point world space. Rectangles are half-open:
//! a rectangle `[min, max)` touching another along an edge does not
//! intersect it.

use serde::{Deserialize, Serialize};

use crate::math::{Fixed, Vec2Fixed, HALF};

/// A tile coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Point {
    /// Column.
    pub x: i32,
    /// Row.
    pub y: i32,
}

impl Point {
    /// Create a new tile coordinate.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// World-space centre of this tile.
    #[must_use]
    pub fn center(self) -> Vec2Fixed {
        Vec2Fixed::new(Fixed::from_num(self.x) + HALF, Fixed::from_num(self.y) + HALF)
    }
}

/// Dimensions in whole tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Size {
    /// Extent along x.
    pub width: i32,
    /// Extent along y.
    pub height: i32,
}

impl Size {
    /// Create a new size.
    #[must_use]
    pub const fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }

    /// A single tile.
    pub const ONE: Self = Self::new(1, 1);

    /// Number of tiles covered.
    #[must_use]
    pub const fn area(self) -> i32 {
        self.width * self.height
    }

    /// Size as a world-space vector.
    #[must_use]
    pub fn to_vec(self) -> Vec2Fixed {
        Vec2Fixed::from_ints(self.width, self.height)
    }
}

/// A rectangular block of tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Region {
    /// Top-left tile.
    pub min: Point,
    /// Extent in tiles.
    pub size: Size,
}

impl Region {
    /// Create a region from its top-left tile and size.
    #[must_use]
    pub const fn new(min: Point, size: Size) -> Self {
        Self { min, size }
    }

    /// Create a region from inclusive min and exclusive max corners.
    ///
    /// Inverted corners produce an empty region.
    #[must_use]
    pub fn from_bounds(min_x: i32, min_y: i32, max_x: i32, max_y: i32) -> Self {
        Self::new(
            Point::new(min_x, min_y),
            Size::new((max_x - min_x).max(0), (max_y - min_y).max(0)),
        )
    }

    /// Exclusive max x.
    #[must_use]
    pub const fn max_x(&self) -> i32 {
        self.min.x + self.size.width
    }

    /// Exclusive max y.
    #[must_use]
    pub const fn max_y(&self) -> i32 {
        self.min.y + self.size.height
    }

    /// True when the region covers no tile.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.size.width <= 0 || self.size.height <= 0
    }

    /// Number of tiles covered.
    #[must_use]
    pub fn area(&self) -> i32 {
        if self.is_empty() {
            0
        } else {
            self.size.area()
        }
    }

    /// Check whether a tile lies inside the region.
    #[must_use]
    pub const fn contains(&self, point: Point) -> bool {
        point.x >= self.min.x
            && point.y >= self.min.y
            && point.x < self.max_x()
            && point.y < self.max_y()
    }

    /// Overlap of two regions (possibly empty).
    #[must_use]
    pub fn intersection(&self, other: &Self) -> Self {
        Self::from_bounds(
            self.min.x.max(other.min.x),
            self.min.y.max(other.min.y),
            self.max_x().min(other.max_x()),
            self.max_y().min(other.max_y()),
        )
    }

    /// Smallest region covering both. Empty operands are ignored.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        Self::from_bounds(
            self.min.x.min(other.min.x),
            self.min.y.min(other.min.y),
            self.max_x().max(other.max_x()),
            self.max_y().max(other.max_y()),
        )
    }

    /// Iterate the covered tiles in row-major order.
    pub fn points(&self) -> impl Iterator<Item = Point> {
        let (min_x, max_x) = (self.min.x, self.max_x());
        (self.min.y..self.max_y()).flat_map(move |y| (min_x..max_x).map(move |x| Point::new(x, y)))
    }

    /// World-space rectangle of this region.
    #[must_use]
    pub fn to_rect(&self) -> Rect {
        Rect::new(
            Vec2Fixed::from_ints(self.min.x, self.min.y),
            Vec2Fixed::from_ints(self.max_x(), self.max_y()),
        )
    }
}

/// Half-open world-space rectangle `[min, max)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rect {
    /// Inclusive corner.
    pub min: Vec2Fixed,
    /// Exclusive corner.
    pub max: Vec2Fixed,
}

impl Rect {
    /// Create a rectangle from its corners.
    #[must_use]
    pub const fn new(min: Vec2Fixed, max: Vec2Fixed) -> Self {
        Self { min, max }
    }

    /// Create a rectangle from position and extent.
    #[must_use]
    pub fn from_origin_size(origin: Vec2Fixed, extent: Vec2Fixed) -> Self {
        Self::new(origin, origin + extent)
    }

    /// Width of the rectangle.
    #[must_use]
    pub fn width(&self) -> Fixed {
        self.max.x - self.min.x
    }

    /// Height of the rectangle.
    #[must_use]
    pub fn height(&self) -> Fixed {
        self.max.y - self.min.y
    }

    /// Check whether two rectangles share any area.
    #[must_use]
    pub fn intersects(&self, other: &Self) -> bool {
        self.min.x < other.max.x
            && other.min.x < self.max.x
            && self.min.y < other.max.y
            && other.min.y < self.max.y
    }

    /// Check whether a point lies inside (min inclusive, max exclusive).
    #[must_use]
    pub fn contains_point(&self, point: Vec2Fixed) -> bool {
        point.x >= self.min.x && point.y >= self.min.y && point.x < self.max.x && point.y < self.max.y
    }

    /// Shrink by `margin` on every side.
    #[must_use]
    pub fn shrink(&self, margin: Fixed) -> Self {
        Self::new(
            Vec2Fixed::new(self.min.x + margin, self.min.y + margin),
            Vec2Fixed::new(self.max.x - margin, self.max.y - margin),
        )
    }
}

/// World-space circle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Circle {
    /// Centre.
    pub center: Vec2Fixed,
    /// Radius.
    #[serde(with = "crate::math::fixed_serde")]
    pub radius: Fixed,
}

impl Circle {
    /// Create a circle.
    #[must_use]
    pub const fn new(center: Vec2Fixed, radius: Fixed) -> Self {
        Self { center, radius }
    }

    /// Axis-aligned bounding rectangle.
    #[must_use]
    pub fn bounding_rect(&self) -> Rect {
        Rect::new(
            Vec2Fixed::new(self.center.x - self.radius, self.center.y - self.radius),
            Vec2Fixed::new(self.center.x + self.radius, self.center.y + self.radius),
        )
    }

    /// Check whether a point is inside or on the circle.
    #[must_use]
    pub fn contains(&self, point: Vec2Fixed) -> bool {
        self.center.distance_squared(point) <= self.radius * self.radius
    }

    /// Check whether the circle touches a rectangle.
    #[must_use]
    pub fn intersects_rect(&self, rect: &Rect) -> bool {
        let closest = Vec2Fixed::new(
            self.center.x.clamp(rect.min.x, rect.max.x),
            self.center.y.clamp(rect.min.y, rect.max.y),
        );
        self.contains(closest)
    }

    /// Tiles whose centres fall inside the circle.
    #[must_use]
    pub fn covers_tile(&self, point: Point) -> bool {
        self.contains(point.center())
    }

    /// Smallest tile region containing every tile the circle covers.
    #[must_use]
    pub fn tile_bounds(&self) -> Region {
        let rect = self.bounding_rect();
        Region::from_bounds(
            crate::math::floor_to_int(rect.min.x),
            crate::math::floor_to_int(rect.min.y),
            crate::math::ceil_to_int(rect.max.x),
            crate::math::ceil_to_int(rect.max.y),
        )
    }
}
