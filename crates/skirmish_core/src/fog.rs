//! Per-faction tile visibility.
//!
//! A [`FogOfWar`] keeps two layers per tile:
//! - a reference count of line-of-sight circles covering the tile, which
//!   makes the tile [`TileVisibility::Visible`] while positive;
//! - a sticky `discovered` flag. Once set it is never cleared, so a tile
//!   that stops being visible falls back to [`TileVisibility::Discovered`].
//!
//! Every mutating call returns the smallest [`Region`] containing all
//! tiles whose [`TileVisibility`] changed (empty when nothing changed), so
//! consumers can patch only the dirty part of their caches.

use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};
use crate::geometry::{Circle, Point, Region, Size};

/// Visibility state of a single tile, ordered from least to most known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TileVisibility {
    /// Never seen.
    Undiscovered,
    /// Seen before, not currently in sight.
    Discovered,
    /// Currently in sight.
    Visible,
}

/// Visibility map of one faction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FogOfWar {
    width: i32,
    height: i32,
    /// Number of sight circles covering each tile.
    sight: Vec<u32>,
    discovered: Vec<bool>,
}

/// Accumulates the bounds of changed tiles.
#[derive(Debug, Default)]
struct Dirty(Region);

impl Dirty {
    fn mark(&mut self, point: Point) {
        self.0 = self.0.union(&Region::new(point, Size::ONE));
    }
}

impl FogOfWar {
    /// Create a fully undiscovered map of `size` tiles.
    #[must_use]
    pub fn new(size: Size) -> Self {
        let area = size.area().max(0) as usize;
        Self {
            width: size.width,
            height: size.height,
            sight: vec![0; area],
            discovered: vec![false; area],
        }
    }

    /// Map size in tiles.
    #[must_use]
    pub const fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    /// Whole map as a region.
    #[must_use]
    pub const fn bounds(&self) -> Region {
        Region::new(Point::new(0, 0), self.size())
    }

    /// Check whether a tile lies inside the map.
    #[must_use]
    pub const fn contains(&self, point: Point) -> bool {
        point.x >= 0 && point.y >= 0 && point.x < self.width && point.y < self.height
    }

    #[inline]
    fn index(&self, point: Point) -> usize {
        (point.y as usize) * (self.width as usize) + (point.x as usize)
    }

    /// Visibility of a tile.
    ///
    /// Tiles outside the map are a caller bug; they report `Undiscovered`
    /// in release builds.
    #[must_use]
    pub fn get(&self, point: Point) -> TileVisibility {
        debug_assert!(self.contains(point), "fog query out of bounds: {point:?}");
        if !self.contains(point) {
            return TileVisibility::Undiscovered;
        }
        let index = self.index(point);
        if self.sight[index] > 0 {
            TileVisibility::Visible
        } else if self.discovered[index] {
            TileVisibility::Discovered
        } else {
            TileVisibility::Undiscovered
        }
    }

    /// Check whether a tile is currently in sight.
    #[must_use]
    pub fn is_visible(&self, point: Point) -> bool {
        self.get(point) == TileVisibility::Visible
    }

    /// Check whether a tile has ever been seen.
    #[must_use]
    pub fn is_discovered(&self, point: Point) -> bool {
        self.get(point) >= TileVisibility::Discovered
    }

    /// Start counting a sight circle.
    pub fn add_line_of_sight(&mut self, circle: &Circle) -> Region {
        let mut dirty = Dirty::default();
        for point in self.clip(circle.tile_bounds()).points() {
            if circle.covers_tile(point) {
                self.raise(point, &mut dirty);
            }
        }
        dirty.0
    }

    /// Stop counting a sight circle previously added.
    pub fn remove_line_of_sight(&mut self, circle: &Circle) -> Region {
        let mut dirty = Dirty::default();
        for point in self.clip(circle.tile_bounds()).points() {
            if circle.covers_tile(point) {
                self.lower(point, &mut dirty);
            }
        }
        dirty.0
    }

    /// Start counting sight over every tile of `region`.
    pub fn add_region_sight(&mut self, region: &Region) -> Region {
        let mut dirty = Dirty::default();
        for point in self.clip(*region).points() {
            self.raise(point, &mut dirty);
        }
        dirty.0
    }

    /// Stop counting region sight previously added.
    pub fn remove_region_sight(&mut self, region: &Region) -> Region {
        let mut dirty = Dirty::default();
        for point in self.clip(*region).points() {
            self.lower(point, &mut dirty);
        }
        dirty.0
    }

    /// Replace sight circle `old` with `new`, touching only tiles covered
    /// by exactly one of them.
    pub fn update_line_of_sight(&mut self, old: &Circle, new: &Circle) -> Region {
        let mut dirty = Dirty::default();
        let area = self.clip(old.tile_bounds().union(&new.tile_bounds()));
        for point in area.points() {
            match (old.covers_tile(point), new.covers_tile(point)) {
                (true, false) => self.lower(point, &mut dirty),
                (false, true) => self.raise(point, &mut dirty),
                _ => {}
            }
        }
        tracing::trace!(?area, changed = ?dirty.0, "Line of sight updated");
        dirty.0
    }

    /// Mark every tile of `region` discovered without making it visible.
    pub fn discover_region(&mut self, region: &Region) -> Region {
        let mut dirty = Dirty::default();
        for point in self.clip(*region).points() {
            self.discover_at(point, &mut dirty);
        }
        dirty.0
    }

    /// Mark one tile discovered. Returns `true` if it was undiscovered.
    pub fn discover(&mut self, point: Point) -> bool {
        if !self.contains(point) {
            return false;
        }
        let mut dirty = Dirty::default();
        self.discover_at(point, &mut dirty);
        !dirty.0.is_empty()
    }

    /// Copy every discovery of `other` into this map.
    ///
    /// Both maps must cover the same world.
    pub fn absorb_discoveries(&mut self, other: &Self) -> Region {
        debug_assert_eq!(self.size(), other.size(), "fog maps of different worlds");
        let mut dirty = Dirty::default();
        for point in self.clip(other.bounds()).points() {
            if other.discovered[other.index(point)] {
                self.discover_at(point, &mut dirty);
            }
        }
        dirty.0
    }

    /// Tiles ever discovered inside `region`, in row-major order.
    pub fn discovered_in(&self, region: &Region) -> impl Iterator<Item = Point> + '_ {
        self.clip(*region)
            .points()
            .filter(move |p| self.discovered[self.index(*p)])
    }

    /// Number of discovered tiles (visible ones included).
    #[must_use]
    pub fn discovered_count(&self) -> usize {
        self.discovered.iter().filter(|d| **d).count()
    }

    /// Number of tiles currently in sight.
    #[must_use]
    pub fn visible_count(&self) -> usize {
        self.sight.iter().filter(|c| **c > 0).count()
    }

    /// Encode as a compact binary snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::Serialization`] if encoding fails.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).map_err(|e| GameError::Serialization(e.to_string()))
    }

    /// Decode a snapshot produced by [`to_bytes`](Self::to_bytes).
    ///
    /// # Errors
    ///
    /// Returns [`GameError::Serialization`] if the data is malformed.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let fog: Self =
            bincode::deserialize(data).map_err(|e| GameError::Serialization(e.to_string()))?;
        let area = fog.size().area().max(0) as usize;
        if fog.sight.len() != area || fog.discovered.len() != area {
            return Err(GameError::Serialization("fog cell count mismatch".to_string()));
        }
        Ok(fog)
    }

    fn clip(&self, region: Region) -> Region {
        region.intersection(&self.bounds())
    }

    fn raise(&mut self, point: Point, dirty: &mut Dirty) {
        let index = self.index(point);
        self.sight[index] += 1;
        if self.sight[index] == 1 {
            self.discovered[index] = true;
            dirty.mark(point);
        }
    }

    fn lower(&mut self, point: Point, dirty: &mut Dirty) {
        let index = self.index(point);
        debug_assert!(self.sight[index] > 0, "sight count underflow at {point:?}");
        self.sight[index] = self.sight[index].saturating_sub(1);
        if self.sight[index] == 0 {
            dirty.mark(point);
        }
    }

    fn discover_at(&mut self, point: Point, dirty: &mut Dirty) {
        let index = self.index(point);
        if !self.discovered[index] {
            self.discovered[index] = true;
            dirty.mark(point);
        }
    }
}
