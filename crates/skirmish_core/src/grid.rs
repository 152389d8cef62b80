//! Per-tile exclusive occupancy for the Ground and Air collision layers.

use crate::entity::{CollisionLayer, Handle};
use crate::geometry::{Point, Region, Size};

/// Dense tile grid storing at most one occupant per tile.
#[derive(Debug, Clone)]
pub struct EntityGrid {
    width: i32,
    height: i32,
    cells: Vec<Option<Handle>>,
}

impl EntityGrid {
    /// Create an empty grid covering `size` tiles.
    #[must_use]
    pub fn new(size: Size) -> Self {
        Self {
            width: size.width,
            height: size.height,
            cells: vec![None; size.area().max(0) as usize],
        }
    }

    /// Check whether a tile lies inside the grid.
    #[must_use]
    pub const fn contains(&self, point: Point) -> bool {
        point.x >= 0 && point.y >= 0 && point.x < self.width && point.y < self.height
    }

    /// Region covering the whole grid.
    #[must_use]
    pub const fn bounds(&self) -> Region {
        Region::new(Point::new(0, 0), Size::new(self.width, self.height))
    }

    #[inline]
    fn index(&self, point: Point) -> usize {
        (point.y as usize) * (self.width as usize) + (point.x as usize)
    }

    /// Occupant of a tile. `None` for empty or out-of-bounds tiles.
    #[must_use]
    pub fn get(&self, point: Point) -> Option<Handle> {
        if self.contains(point) {
            self.cells[self.index(point)]
        } else {
            None
        }
    }

    /// Check whether a tile is taken.
    #[must_use]
    pub fn is_occupied(&self, point: Point) -> bool {
        self.get(point).is_some()
    }

    /// Check whether every in-bounds tile of a region is empty.
    #[must_use]
    pub fn is_free(&self, region: &Region) -> bool {
        region.points().all(|p| !self.is_occupied(p))
    }

    /// Claim every tile of `region` for `handle`.
    ///
    /// Callers validate placement first; claiming a taken tile is a bug.
    /// Tiles outside the grid are skipped.
    pub fn add(&mut self, handle: Handle, region: &Region) {
        let clipped = region.intersection(&self.bounds());
        for point in clipped.points() {
            let index = self.index(point);
            debug_assert!(
                self.cells[index].is_none(),
                "tile {point:?} already held by {:?}, cannot add {handle}",
                self.cells[index]
            );
            self.cells[index] = Some(handle);
        }
    }

    /// Release every tile of `region` held by `handle`.
    ///
    /// The region must match the one passed to [`add`](Self::add).
    pub fn remove(&mut self, handle: Handle, region: &Region) {
        let clipped = region.intersection(&self.bounds());
        for point in clipped.points() {
            let index = self.index(point);
            debug_assert_eq!(
                self.cells[index],
                Some(handle),
                "tile {point:?} not held by {handle}"
            );
            if self.cells[index] == Some(handle) {
                self.cells[index] = None;
            }
        }
    }

    /// Number of occupied tiles.
    #[must_use]
    pub fn occupied_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_some()).count()
    }
}

/// The Ground and Air occupancy grids.
#[derive(Debug, Clone)]
pub struct CollisionGrids {
    ground: EntityGrid,
    air: EntityGrid,
}

impl CollisionGrids {
    /// Create empty grids covering `size` tiles.
    #[must_use]
    pub fn new(size: Size) -> Self {
        Self {
            ground: EntityGrid::new(size),
            air: EntityGrid::new(size),
        }
    }

    /// Grid for a layer. `None` for [`CollisionLayer::None`].
    #[must_use]
    pub const fn layer(&self, layer: CollisionLayer) -> Option<&EntityGrid> {
        match layer {
            CollisionLayer::None => None,
            CollisionLayer::Ground => Some(&self.ground),
            CollisionLayer::Air => Some(&self.air),
        }
    }

    fn layer_mut(&mut self, layer: CollisionLayer) -> Option<&mut EntityGrid> {
        match layer {
            CollisionLayer::None => None,
            CollisionLayer::Ground => Some(&mut self.ground),
            CollisionLayer::Air => Some(&mut self.air),
        }
    }

    /// Ground occupancy.
    #[must_use]
    pub const fn ground(&self) -> &EntityGrid {
        &self.ground
    }

    /// Air occupancy.
    #[must_use]
    pub const fn air(&self) -> &EntityGrid {
        &self.air
    }

    /// Occupant of a tile on a layer.
    #[must_use]
    pub fn get(&self, point: Point, layer: CollisionLayer) -> Option<Handle> {
        self.layer(layer).and_then(|grid| grid.get(point))
    }

    /// Register an entity on its layer. No-op for [`CollisionLayer::None`].
    pub fn add(&mut self, handle: Handle, region: &Region, layer: CollisionLayer) {
        if let Some(grid) = self.layer_mut(layer) {
            grid.add(handle, region);
        }
    }

    /// Unregister an entity from its layer.
    pub fn remove(&mut self, handle: Handle, region: &Region, layer: CollisionLayer) {
        if let Some(grid) = self.layer_mut(layer) {
            grid.remove(handle, region);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region(x: i32, y: i32, w: i32, h: i32) -> Region {
        Region::new(Point::new(x, y), Size::new(w, h))
    }

    #[test]
    fn test_add_occupies_whole_region() {
        let mut grid = EntityGrid::new(Size::new(8, 8));
        let handle = Handle::from_raw(1);
        grid.add(handle, &region(2, 2, 2, 3));
        assert_eq!(grid.occupied_count(), 6);
        assert_eq!(grid.get(Point::new(3, 4)), Some(handle));
        assert_eq!(grid.get(Point::new(4, 4)), None);
        assert!(!grid.is_free(&region(3, 3, 2, 2)));
        assert!(grid.is_free(&region(4, 2, 2, 2)));
    }

    #[test]
    fn test_remove_is_symmetric() {
        let mut grid = EntityGrid::new(Size::new(8, 8));
        let handle = Handle::from_raw(1);
        grid.add(handle, &region(0, 0, 2, 2));
        grid.remove(handle, &region(0, 0, 2, 2));
        assert_eq!(grid.occupied_count(), 0);
    }

    #[test]
    fn test_partially_outside_region_is_clipped() {
        let mut grid = EntityGrid::new(Size::new(4, 4));
        let handle = Handle::from_raw(3);
        grid.add(handle, &region(-1, 2, 3, 3));
        assert_eq!(grid.occupied_count(), 4);
        assert_eq!(grid.get(Point::new(0, 3)), Some(handle));
        assert_eq!(grid.get(Point::new(1, 2)), Some(handle));

        grid.remove(handle, &region(-1, 2, 3, 3));
        assert_eq!(grid.occupied_count(), 0);
    }

    #[test]
    fn test_out_of_bounds_is_empty() {
        let grid = EntityGrid::new(Size::new(4, 4));
        assert_eq!(grid.get(Point::new(-1, 0)), None);
        assert_eq!(grid.get(Point::new(0, 4)), None);
    }

    #[test]
    fn test_region_clipped_at_edge() {
        let mut grid = EntityGrid::new(Size::new(4, 4));
        grid.add(Handle::from_raw(5), &region(3, 3, 2, 2));
        assert_eq!(grid.occupied_count(), 1);
    }

    #[test]
    fn test_layers_are_independent() {
        let mut grids = CollisionGrids::new(Size::new(4, 4));
        let tank = Handle::from_raw(1);
        let plane = Handle::from_raw(2);
        grids.add(tank, &region(1, 1, 1, 1), CollisionLayer::Ground);
        grids.add(plane, &region(1, 1, 1, 1), CollisionLayer::Air);
        grids.add(Handle::from_raw(3), &region(1, 1, 1, 1), CollisionLayer::None);

        assert_eq!(grids.get(Point::new(1, 1), CollisionLayer::Ground), Some(tank));
        assert_eq!(grids.get(Point::new(1, 1), CollisionLayer::Air), Some(plane));
        assert_eq!(grids.get(Point::new(1, 1), CollisionLayer::None), None);
        assert_eq!(grids.ground().occupied_count(), 1);
        assert_eq!(grids.air().occupied_count(), 1);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "already held")]
    fn test_overlapping_add_is_a_fault() {
        let mut grid = EntityGrid::new(Size::new(4, 4));
        grid.add(Handle::from_raw(1), &region(0, 0, 2, 2));
        grid.add(Handle::from_raw(2), &region(1, 1, 2, 2));
    }
}
