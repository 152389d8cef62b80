//! Spatial bucket index over a fixed grid of zones.
//!
//! The world is cut into `zone_count × zone_count` equally sized zones.
//! Each zone lists every entity whose bounding rectangle overlaps it, so an
//! entity straddling a border is listed in several zones and area queries
//! never need to look outside the zones they overlap.
//!
//! # Zone ranges
//!
//! For a half-open rectangle `[min, max)` the covered zones along an axis
//! are `floor(min / zone) ..= ceil(max / zone) - 1`, clamped to the grid.
//! A rectangle ending exactly on a zone border therefore does not reach
//! into the next zone. Entities outside the world are kept in the edge
//! zones, so queries stay complete for them too.

use crate::entity::Handle;
use crate::geometry::{Circle, Rect, Size};
use crate::math::{ceil_to_int, floor_to_int, Fixed, Vec2Fixed};
use crate::pool::BufferPool;

/// Largest supported number of zones along each axis.
pub const MAX_ZONE_COUNT: u32 = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ZoneEntry {
    handle: Handle,
    bounds: Rect,
}

/// Inclusive range of zone coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ZoneRange {
    /// First zone column.
    pub min_x: i32,
    /// First zone row.
    pub min_y: i32,
    /// Last zone column (inclusive).
    pub max_x: i32,
    /// Last zone row (inclusive).
    pub max_y: i32,
}

impl ZoneRange {
    /// Iterate the zone coordinates in row-major order.
    pub fn zones(self) -> impl Iterator<Item = (i32, i32)> {
        (self.min_y..=self.max_y).flat_map(move |y| (self.min_x..=self.max_x).map(move |x| (x, y)))
    }

    /// Check whether a zone lies in the range.
    #[must_use]
    pub const fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }

    /// Number of zones covered.
    #[must_use]
    pub const fn len(&self) -> usize {
        ((self.max_x - self.min_x + 1) * (self.max_y - self.min_y + 1)) as usize
    }

    /// Always `false`; a range covers at least one zone.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        false
    }
}

/// Spatial index answering "which entities overlap this area".
///
/// Holds handles and cached bounding rectangles only; entities themselves
/// are owned by [`EntityManager`](crate::manager::EntityManager).
#[derive(Debug, Clone)]
pub struct EntityZoneManager {
    zone_count: i32,
    zone_size: Vec2Fixed,
    zones: Vec<Vec<ZoneEntry>>,
    pool: BufferPool<ZoneEntry>,
    len: usize,
}

impl EntityZoneManager {
    /// Create an index over a world of `world_size` tiles.
    ///
    /// # Panics
    ///
    /// Panics if the world size is not positive or `zone_count` is outside
    /// `1..=MAX_ZONE_COUNT`.
    #[must_use]
    pub fn new(world_size: Size, zone_count: u32) -> Self {
        assert!(
            (1..=MAX_ZONE_COUNT).contains(&zone_count),
            "zone_count must be in 1..={MAX_ZONE_COUNT}, got {zone_count}"
        );
        assert!(
            world_size.width > 0 && world_size.height > 0,
            "world size must be positive"
        );
        let Ok(count) = i32::try_from(zone_count) else {
            unreachable!("zone_count bounded by MAX_ZONE_COUNT");
        };
        let zone_size = Vec2Fixed::new(
            Fixed::from_num(world_size.width) / Fixed::from_num(count),
            Fixed::from_num(world_size.height) / Fixed::from_num(count),
        );
        Self {
            zone_count: count,
            zone_size,
            zones: vec![Vec::new(); (count * count) as usize],
            pool: BufferPool::new(),
            len: 0,
        }
    }

    /// Zones per axis.
    #[must_use]
    pub const fn zone_count(&self) -> i32 {
        self.zone_count
    }

    /// World-space extent of one zone.
    #[must_use]
    pub const fn zone_size(&self) -> Vec2Fixed {
        self.zone_size
    }

    /// Number of indexed entities.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Whether the index is empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    fn zone_index(&self, x: i32, y: i32) -> usize {
        (y * self.zone_count + x) as usize
    }

    fn axis_range(&self, min: Fixed, max: Fixed, zone: Fixed) -> (i32, i32) {
        let last = self.zone_count - 1;
        let lo = floor_to_int(min / zone).clamp(0, last);
        let hi = (ceil_to_int(max / zone) - 1).clamp(0, last);
        (lo, hi.max(lo))
    }

    /// Zones overlapped by a rectangle.
    #[must_use]
    pub fn zone_range(&self, rect: &Rect) -> ZoneRange {
        let (min_x, max_x) = self.axis_range(rect.min.x, rect.max.x, self.zone_size.x);
        let (min_y, max_y) = self.axis_range(rect.min.y, rect.max.y, self.zone_size.y);
        ZoneRange {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Zone containing a point, clamped to the grid.
    #[must_use]
    pub fn zone_of(&self, point: Vec2Fixed) -> (i32, i32) {
        let last = self.zone_count - 1;
        (
            floor_to_int(point.x / self.zone_size.x).clamp(0, last),
            floor_to_int(point.y / self.zone_size.y).clamp(0, last),
        )
    }

    /// Index an entity under every zone its bounding rectangle overlaps.
    pub fn add(&mut self, handle: Handle, bounds: Rect) {
        let entry = ZoneEntry { handle, bounds };
        for (x, y) in self.zone_range(&bounds).zones() {
            let index = self.zone_index(x, y);
            debug_assert!(
                !self.zones[index].iter().any(|e| e.handle == handle),
                "{handle} already indexed in zone ({x}, {y})"
            );
            self.pool.push(&mut self.zones[index], entry);
        }
        self.len += 1;
    }

    /// Remove an entity indexed with `bounds`.
    pub fn remove(&mut self, handle: Handle, bounds: Rect) {
        for (x, y) in self.zone_range(&bounds).zones() {
            let index = self.zone_index(x, y);
            let zone = &mut self.zones[index];
            let position = zone.iter().position(|e| e.handle == handle);
            debug_assert!(position.is_some(), "{handle} missing from zone ({x}, {y})");
            if let Some(position) = position {
                zone.swap_remove(position);
            }
            self.pool.release_if_empty(zone);
        }
        self.len -= 1;
    }

    /// Re-index an entity whose bounding rectangle changed.
    ///
    /// When the zone range is unchanged only the cached bounds are
    /// refreshed; otherwise the entity is removed and re-added. Returns
    /// whether the entity changed zones.
    pub fn update(&mut self, handle: Handle, old_bounds: Rect, new_bounds: Rect) -> bool {
        if self.zone_range(&old_bounds) != self.zone_range(&new_bounds) {
            self.remove(handle, old_bounds);
            self.add(handle, new_bounds);
            tracing::trace!(%handle, "Entity changed zones");
            return true;
        }
        for (x, y) in self.zone_range(&new_bounds).zones() {
            let index = self.zone_index(x, y);
            let entry = self.zones[index].iter_mut().find(|e| e.handle == handle);
            debug_assert!(entry.is_some(), "{handle} missing from zone ({x}, {y})");
            if let Some(entry) = entry {
                entry.bounds = new_bounds;
            }
        }
        false
    }

    /// Visit each entity whose cached bounds satisfy `accept`, once, among
    /// the zones overlapped by `area`.
    fn collect(&self, area: &Rect, accept: impl Fn(&Rect) -> bool, out: &mut Vec<Handle>) {
        let range = self.zone_range(area);
        for (x, y) in range.zones() {
            for entry in &self.zones[self.zone_index(x, y)] {
                // Report a multi-zone entity only from the first zone it
                // shares with the query.
                let own = self.zone_range(&entry.bounds);
                if (own.min_x.max(range.min_x), own.min_y.max(range.min_y)) != (x, y) {
                    continue;
                }
                if accept(&entry.bounds) {
                    out.push(entry.handle);
                }
            }
        }
    }

    /// Append to `out` every entity whose bounding rectangle intersects
    /// `rect`, each once, in handle order.
    pub fn intersecting_rect_into(&self, rect: &Rect, out: &mut Vec<Handle>) {
        let start = out.len();
        self.collect(rect, |bounds| bounds.intersects(rect), out);
        out[start..].sort_unstable();
    }

    /// Entities whose bounding rectangle intersects `rect`, in handle order.
    #[must_use]
    pub fn intersecting_rect(&self, rect: &Rect) -> Vec<Handle> {
        let mut out = Vec::new();
        self.intersecting_rect_into(rect, &mut out);
        out
    }

    /// Entities whose bounding rectangle overlaps `circle`, in handle order.
    ///
    /// Rectangles are half-open, so one that only meets the circle at its
    /// leftmost, rightmost, top or bottom point is not reported.
    #[must_use]
    pub fn intersecting_circle(&self, circle: &Circle) -> Vec<Handle> {
        let mut out = Vec::new();
        let area = circle.bounding_rect();
        self.collect(
            &area,
            |bounds| bounds.intersects(&area) && circle.intersects_rect(bounds),
            &mut out,
        );
        out.sort_unstable();
        out
    }

    /// Entities whose bounding rectangle contains `point`.
    ///
    /// Scans a single zone lazily; do not hold the iterator across
    /// mutations.
    pub fn intersecting_point(&self, point: Vec2Fixed) -> impl Iterator<Item = Handle> + '_ {
        let (x, y) = self.zone_of(point);
        self.zones[self.zone_index(x, y)]
            .iter()
            .filter(move |e| e.bounds.contains_point(point))
            .map(|e| e.handle)
    }

    /// Zones currently listing `handle`, in row-major order.
    #[must_use]
    pub fn zones_containing(&self, handle: Handle) -> Vec<(i32, i32)> {
        (0..self.zone_count)
            .flat_map(|y| (0..self.zone_count).map(move |x| (x, y)))
            .filter(|&(x, y)| {
                self.zones[self.zone_index(x, y)]
                    .iter()
                    .any(|e| e.handle == handle)
            })
            .collect()
    }

    /// Number of entries listed in a zone.
    #[must_use]
    pub fn zone_len(&self, x: i32, y: i32) -> usize {
        self.zones[self.zone_index(x, y)].len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::bounding_rect_at;

    fn ten_by_ten() -> EntityZoneManager {
        EntityZoneManager::new(Size::new(10, 10), 8)
    }

    fn bounds(x: i32, y: i32, w: i32, h: i32) -> Rect {
        bounding_rect_at(Vec2Fixed::from_ints(x, y), Size::new(w, h))
    }

    #[test]
    fn test_zone_size() {
        let zones = ten_by_ten();
        assert_eq!(zones.zone_size().x, Fixed::from_num(1.25));
        assert_eq!(zones.zone_count(), 8);
    }

    #[test]
    fn test_two_by_two_at_origin_spans_four_zones() {
        let mut zones = ten_by_ten();
        let handle = Handle::from_raw(1);
        zones.add(handle, bounds(0, 0, 2, 2));
        assert_eq!(zones.zones_containing(handle), vec![(0, 0), (1, 0), (0, 1), (1, 1)]);
    }

    #[test]
    fn test_move_transfers_zones() {
        let mut zones = ten_by_ten();
        let handle = Handle::from_raw(1);
        zones.add(handle, bounds(0, 0, 2, 2));
        assert!(zones.update(handle, bounds(0, 0, 2, 2), bounds(5, 5, 2, 2)));
        // [5, 7) / 1.25 = [4, 5.6) -> zones 4 and 5.
        assert_eq!(zones.zones_containing(handle), vec![(4, 4), (5, 4), (4, 5), (5, 5)]);
        assert_eq!(zones.zone_len(0, 0), 0);
        assert_eq!(zones.len(), 1);
    }

    #[test]
    fn test_move_within_zone_keeps_membership() {
        let mut zones = ten_by_ten();
        let handle = Handle::from_raw(1);
        let from = Rect::from_origin_size(
            Vec2Fixed::new(Fixed::from_num(0.1), Fixed::ZERO),
            Vec2Fixed::from_ints(1, 1),
        );
        zones.add(handle, from);
        let to = Rect::from_origin_size(
            Vec2Fixed::new(Fixed::from_num(0.2), Fixed::ZERO),
            Vec2Fixed::from_ints(1, 1),
        );
        assert!(!zones.update(handle, from, to));
        // Cached bounds follow the move.
        let inside = Vec2Fixed::new(Fixed::from_num(1.15), Fixed::from_num(0.5));
        assert_eq!(zones.intersecting_point(inside).collect::<Vec<_>>(), vec![handle]);
    }

    #[test]
    fn test_rect_ending_on_border_stays_in_zone() {
        let zones = EntityZoneManager::new(Size::new(16, 16), 8);
        // Zone size 2: [0, 2) covers only zone 0.
        let range = zones.zone_range(&bounds(0, 0, 2, 2));
        assert_eq!((range.min_x, range.max_x), (0, 0));
        let range = zones.zone_range(&bounds(1, 1, 2, 2));
        assert_eq!((range.min_x, range.max_x), (0, 1));
    }

    #[test]
    fn test_out_of_world_rect_clamps() {
        let zones = ten_by_ten();
        let range = zones.zone_range(&bounds(-5, 9, 2, 4));
        assert_eq!(range, ZoneRange { min_x: 0, min_y: 7, max_x: 0, max_y: 7 });
        assert_eq!(range.len(), 1);
    }

    #[test]
    fn test_rect_query_deduplicates() {
        let mut zones = ten_by_ten();
        let big = Handle::from_raw(1);
        let small = Handle::from_raw(2);
        let far = Handle::from_raw(3);
        zones.add(big, bounds(0, 0, 5, 5));
        zones.add(small, bounds(3, 3, 1, 1));
        zones.add(far, bounds(8, 8, 1, 1));

        let found = zones.intersecting_rect(&bounds(0, 0, 10, 10));
        assert_eq!(found, vec![big, small, far]);

        let found = zones.intersecting_rect(&bounds(4, 4, 2, 2));
        assert_eq!(found, vec![big]);
    }

    #[test]
    fn test_rect_query_excludes_touching() {
        let mut zones = ten_by_ten();
        let handle = Handle::from_raw(1);
        zones.add(handle, bounds(2, 2, 2, 2));
        assert!(zones.intersecting_rect(&bounds(4, 2, 2, 2)).is_empty());
        assert_eq!(zones.intersecting_rect(&bounds(3, 3, 2, 2)), vec![handle]);
    }

    #[test]
    fn test_circle_query_filters_corners() {
        let mut zones = ten_by_ten();
        let near = Handle::from_raw(1);
        let corner = Handle::from_raw(2);
        zones.add(near, bounds(6, 5, 1, 1));
        zones.add(corner, bounds(7, 7, 1, 1));
        let circle = Circle::new(Vec2Fixed::from_ints(5, 5), Fixed::from_num(2));
        assert_eq!(zones.intersecting_circle(&circle), vec![near]);
    }

    #[test]
    fn test_circle_query_excludes_touching() {
        let mut zones = ten_by_ten();
        let inside = Handle::from_raw(1);
        let touching = Handle::from_raw(2);
        zones.add(inside, bounds(6, 4, 1, 2));
        zones.add(touching, bounds(7, 4, 1, 2));
        let circle = Circle::new(Vec2Fixed::from_ints(5, 5), Fixed::from_num(2));
        assert_eq!(zones.intersecting_circle(&circle), vec![inside]);
    }

    #[test]
    #[should_panic(expected = "zone_count must be in")]
    fn test_zone_count_is_bounded() {
        let _ = EntityZoneManager::new(Size::new(10, 10), MAX_ZONE_COUNT + 1);
    }

    #[test]
    fn test_point_query() {
        let mut zones = ten_by_ten();
        let handle = Handle::from_raw(1);
        zones.add(handle, bounds(3, 3, 2, 2));
        let inside = Vec2Fixed::new(Fixed::from_num(4.5), Fixed::from_num(3.1));
        assert_eq!(zones.intersecting_point(inside).collect::<Vec<_>>(), vec![handle]);
        assert_eq!(zones.intersecting_point(Vec2Fixed::from_ints(5, 5)).count(), 0);
    }

    #[test]
    fn test_remove_releases_buffers() {
        let mut zones = ten_by_ten();
        let handle = Handle::from_raw(1);
        zones.add(handle, bounds(0, 0, 2, 2));
        zones.remove(handle, bounds(0, 0, 2, 2));
        assert!(zones.is_empty());
        assert!(zones.zones_containing(handle).is_empty());
        assert_eq!(zones.pool.idle(), 4);

        // Re-adding draws from the pool again.
        zones.add(handle, bounds(0, 0, 2, 2));
        assert_eq!(zones.pool.idle(), 0);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "already indexed")]
    fn test_double_add_is_a_fault() {
        let mut zones = ten_by_ten();
        zones.add(Handle::from_raw(1), bounds(0, 0, 1, 1));
        zones.add(Handle::from_raw(1), bounds(0, 0, 1, 1));
    }
}
