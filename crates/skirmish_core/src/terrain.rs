//! Immutable per-tile walkability grid.
//!
//! Terrain is written once at world generation, either from a bit-grid
//! source or from seeded value noise, and only queried afterwards.

use serde::{Deserialize, Serialize};

use crate::config::TerrainConfig;
use crate::error::{GameError, Result};
use crate::geometry::{Point, Rect, Region, Size};
use crate::math::{ceil_to_int, floor_to_int};

/// Walkability of every tile in the world.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Terrain {
    width: i32,
    height: i32,
    /// Row-major, `true` = not walkable.
    blocked: Vec<bool>,
}

impl Terrain {
    /// Fully walkable terrain.
    ///
    /// # Panics
    ///
    /// Panics if either dimension is not positive.
    #[must_use]
    pub fn open(size: Size) -> Self {
        assert!(size.width > 0 && size.height > 0, "Terrain size must be positive");
        Self {
            width: size.width,
            height: size.height,
            blocked: vec![false; size.area() as usize],
        }
    }

    /// Build from a row-major list of blocked flags.
    pub fn from_cells(size: Size, blocked: Vec<bool>) -> Result<Self> {
        if size.width <= 0 || size.height <= 0 || blocked.len() != size.area() as usize {
            return Err(GameError::InvalidState(format!(
                "terrain of {}x{} needs {} cells, got {}",
                size.width,
                size.height,
                size.area().max(0),
                blocked.len()
            )));
        }
        Ok(Self {
            width: size.width,
            height: size.height,
            blocked,
        })
    }

    /// Build from text rows where `#` or `1` marks a blocked tile.
    ///
    /// All rows must have the same length.
    pub fn from_bit_rows(rows: &[&str]) -> Result<Self> {
        let width = rows.first().map_or(0, |r| r.chars().count());
        if let Some(bad) = rows.iter().position(|r| r.chars().count() != width) {
            return Err(GameError::InvalidState(format!(
                "terrain row {bad} has a different width than row 0"
            )));
        }
        let blocked = rows
            .iter()
            .flat_map(|row| row.chars().map(|c| matches!(c, '#' | '1')))
            .collect();
        Self::from_cells(Size::new(width as i32, rows.len() as i32), blocked)
    }

    /// Generate terrain from seeded value noise.
    ///
    /// The noise field is thresholded so that roughly
    /// `config.obstacle_density` of all tiles end up blocked. The same seed
    /// always yields the same terrain.
    ///
    /// # Panics
    ///
    /// Panics if either dimension is not positive.
    #[must_use]
    pub fn generate(size: Size, config: &TerrainConfig) -> Self {
        let mut terrain = Self::open(size);
        let field = NoiseField::new(size, config.feature_size.max(1) as i32, config.seed);

        let samples: Vec<f32> = Region::new(Point::new(0, 0), size)
            .points()
            .map(|p| field.sample(p))
            .collect();

        let blocked_target = (samples.len() as f32 * config.obstacle_density.clamp(0.0, 1.0)) as usize;
        if blocked_target == 0 {
            return terrain;
        }

        let mut sorted = samples.clone();
        sorted.sort_by(f32::total_cmp);
        let threshold = sorted[sorted.len() - blocked_target];

        for (cell, sample) in terrain.blocked.iter_mut().zip(samples) {
            *cell = sample >= threshold;
        }
        tracing::debug!(
            seed = config.seed,
            blocked = terrain.blocked.iter().filter(|b| **b).count(),
            "Generated terrain"
        );
        terrain
    }

    /// Width in tiles.
    #[must_use]
    pub const fn width(&self) -> i32 {
        self.width
    }

    /// Height in tiles.
    #[must_use]
    pub const fn height(&self) -> i32 {
        self.height
    }

    /// Dimensions in tiles.
    #[must_use]
    pub const fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    /// Region covering the whole terrain.
    #[must_use]
    pub const fn bounds(&self) -> Region {
        Region::new(Point::new(0, 0), self.size())
    }

    /// Check whether a tile lies inside the terrain.
    #[must_use]
    pub const fn contains(&self, point: Point) -> bool {
        point.x >= 0 && point.y >= 0 && point.x < self.width && point.y < self.height
    }

    #[inline]
    fn index(&self, point: Point) -> usize {
        (point.y as usize) * (self.width as usize) + (point.x as usize)
    }

    /// Check whether a tile can be walked on.
    ///
    /// The point must be in bounds; use
    /// [`is_walkable_and_within_bounds`](Self::is_walkable_and_within_bounds)
    /// for unchecked input.
    #[must_use]
    pub fn is_walkable(&self, point: Point) -> bool {
        debug_assert!(self.contains(point), "terrain query out of bounds: {point:?}");
        self.contains(point) && !self.blocked[self.index(point)]
    }

    /// Like [`is_walkable`](Self::is_walkable) but `false` outside the map.
    #[must_use]
    pub fn is_walkable_and_within_bounds(&self, point: Point) -> bool {
        self.contains(point) && !self.blocked[self.index(point)]
    }

    /// Check whether every tile of an in-bounds region is walkable.
    #[must_use]
    pub fn is_walkable_region(&self, region: &Region) -> bool {
        debug_assert!(
            region.is_empty() || region.intersection(&self.bounds()) == *region,
            "terrain region out of bounds: {region:?}"
        );
        region.points().all(|p| self.is_walkable_and_within_bounds(p))
    }

    /// Check whether every tile touched by a world-space rectangle is
    /// walkable. The rectangle is clamped to the terrain first.
    #[must_use]
    pub fn is_walkable_rect(&self, rect: &Rect) -> bool {
        let region = Region::from_bounds(
            floor_to_int(rect.min.x),
            floor_to_int(rect.min.y),
            ceil_to_int(rect.max.x),
            ceil_to_int(rect.max.y),
        )
        .intersection(&self.bounds());
        region.points().all(|p| !self.blocked[self.index(p)])
    }

    /// Number of walkable tiles.
    #[must_use]
    pub fn walkable_count(&self) -> usize {
        self.blocked.iter().filter(|b| !**b).count()
    }

    /// Encode as a compact binary snapshot.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).map_err(|e| GameError::Serialization(e.to_string()))
    }

    /// Decode a snapshot produced by [`to_bytes`](Self::to_bytes).
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let terrain: Self =
            bincode::deserialize(data).map_err(|e| GameError::Serialization(e.to_string()))?;
        if terrain.blocked.len() != (terrain.width.max(0) * terrain.height.max(0)) as usize {
            return Err(GameError::Serialization("terrain cell count mismatch".to_string()));
        }
        Ok(terrain)
    }
}

/// Simple deterministic RNG for terrain generation.
struct TerrainRng {
    state: u64,
}

impl TerrainRng {
    fn new(seed: u64) -> Self {
        Self {
            state: seed.wrapping_add(0x9E37_79B9_7F4A_7C15),
        }
    }

    fn next(&mut self) -> u64 {
        self.state = self.state.wrapping_mul(0x5DEE_CE66D).wrapping_add(11);
        self.state
    }

    fn next_f32(&mut self) -> f32 {
        ((self.next() >> 33) % 10_000) as f32 / 10_000.0
    }
}

/// Random values on a coarse lattice, bilinearly interpolated per tile.
struct NoiseField {
    spacing: i32,
    lattice_width: i32,
    lattice: Vec<f32>,
}

impl NoiseField {
    fn new(size: Size, spacing: i32, seed: u64) -> Self {
        let lattice_width = size.width / spacing + 2;
        let lattice_height = size.height / spacing + 2;
        let mut rng = TerrainRng::new(seed);
        let lattice = (0..lattice_width * lattice_height)
            .map(|_| rng.next_f32())
            .collect();
        Self {
            spacing,
            lattice_width,
            lattice,
        }
    }

    fn at(&self, lx: i32, ly: i32) -> f32 {
        self.lattice[(ly * self.lattice_width + lx) as usize]
    }

    fn sample(&self, point: Point) -> f32 {
        let (lx, ly) = (point.x / self.spacing, point.y / self.spacing);
        let fx = (point.x % self.spacing) as f32 / self.spacing as f32;
        let fy = (point.y % self.spacing) as f32 / self.spacing as f32;

        let top = self.at(lx, ly) * (1.0 - fx) + self.at(lx + 1, ly) * fx;
        let bottom = self.at(lx, ly + 1) * (1.0 - fx) + self.at(lx + 1, ly + 1) * fx;
        top * (1.0 - fy) + bottom * fy
    }
}
