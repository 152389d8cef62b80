//! Test fixtures and helpers.
//!
//! Pre-built worlds and unit definitions for consistent testing.

use fixed::types::I32F32;
use skirmish_core::config::UnitData;
use skirmish_core::faction::FactionId;
use skirmish_core::geometry::Size;
use skirmish_core::math::Vec2Fixed;
use skirmish_core::terrain::Terrain;
use skirmish_core::world::World;

/// First test faction.
pub const RED: FactionId = FactionId(0);
/// Second test faction.
pub const BLUE: FactionId = FactionId(1);

/// Create a fixed-point number from an integer.
#[must_use]
pub fn fixed(n: i32) -> I32F32 {
    I32F32::from_num(n)
}

/// Create a fixed-point number from a float (for tests only).
///
/// Note: In real simulation code, never use floats.
/// This is only for convenient test setup.
#[must_use]
pub fn fixed_f(n: f64) -> I32F32 {
    I32F32::from_num(n)
}

/// Position with integer coordinates.
#[must_use]
pub fn at(x: i32, y: i32) -> Vec2Fixed {
    Vec2Fixed::from_ints(x, y)
}

/// Single-tile ground unit with the given sight range.
#[must_use]
pub fn scout(sight: i32) -> UnitData {
    UnitData::ground("scout", fixed(sight))
}

/// Two-by-two building providing ten food.
#[must_use]
pub fn farm() -> UnitData {
    UnitData::building("farm", Size::new(2, 2), fixed(3), 10)
}

/// Open world of the given size with [`RED`] and [`BLUE`] registered.
///
/// # Panics
///
/// Panics if the size is not positive.
#[must_use]
pub fn two_faction_world(width: i32, height: i32) -> World {
    let mut world = World::new(Terrain::open(Size::new(width, height)), 8);
    world.add_faction(RED, "Red").expect("fresh faction id");
    world.add_faction(BLUE, "Blue").expect("fresh faction id");
    world
}

/// Fill a world with `count` scouts on distinct tiles, alternating between
/// [`RED`] and [`BLUE`]. Placement is deterministic for a given `seed`.
///
/// # Panics
///
/// Panics if the world has fewer free tiles than `count`.
pub fn scatter_scouts(world: &mut World, count: usize, sight: i32, seed: u64) {
    let size = world.size();
    let mut state = seed | 1;
    let mut placed = 0;
    let mut attempts = 0;
    while placed < count {
        assert!(attempts < count * 64, "world too crowded for {count} scouts");
        attempts += 1;
        // xorshift64
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        let x = (state % size.width as u64) as i32;
        let y = ((state >> 32) % size.height as u64) as i32;
        let faction = if placed % 2 == 0 { RED } else { BLUE };
        if world.spawn_unit(faction, scout(sight), at(x, y)).is_ok() {
            placed += 1;
        }
    }
    tracing::debug!(count, seed, "Scattered scouts");
}
