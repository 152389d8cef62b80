//! Proptest strategies for spatial and visibility properties.

use proptest::prelude::*;
use skirmish_core::geometry::{Rect, Size};
use skirmish_core::math::{Fixed, Vec2Fixed};

/// World size every strategy here targets.
pub const WORLD: Size = Size::new(40, 40);

/// A fixed-point coordinate on a quarter-tile lattice in `[0, max)`.
pub fn arb_coord(max: i32) -> impl Strategy<Value = Fixed> {
    (0..max * 4).prop_map(|q| Fixed::from_num(q) / Fixed::from_num(4))
}

/// A position whose `size` footprint stays inside [`WORLD`].
pub fn arb_position(size: Size) -> impl Strategy<Value = Vec2Fixed> {
    (
        arb_coord(WORLD.width - size.width),
        arb_coord(WORLD.height - size.height),
    )
        .prop_map(|(x, y)| Vec2Fixed::new(x, y))
}

/// Entity footprint between 1x1 and 3x3 tiles.
pub fn arb_size() -> impl Strategy<Value = Size> {
    (1..=3, 1..=3).prop_map(|(w, h)| Size::new(w, h))
}

/// A non-empty query rectangle inside [`WORLD`], possibly touching zone
/// borders exactly.
pub fn arb_rect() -> impl Strategy<Value = Rect> {
    (arb_coord(WORLD.width), arb_coord(WORLD.height), 1..20i32, 1..20i32).prop_map(
        |(x, y, w, h)| {
            let min = Vec2Fixed::new(x, y);
            Rect::new(min, min + Vec2Fixed::from_ints(w, h))
        },
    )
}

/// One structural operation against an entity manager. Indices refer to
/// previously spawned entities modulo their count.
#[derive(Debug, Clone)]
pub enum Op {
    /// Create a resource node of `size` at `position`.
    Spawn {
        /// Top-left corner.
        position: Vec2Fixed,
        /// Footprint.
        size: Size,
    },
    /// Move a spawned entity.
    Move {
        /// Entity index.
        index: usize,
        /// Destination.
        position: Vec2Fixed,
    },
    /// Remove a spawned entity.
    Remove {
        /// Entity index.
        index: usize,
    },
}

/// A single [`Op`].
pub fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => arb_size().prop_flat_map(|size| arb_position(size).prop_map(move |position| Op::Spawn { position, size })),
        4 => (any::<usize>(), arb_position(Size::new(3, 3))).prop_map(|(index, position)| Op::Move { index, position }),
        1 => any::<usize>().prop_map(|index| Op::Remove { index }),
    ]
}

/// A sequence of up to `max_len` operations.
pub fn arb_ops(max_len: usize) -> impl Strategy<Value = Vec<Op>> {
    prop::collection::vec(arb_op(), 1..max_len)
}

/// A walk of unit steps: each element is `(dx, dy)` in `-1..=1`.
pub fn arb_walk(max_len: usize) -> impl Strategy<Value = Vec<(i32, i32)>> {
    prop::collection::vec((-1..=1i32, -1..=1i32), 1..max_len)
}
