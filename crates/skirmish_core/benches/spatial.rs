//! Spatial index and tick benchmarks for skirmish_core.
//!
//! Run with: `cargo bench -p skirmish_core`

// Benchmark binaries don't need docs on macro-generated functions
#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use skirmish_core::entity::{grid_region_at, CollisionLayer};
use skirmish_core::geometry::{Circle, Rect, Size};
use skirmish_core::math::{Fixed, Vec2Fixed};
use skirmish_core::world::World;
use skirmish_test_utils::fixtures::{at, fixed, scatter_scouts, two_faction_world};

fn populated(units: usize) -> World {
    let mut world = two_faction_world(128, 128);
    scatter_scouts(&mut world, units, 6, 42);
    world
}

/// Zone queries against a populated world.
pub fn query_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("zone_queries");
    for units in [100, 1000] {
        let world = populated(units);
        let rect = Rect::new(at(40, 40), at(72, 64));
        let circle = Circle::new(at(64, 64), fixed(10));

        group.bench_with_input(BenchmarkId::new("rect", units), &world, |b, world| {
            b.iter(|| black_box(world.entities().intersecting_rect(black_box(&rect))));
        });
        group.bench_with_input(BenchmarkId::new("circle", units), &world, |b, world| {
            b.iter(|| black_box(world.entities().intersecting_circle(black_box(&circle))));
        });
        group.bench_with_input(BenchmarkId::new("point", units), &world, |b, world| {
            b.iter(|| black_box(world.entities().intersecting_point(at(64, 64)).count()));
        });
    }
    group.finish();
}

/// Full ticks where every unit walks one tile, updating zones and fog.
pub fn tick_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("tick");
    for units in [100, 1000] {
        group.bench_function(BenchmarkId::new("walk", units), |b| {
            let mut world = populated(units);
            let mut direction = 1;
            b.iter(|| {
                direction = -direction;
                world
                    .tick(Fixed::ONE, |entities, handle, step| {
                        let Some(position) = entities.from_handle(handle).map(|e| e.position()) else {
                            return Ok(());
                        };
                        let next = position + Vec2Fixed::new(step * Fixed::from_num(direction), Fixed::ZERO);
                        let region = grid_region_at(next, Size::ONE);
                        if entities.is_free(&region, CollisionLayer::Ground) {
                            entities.move_entity(handle, next)
                        } else {
                            Ok(())
                        }
                    })
                    .unwrap();
            });
        });
    }
    group.finish();
}

criterion_group!(benches, query_benchmark, tick_benchmark);
criterion_main!(benches);
