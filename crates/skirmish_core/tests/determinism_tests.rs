//! Identical setups and behaviors must produce identical worlds.

use skirmish_core::entity::{grid_region_at, CollisionLayer};
use skirmish_core::geometry::Size;
use skirmish_core::math::{Fixed, Vec2Fixed};
use skirmish_core::world::World;
use skirmish_test_utils::determinism::{find_first_divergence, verify_determinism, world_hash};
use skirmish_test_utils::fixtures::{scatter_scouts, two_faction_world, RED};

fn setup() -> World {
    let mut world = two_faction_world(48, 48);
    scatter_scouts(&mut world, 60, 4, 0x5eed);
    world
}

/// Every unit drifts diagonally and wraps at the map edge; every fifth
/// handle dies once it passes the centre. Moves onto taken tiles wait.
fn drift(world: &mut World) {
    let size = Fixed::from_num(47);
    world
        .tick(Fixed::ONE, |entities, handle, step| {
            let Some(position) = entities.from_handle(handle).map(|e| e.position()) else {
                return Ok(());
            };
            if handle.raw() % 5 == 0 && position.x > size / Fixed::from_num(2) {
                return entities.kill(handle);
            }
            let mut next = position + Vec2Fixed::new(step, step / Fixed::from_num(2));
            if next.x > size {
                next.x = Fixed::ZERO;
            }
            if next.y > size {
                next.y = Fixed::ZERO;
            }
            let region = grid_region_at(next, Size::ONE);
            if entities.is_free(&region, CollisionLayer::Ground) {
                entities.move_entity(handle, next)
            } else {
                Ok(())
            }
        })
        .unwrap();
}

#[test]
fn test_world_is_deterministic() {
    verify_determinism(3, 40, setup, drift, world_hash).assert_deterministic();
}

#[test]
fn test_no_divergence() {
    assert_eq!(find_first_divergence(setup, drift, 25), None);
}

#[test]
fn test_different_seeds_differ() {
    let mut other = two_faction_world(48, 48);
    scatter_scouts(&mut other, 60, 4, 0xbeef);
    assert_ne!(world_hash(&setup()), world_hash(&other));
    assert!(setup().factions().get(RED).unwrap().entity_count() > 0);
}
