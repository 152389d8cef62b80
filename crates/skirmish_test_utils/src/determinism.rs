//! Determinism testing utilities.
//!
//! Lockstep clients only stay in sync if the same command stream produces
//! bit-identical worlds. The helpers here run a scenario several times and
//! compare a hash of the resulting state: entity positions, liveness and
//! every faction's fog of war.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use skirmish_core::world::World;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Final state hash of each run.
    pub hashes: Vec<u64>,
    /// Number of ticks simulated per run.
    pub ticks: u64,
}

impl DeterminismResult {
    /// Whether every run ended in the same state.
    #[must_use]
    pub fn is_deterministic(&self) -> bool {
        self.hashes.windows(2).all(|w| w[0] == w[1])
    }

    /// Assert that all runs matched.
    ///
    /// # Panics
    ///
    /// Panics if the runs produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic() {
            let mut unique = self.hashes.clone();
            unique.sort_unstable();
            unique.dedup();
            panic!(
                "World is non-deterministic!\n\
                 Runs: {}\n\
                 Ticks: {}\n\
                 Unique hashes: {} (expected 1)",
                self.hashes.len(),
                self.ticks,
                unique.len(),
            );
        }
    }
}

/// Run a scenario `runs` times for `ticks` ticks each and collect the final
/// state hashes.
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    ticks: u64,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S),
    HashFn: Fn(&S) -> u64,
{
    let hashes = (0..runs)
        .map(|_| {
            let mut state = setup();
            for _ in 0..ticks {
                step(&mut state);
            }
            hash(&state)
        })
        .collect();
    DeterminismResult { hashes, ticks }
}

/// Compare two runs tick by tick.
///
/// Returns the first tick after which the worlds differ, or `None`.
pub fn find_first_divergence<Setup, Step>(setup: Setup, step: Step, ticks: u64) -> Option<u64>
where
    Setup: Fn() -> World,
    Step: Fn(&mut World),
{
    let mut a = setup();
    let mut b = setup();
    if world_hash(&a) != world_hash(&b) {
        return Some(0);
    }
    (1..=ticks).find(|_| {
        step(&mut a);
        step(&mut b);
        world_hash(&a) != world_hash(&b)
    })
}

/// Hash of everything observable about a world.
///
/// # Panics
///
/// Panics if a fog snapshot cannot be encoded.
#[must_use]
pub fn world_hash(world: &World) -> u64 {
    let mut hasher = DefaultHasher::new();
    world.tick_count().hash(&mut hasher);
    for entity in world.entities().iter() {
        entity.handle().hash(&mut hasher);
        entity.position().hash(&mut hasher);
        entity.is_alive().hash(&mut hasher);
    }
    for faction in world.factions().iter() {
        faction.id().hash(&mut hasher);
        faction.is_defeated().hash(&mut hasher);
        faction
            .fog()
            .to_bytes()
            .expect("fog snapshot encodes")
            .hash(&mut hasher);
    }
    hasher.finish()
}
