//! Seed derivation for the per-layer noise generators and crater placement.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Derive the 32-bit seed of one noise layer from the planet seed.
///
/// Each layer uses a different `salt`, so continents, mountains and bumps
/// never sample correlated noise even though they share a planet seed.
#[must_use]
pub fn derive_layer_seed(planet_seed: u64, salt: &str) -> u32 {
    let mut hasher = DefaultHasher::new();
    planet_seed.hash(&mut hasher);
    salt.hash(&mut hasher);
    let h = hasher.finish();
    (h ^ (h >> 32)) as u32
}

/// Deterministic RNG stream for a planet.
///
/// The same `(planet_seed, stream)` pair yields the same sequence on every
/// thread, which keeps worker-built geometry identical to main-thread samples.
#[must_use]
pub fn planet_rng(planet_seed: u64, stream: &str) -> ChaCha8Rng {
    let mut hasher = DefaultHasher::new();
    planet_seed.hash(&mut hasher);
    stream.hash(&mut hasher);
    ChaCha8Rng::seed_from_u64(hasher.finish())
}
