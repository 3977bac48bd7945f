//! Deterministic RNG utilities for reproducible tests.

use nalgebra::{Isometry3, Vector3};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rigkit_core::types::Guide;

/// Create a deterministic `ChaCha8Rng` from a seed.
///
/// All test randomization should go through this to ensure reproducibility.
pub fn seeded_rng(seed: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed)
}

/// Random rigid transform with translation in `[-extent, extent]` per axis
/// and a rotation of up to half a turn.
pub fn random_isometry(rng: &mut impl Rng, extent: f64) -> Isometry3<f64> {
    let t = Vector3::<f64>::from_fn(|_, _| rng.gen_range(-extent..=extent));
    let r = Vector3::<f64>::from_fn(|_, _| rng.gen_range(-1.5..=1.5));
    Isometry3::new(t, r)
}

/// Three guides named `names` with random placement. Consecutive guides are
/// at least `min_segment` apart.
pub fn random_guides(rng: &mut impl Rng, names: [&str; 3], min_segment: f64) -> Vec<Guide> {
    let mut guides: Vec<Guide> = Vec::with_capacity(3);
    for name in names {
        let mut world = random_isometry(rng, 20.0);
        if let Some(previous) = guides.last() {
            let dir = Vector3::<f64>::from_fn(|_, _| rng.gen_range(-1.0..=1.0))
                .try_normalize(1e-6)
                .unwrap_or_else(Vector3::x);
            let len = rng.gen_range(min_segment..=min_segment * 4.0);
            world.translation.vector = previous.world.translation.vector + dir * len;
        }
        guides.push(Guide::new(name, world));
    }
    guides
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
