//! Seeded pseudo-random generator wrapper.
//!
//! Ported from `original_source/include/filament-sliding/RandomGenerator.hpp`,
//! which wraps `std::mt19937_64` seeded from a run-name string and
//! exposes `getGaussian`/`getBernoulli`/`getProbability`/`getUniform`/
//! `getUniformInteger`. We wrap `rand::rngs::StdRng` the same way so
//! that identical seeds reproduce byte-identical runs (L4).

use rand::distributions::{Bernoulli, Distribution};
use rand::{Rng, SeedableRng};
use rand_distr::Normal;

/// Wraps a single seeded PRNG stream. The core touches no other
/// source of randomness (spec §5: "no shared-resource access outside
/// the PRNG").
pub struct RandomGenerator {
    rng: rand::rngs::StdRng,
}

impl RandomGenerator {
    /// Seed from a run-name string, matching the original's
    /// string-seeded construction. Uses a simple FNV-1a hash to fold
    /// the string down to a `u64` seed.
    pub fn from_seed_str(seed: &str) -> Self {
        Self::from_u64(fnv1a(seed.as_bytes()))
    }

    pub fn from_u64(seed: u64) -> Self {
        RandomGenerator {
            rng: rand::rngs::StdRng::seed_from_u64(seed),
        }
    }

    /// Draw `N(mean, std_dev)`.
    pub fn gaussian(&mut self, mean: f64, std_dev: f64) -> f64 {
        let normal = Normal::new(mean, std_dev).expect("std_dev must be finite and non-negative");
        normal.sample(&mut self.rng)
    }

    /// Draw a Bernoulli trial with success probability `p`.
    pub fn bernoulli(&mut self, p: f64) -> bool {
        let dist = Bernoulli::new(p.clamp(0.0, 1.0)).expect("probability must be in [0, 1]");
        dist.sample(&mut self.rng)
    }

    /// Draw `U(0, 1)`, used for the Gillespie threshold resample.
    pub fn probability(&mut self) -> f64 {
        self.rng.gen_range(0.0..1.0)
    }

    /// Draw `U(lo, hi)`.
    pub fn uniform(&mut self, lo: f64, hi: f64) -> f64 {
        self.rng.gen_range(lo..hi)
    }

    /// Draw a uniform integer in `[lo, hi)`.
    pub fn uniform_integer(&mut self, lo: usize, hi: usize) -> usize {
        self.rng.gen_range(lo..hi)
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    const OFFSET: u64 = 0xcbf29ce484222325;
    const PRIME: u64 = 0x100000001b3;
    let mut hash = OFFSET;
    for &b in bytes {
        hash ^= b as u64;
        hash = hash.wrapping_mul(PRIME);
    }
    hash
}
