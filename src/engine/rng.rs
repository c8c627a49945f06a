//! Deterministic random number generation.
//!
//! Implements PCG (Permuted Congruential Generator) with partitioned seeds
//! so every noise draw and donor choice comes from an explicitly threaded
//! handle rather than global state.
//!
//! # Reproducibility Guarantee
//!
//! Given the same master seed, all random number sequences are
//! bitwise-identical across runs and platforms. Partitioned streams stay
//! independent of each other, so per-particle noise can be drawn in any
//! order without changing the result.

use rand::prelude::*;
use rand_pcg::Pcg64;
use serde::{Deserialize, Serialize};

/// Deterministic, reproducible random number generator.
///
/// Based on PCG which provides excellent statistical properties, fast
/// generation, predictable sequences from seed, and independent streams
/// via partitioning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimRng {
    /// Master seed for reproducibility.
    master_seed: u64,
    /// Current stream index for partitioning.
    stream: u64,
    /// Internal PCG state.
    rng: Pcg64,
}

impl SimRng {
    /// Create a new RNG with the given master seed.
    #[must_use]
    pub fn new(master_seed: u64) -> Self {
        let rng = Pcg64::seed_from_u64(master_seed);
        Self {
            master_seed,
            stream: 0,
            rng,
        }
    }

    /// Get the master seed.
    #[must_use]
    pub const fn master_seed(&self) -> u64 {
        self.master_seed
    }

    /// Create partitioned RNGs, one per ensemble member.
    ///
    /// Each partition gets an independent stream derived from the master
    /// seed, ensuring reproducibility regardless of the order in which
    /// particles consume noise.
    #[must_use]
    pub fn partition(&mut self, n: usize) -> Vec<Self> {
        let partitions: Vec<Self> = (0..n)
            .map(|i| {
                let stream = self.stream + i as u64;
                let seed = self
                    .master_seed
                    .wrapping_add(stream.wrapping_mul(0x9E37_79B9_7F4A_7C15));
                Self {
                    master_seed: self.master_seed,
                    stream,
                    rng: Pcg64::seed_from_u64(seed),
                }
            })
            .collect();

        self.stream += n as u64;
        partitions
    }

    /// Generate a random f64 in [0, 1).
    pub fn gen_f64(&mut self) -> f64 {
        self.rng.gen()
    }

    /// Choose a uniform random index in `0..n`.
    ///
    /// # Panics
    ///
    /// Panics if `n == 0`.
    pub fn choose_index(&mut self, n: usize) -> usize {
        assert!(n > 0, "cannot choose from an empty range");
        self.rng.gen_range(0..n)
    }

    /// Generate a standard normal sample using the Box-Muller transform.
    pub fn gen_standard_normal(&mut self) -> f64 {
        let u1 = self.gen_f64();
        let u2 = self.gen_f64();

        // Avoid log(0)
        let u1 = if u1 < f64::EPSILON { f64::EPSILON } else { u1 };

        (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
    }

    /// Generate `n` Brownian increments for a timestep `dt`.
    ///
    /// Each increment is drawn i.i.d. from N(0, dt), i.e. the distribution
    /// of `W(t + dt) - W(t)` for a standard Wiener process.
    #[must_use]
    pub fn brownian_increments(&mut self, n: usize, dt: f64) -> Vec<f64> {
        let scale = dt.sqrt();
        (0..n).map(|_| scale * self.gen_standard_normal()).collect()
    }
}
