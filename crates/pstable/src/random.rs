//! Seeded random source for projection families.
//!
//! All draws come from a ChaCha8 generator keyed by the config seed. The key
//! is split into independent 64-bit stream ids; projection `j` reads only
//! from stream `j`, so every projection has its own order-preserving
//! sub-stream and can be drawn on any thread without changing the result.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Cauchy, Distribution, StandardNormal};

/// Deterministic generator of normal, Cauchy and uniform draws.
#[derive(Debug, Clone)]
pub struct RandomSource {
    rng: ChaCha8Rng,
}

impl RandomSource {
    /// Create a source positioned at the start of stream 0 for `seed`.
    pub fn new(seed: u64) -> Self {
        Self::substream(seed, 0)
    }

    /// Create a source positioned at the start of stream `stream` for `seed`.
    pub fn substream(seed: u64, stream: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        rng.set_stream(stream);
        Self { rng }
    }

    /// Draw `n` standard normal values (mean 0, variance 1).
    pub fn draw_normal(&mut self, n: usize) -> Vec<f64> {
        (0..n)
            .map(|_| self.rng.sample::<f64, _>(StandardNormal))
            .collect()
    }

    /// Draw `n` standard Cauchy values (location 0, scale 1).
    pub fn draw_cauchy(&mut self, n: usize) -> Vec<f64> {
        let dist = standard_cauchy();
        (0..n).map(|_| dist.sample(&mut self.rng)).collect()
    }

    /// Draw one value uniformly from `[lo, hi)`.
    ///
    /// Panics unless `lo < hi` with a finite span; callers pass a validated
    /// bucket width.
    pub(crate) fn draw_uniform(&mut self, lo: f64, hi: f64) -> f64 {
        self.rng.gen_range(lo..hi)
    }
}

fn standard_cauchy() -> Cauchy<f64> {
    let Ok(dist) = Cauchy::new(0.0, 1.0) else {
        unreachable!("unit-scale Cauchy is always valid");
    };
    dist
}
