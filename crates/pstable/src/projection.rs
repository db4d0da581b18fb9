//! Projection family generation for p-stable LSH.
//!
//! A family holds `num_perm` random projections `(w, b)`. Weights are drawn
//! from a p-stable distribution (Cauchy for L1, Gaussian for L2) and offsets
//! uniformly from `[0, r)`. Projection `j` draws its offset first and then
//! its `dim` weights, all from sub-stream `j` of the seeded random source.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::{HasherConfig, Metric, PStableError};
use crate::random::RandomSource;

/// One random projection: a weight vector and an offset.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Projection {
    /// Weight vector, `dim` entries drawn from the metric's distribution.
    pub weights: Vec<f64>,
    /// Offset drawn uniformly from `[0, r)`.
    pub offset: f64,
}

impl Projection {
    /// Bucket index of `x` under this projection: `floor((w . x + b) / r)`.
    ///
    /// `x` must have the same length as the weights.
    #[inline]
    pub fn bucket(&self, x: &[f64], r: f64) -> i64 {
        let dot: f64 = self.weights.iter().zip(x).map(|(w, v)| w * v).sum();
        // `as` saturates at the i64 bounds and maps NaN to 0.
        ((dot + self.offset) / r).floor() as i64
    }
}

/// Immutable, ordered set of projections shared by every `hash()` call of a hasher.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectionFamily {
    metric: Metric,
    r: f64,
    dim: usize,
    projections: Vec<Projection>,
}

impl ProjectionFamily {
    /// Generate the family described by `cfg` (parallel if `cfg.use_parallel = true`).
    ///
    /// The config is validated before any draw is made.
    pub fn generate(cfg: &HasherConfig) -> Result<Self, PStableError> {
        cfg.validate()?;
        let metric = cfg.metric()?;

        let mut projections = Vec::with_capacity(cfg.num_perm);
        if cfg.use_parallel {
            (0..cfg.num_perm)
                .into_par_iter()
                .map(|j| draw_projection(cfg, metric, j))
                .collect_into_vec(&mut projections);
        } else {
            for j in 0..cfg.num_perm {
                projections.push(draw_projection(cfg, metric, j));
            }
        }

        Ok(Self {
            metric,
            r: cfg.r,
            dim: cfg.dim,
            projections,
        })
    }

    pub fn metric(&self) -> Metric {
        self.metric
    }

    /// Bucket width shared by every projection.
    pub fn r(&self) -> f64 {
        self.r
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Number of projections in the family.
    pub fn len(&self) -> usize {
        self.projections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.projections.is_empty()
    }

    pub fn projections(&self) -> &[Projection] {
        &self.projections
    }

    /// Bucket indices of `x` under every projection, in projection order.
    ///
    /// Callers check the dimension; see [`crate::PStableHasher::compute`].
    pub(crate) fn buckets(&self, x: &[f64], parallel: bool) -> Vec<i64> {
        let mut result = Vec::with_capacity(self.projections.len());
        if parallel {
            self.projections
                .par_iter()
                .map(|p| p.bucket(x, self.r))
                .collect_into_vec(&mut result);
        } else {
            result.extend(self.projections.iter().map(|p| p.bucket(x, self.r)));
        }
        result
    }
}

/// Draws projection `j` from its own sub-stream: the offset, then the weights.
pub(crate) fn draw_projection(cfg: &HasherConfig, metric: Metric, j: usize) -> Projection {
    let mut source = RandomSource::substream(cfg.seed, j as u64);
    let offset = source.draw_uniform(0.0, cfg.r);
    let weights = match metric {
        Metric::L1 => source.draw_cauchy(cfg.dim),
        Metric::L2 => source.draw_normal(cfg.dim),
    };
    Projection { weights, offset }
}
