//! Configuration and error types for p-stable LSH.
//!
//! This module defines the public configuration surface of the hashing core.
//! It is free of any I/O or environment-dependent behavior so that projection
//! families, hash values and collision probabilities are pure functions of
//! `(input, config)`.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default metric selector (L2, Gaussian projections).
pub const DEFAULT_METRIC_DIM: u32 = 2;
/// Default seed for the projection family.
pub const DEFAULT_SEED: u64 = 1;
/// Default number of projections per family.
pub const DEFAULT_NUM_PERM: usize = 1024;

/// Distance metric estimated by a projection family.
///
/// The metric picks the p-stable distribution the weights are drawn from
/// and the density used by the collision probability model.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Metric {
    /// Manhattan distance; weights are standard Cauchy (1-stable).
    L1,
    /// Euclidean distance; weights are standard Gaussian (2-stable).
    L2,
}

impl Metric {
    /// Resolve the `p` of an `L_p` metric into a [`Metric`].
    pub fn from_metric_dim(metric_dim: u32) -> Result<Self, PStableError> {
        match metric_dim {
            1 => Ok(Metric::L1),
            2 => Ok(Metric::L2),
            other => Err(PStableError::UnsupportedMetric { metric_dim: other }),
        }
    }

    /// The `p` of this `L_p` metric.
    pub fn metric_dim(self) -> u32 {
        match self {
            Metric::L1 => 1,
            Metric::L2 => 2,
        }
    }
}

impl TryFrom<u32> for Metric {
    type Error = PStableError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Metric::from_metric_dim(value)
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metric::L1 => f.write_str("L1"),
            Metric::L2 => f.write_str("L2"),
        }
    }
}

/// Configuration of a p-stable hasher.
///
/// Two hashers built from configs that agree on `seed`, `dim`, `metric_dim`
/// and `num_perm` (and `r`) hold value-identical projection families, so
/// their hash values can be compared without exchanging any projection data.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HasherConfig {
    /// Bucket width (size of the equi-width segments). Must be positive and finite.
    ///
    /// Larger values raise the collision probability at any given distance.
    pub r: f64,
    /// Dimensionality of the vectors to hash.
    pub dim: usize,
    /// The `p` of the `L_p` metric: `1` (Cauchy) or `2` (Gaussian).
    #[serde(default = "default_metric_dim")]
    pub metric_dim: u32,
    /// Seed of the random source the projection family is drawn from.
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Number of projections (hash functions) in the family.
    #[serde(default = "default_num_perm")]
    pub num_perm: usize,
    /// Generate projections and hash on the rayon pool.
    ///
    /// Output values are identical either way; this flag is therefore not
    /// part of the compatibility check between hashers.
    #[serde(default)]
    pub use_parallel: bool,
}

impl HasherConfig {
    /// Create a configuration for `dim`-dimensional vectors with bucket width `r`.
    ///
    /// Remaining fields take their defaults: L2 metric, seed 1, 1024 projections.
    pub fn new(r: f64, dim: usize) -> Self {
        Self {
            r,
            dim,
            metric_dim: DEFAULT_METRIC_DIM,
            seed: DEFAULT_SEED,
            num_perm: DEFAULT_NUM_PERM,
            use_parallel: false,
        }
    }

    /// Set the bucket width.
    pub fn with_r(mut self, r: f64) -> Self {
        self.r = r;
        self
    }

    /// Set the expected vector dimensionality.
    pub fn with_dim(mut self, dim: usize) -> Self {
        self.dim = dim;
        self
    }

    /// Set the metric selector (`1` for L1, `2` for L2).
    pub fn with_metric_dim(mut self, metric_dim: u32) -> Self {
        self.metric_dim = metric_dim;
        self
    }

    /// Set the metric from its typed form.
    pub fn with_metric(mut self, metric: Metric) -> Self {
        self.metric_dim = metric.metric_dim();
        self
    }

    /// Set the random seed for reproducible families.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the number of projections.
    /// More projections lower the variance of the similarity estimate.
    pub fn with_num_perm(mut self, num_perm: usize) -> Self {
        self.num_perm = num_perm;
        self
    }

    /// Enable or disable parallel generation and hashing.
    pub fn with_parallel(mut self, use_parallel: bool) -> Self {
        self.use_parallel = use_parallel;
        self
    }

    /// Resolve the metric selector.
    pub fn metric(&self) -> Result<Metric, PStableError> {
        Metric::from_metric_dim(self.metric_dim)
    }

    /// Validate configuration parameters.
    ///
    /// The metric is checked first so that an unsupported metric is reported
    /// before anything else about the config.
    pub fn validate(&self) -> Result<(), PStableError> {
        self.metric()?;
        if !(self.r.is_finite() && self.r > 0.0) {
            return Err(PStableError::InvalidBucketWidth { r: self.r });
        }
        if self.dim == 0 {
            return Err(PStableError::InvalidDimension { dim: self.dim });
        }
        if self.num_perm == 0 {
            return Err(PStableError::InvalidPermutationCount {
                num_perm: self.num_perm,
            });
        }
        Ok(())
    }

    /// Check that hash values produced under `self` and `other` are comparable.
    ///
    /// Checks run in a fixed order: seed, dimension, projection count, metric.
    pub fn check_compatible(&self, other: &HasherConfig) -> Result<(), PStableError> {
        if self.seed != other.seed {
            return Err(PStableError::SeedMismatch {
                left: self.seed,
                right: other.seed,
            });
        }
        if self.dim != other.dim {
            return Err(PStableError::DimensionMismatch {
                expected: self.dim,
                actual: other.dim,
            });
        }
        if self.num_perm != other.num_perm {
            return Err(PStableError::PermutationCountMismatch {
                left: self.num_perm,
                right: other.num_perm,
            });
        }
        if self.metric_dim != other.metric_dim {
            return Err(PStableError::MetricMismatch {
                left: self.metric_dim,
                right: other.metric_dim,
            });
        }
        Ok(())
    }
}

/// Budget for the adaptive quadrature behind the collision probability model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IntegrationConfig {
    /// Absolute error tolerance of the integral.
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
    /// Maximum number of bisections applied to any subinterval.
    #[serde(default = "default_max_depth")]
    pub max_depth: u32,
    /// Maximum number of integrand evaluations.
    #[serde(default = "default_max_evaluations")]
    pub max_evaluations: usize,
}

impl IntegrationConfig {
    /// Create a configuration with the default budget.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the absolute error tolerance.
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Set the maximum subdivision depth.
    pub fn with_max_depth(mut self, max_depth: u32) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Set the maximum number of integrand evaluations.
    pub fn with_max_evaluations(mut self, max_evaluations: usize) -> Self {
        self.max_evaluations = max_evaluations;
        self
    }

    /// Validate the integration budget.
    pub fn validate(&self) -> Result<(), PStableError> {
        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            return Err(PStableError::InvalidTolerance {
                tolerance: self.tolerance,
            });
        }
        Ok(())
    }
}

impl Default for IntegrationConfig {
    fn default() -> Self {
        Self {
            tolerance: default_tolerance(),
            max_depth: default_max_depth(),
            max_evaluations: default_max_evaluations(),
        }
    }
}

fn default_metric_dim() -> u32 {
    DEFAULT_METRIC_DIM
}
fn default_seed() -> u64 {
    DEFAULT_SEED
}
fn default_num_perm() -> usize {
    DEFAULT_NUM_PERM
}
fn default_tolerance() -> f64 {
    1.49e-8
}
fn default_max_depth() -> u32 {
    50
}
fn default_max_evaluations() -> usize {
    1_000_000
}

/// Errors returned by the p-stable hashing core.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PStableError {
    #[error("unsupported metric L{metric_dim}: only L1 and L2 are supported")]
    UnsupportedMetric { metric_dim: u32 },

    #[error("invalid config: r must be positive and finite (got {r})")]
    InvalidBucketWidth { r: f64 },

    #[error("invalid config: dim must be >= 1 (got {dim})")]
    InvalidDimension { dim: usize },

    #[error("invalid config: num_perm must be >= 1 (got {num_perm})")]
    InvalidPermutationCount { num_perm: usize },

    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("cannot compare hashers with different seeds ({left} vs {right})")]
    SeedMismatch { left: u64, right: u64 },

    #[error("cannot compare hashers with different numbers of projections ({left} vs {right})")]
    PermutationCountMismatch { left: usize, right: usize },

    #[error("cannot compare hashers with different metrics (L{left} vs L{right})")]
    MetricMismatch { left: u32, right: u32 },

    #[error("hasher has no hash values; call hash() first")]
    NotHashed,

    #[error("hash values length {actual} does not match num_perm {expected}")]
    HashLengthMismatch { expected: usize, actual: usize },

    #[error("invalid distance {distance}: must be positive and finite")]
    InvalidDistance { distance: f64 },

    #[error("invalid similarity {similarity}: must be a number")]
    InvalidSimilarity { similarity: f64 },

    #[error("invalid integration tolerance {tolerance}: must be positive and finite")]
    InvalidTolerance { tolerance: f64 },

    #[error("integration did not converge for distance {distance} after {evaluations} evaluations")]
    IntegrationFailed { distance: f64, evaluations: usize },

    #[error("no distance reaches collision probability {similarity}")]
    InversionFailed { similarity: f64 },
}
