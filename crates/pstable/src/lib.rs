//! # p-stable Locality-Sensitive Hashing
//!
//! This crate maps real vectors to bucket indices with random projections
//! drawn from p-stable distributions, so that the probability of two vectors
//! sharing a bucket is a known, decreasing function of their L1 or L2
//! distance.
//!
//! ## Contract
//!
//! - Everything here is a pure function of `(input, config)`: no I/O, no
//!   clocks, no global random state.
//! - A [`ProjectionFamily`] is generated eagerly when a [`PStableHasher`] is
//!   built and never changes afterwards.
//!
//! Invariant: two hashers built from configs with the same seed, dimension,
//! metric, projection count and bucket width hold bit-identical families, so
//! their hash values are directly comparable.
//!
//! ## Core Pipeline
//!
//! 1.  **Projection family**: `num_perm` pairs `(w, b)`. `w` holds `dim`
//!     standard Cauchy (L1) or standard Gaussian (L2) draws and `b` is uniform
//!     in `[0, r)`. Projection `j` is drawn from sub-stream `j` of a ChaCha8
//!     generator keyed by the seed, which makes parallel generation
//!     reproducible.
//!
//! 2.  **Hashing**: `h_j(x) = floor((w_j . x + b_j) / r)` for every projection.
//!
//! 3.  **Similarity**: the fraction of indices at which two hashers' values
//!     agree, an unbiased estimate of the collision probability.
//!
//! 4.  **Collision model**: `p(c) = 2 * integral_0^r f(t/c) (1 - t/r) / c dt`,
//!     evaluated by adaptive Simpson quadrature under a bounded budget.
//!
//! ## Example Usage
//!
//! ```
//! use pstable::{collision_probability, estimate_similarity, HasherConfig, PStableHasher};
//!
//! let config = HasherConfig::new(4.0, 2).with_num_perm(256);
//!
//! let mut a = PStableHasher::new(config.clone()).unwrap();
//! let mut b = PStableHasher::new(config.clone()).unwrap();
//! a.hash(&[0.0, 0.0]).unwrap();
//! b.hash(&[0.0, 0.0]).unwrap();
//!
//! assert_eq!(estimate_similarity(&a, &b).unwrap(), 1.0);
//!
//! let p = collision_probability(&config, 1.0).unwrap();
//! assert!(p > 0.5 && p < 1.0);
//! ```
//!
pub mod config;
pub mod hasher;
pub mod probability;
pub mod projection;
pub mod random;
mod similarity;

pub use crate::config::{HasherConfig, IntegrationConfig, Metric, PStableError};
pub use crate::hasher::{HashValues, PStableHasher};
pub use crate::probability::{collision_probability, collision_probability_with, CollisionModel};
pub use crate::projection::{Projection, ProjectionFamily};
pub use crate::random::RandomSource;
pub use crate::similarity::{estimate_distance, estimate_similarity};

/// Current hashing algorithm version for this crate.
///
/// Bumped whenever a change can alter generated families or hash values.
pub const PSTABLE_VERSION: u16 = 1;

/// Human-readable algorithm identifier.
pub const PSTABLE_ALGORITHM: &str = "chacha8_stream_pstable_v1";
