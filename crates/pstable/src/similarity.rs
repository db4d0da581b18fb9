//! Empirical collision rate between two hashed vectors.

use crate::config::PStableError;
use crate::hasher::PStableHasher;
use crate::probability::CollisionModel;

/// Fraction of projections under which `a` and `b` fall into the same bucket.
///
/// This is an unbiased estimate of the collision probability at the (unknown)
/// distance between the two hashed vectors. The configs are checked for
/// compatibility first (seed, dimension, projection count, metric), then both
/// hashers must hold hash values.
pub fn estimate_similarity(a: &PStableHasher, b: &PStableHasher) -> Result<f64, PStableError> {
    a.config().check_compatible(b.config())?;
    let (Some(left), Some(right)) = (a.hash_values(), b.hash_values()) else {
        return Err(PStableError::NotHashed);
    };
    Ok(left.collisions(right) as f64 / a.config().num_perm as f64)
}

/// Estimate the `L_p` distance between the vectors hashed by `a` and `b` by
/// inverting the collision probability model at the empirical collision rate.
pub fn estimate_distance(a: &PStableHasher, b: &PStableHasher) -> Result<f64, PStableError> {
    let similarity = estimate_similarity(a, b)?;
    CollisionModel::from_config(a.config())?.distance_for_similarity(similarity)
}

impl PStableHasher {
    /// See [`estimate_similarity`].
    pub fn similarity(&self, other: &PStableHasher) -> Result<f64, PStableError> {
        estimate_similarity(self, other)
    }
}
