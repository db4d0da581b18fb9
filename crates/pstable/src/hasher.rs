//! Hasher and hash value types for p-stable LSH.
//!
//! A [`PStableHasher`] owns one projection family and at most one current
//! set of [`HashValues`]. The family is generated eagerly at construction and
//! never changes; hash values are replaced by every call to
//! [`PStableHasher::hash`].

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::{HasherConfig, Metric, PStableError};
use crate::projection::ProjectionFamily;

/// Bucket indices of one vector, one per projection, in projection order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct HashValues(Vec<i64>);

impl HashValues {
    pub fn new(values: Vec<i64>) -> Self {
        Self(values)
    }

    pub fn as_slice(&self) -> &[i64] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<i64> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of indices at which `self` and `other` hold the same bucket.
    pub fn collisions(&self, other: &HashValues) -> usize {
        self.0
            .iter()
            .zip(other.0.iter())
            .filter(|(a, b)| a == b)
            .count()
    }
}

impl From<Vec<i64>> for HashValues {
    fn from(values: Vec<i64>) -> Self {
        Self(values)
    }
}

impl AsRef<[i64]> for HashValues {
    fn as_ref(&self) -> &[i64] {
        &self.0
    }
}

/// p-stable LSH hasher: a projection family plus the hash values of the
/// last vector hashed.
#[derive(Debug, Clone)]
pub struct PStableHasher {
    config: HasherConfig,
    family: ProjectionFamily,
    hash_values: Option<HashValues>,
}

impl PStableHasher {
    /// Build a hasher and generate its projection family.
    ///
    /// Fails with [`PStableError::UnsupportedMetric`] for a `metric_dim`
    /// other than 1 or 2, or with a validation error for a degenerate config.
    pub fn new(config: HasherConfig) -> Result<Self, PStableError> {
        let family = ProjectionFamily::generate(&config)?;
        Ok(Self {
            config,
            family,
            hash_values: None,
        })
    }

    /// Build a hasher that starts out holding `values`, e.g. the state of
    /// another hasher built from the same config.
    pub fn with_hash_values(
        config: HasherConfig,
        values: impl Into<HashValues>,
    ) -> Result<Self, PStableError> {
        let values = values.into();
        let mut hasher = Self::new(config)?;
        if values.len() != hasher.config.num_perm {
            return Err(PStableError::HashLengthMismatch {
                expected: hasher.config.num_perm,
                actual: values.len(),
            });
        }
        hasher.hash_values = Some(values);
        Ok(hasher)
    }

    pub fn config(&self) -> &HasherConfig {
        &self.config
    }

    pub fn metric(&self) -> Metric {
        self.family.metric()
    }

    pub fn family(&self) -> &ProjectionFamily {
        &self.family
    }

    /// Current hash values, if [`hash`](Self::hash) has been called.
    pub fn hash_values(&self) -> Option<&HashValues> {
        self.hash_values.as_ref()
    }

    pub fn is_hashed(&self) -> bool {
        self.hash_values.is_some()
    }

    /// Number of hash values currently held (0 before the first hash).
    pub fn len(&self) -> usize {
        self.hash_values.as_ref().map_or(0, HashValues::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop the current hash values.
    pub fn clear(&mut self) {
        self.hash_values = None;
    }

    /// Hash `x` and store the result as the current hash values.
    ///
    /// Any previous hash values are replaced. The projection family is not
    /// modified.
    pub fn hash(&mut self, x: &[f64]) -> Result<&HashValues, PStableError> {
        let values = self.compute(x)?;
        Ok(&*self.hash_values.insert(values))
    }

    /// Hash `x` without touching the stored hash values.
    pub fn compute(&self, x: &[f64]) -> Result<HashValues, PStableError> {
        if x.len() != self.config.dim {
            return Err(PStableError::DimensionMismatch {
                expected: self.config.dim,
                actual: x.len(),
            });
        }
        Ok(HashValues(
            self.family.buckets(x, self.config.use_parallel),
        ))
    }

    /// Hash every vector of `vectors` with this hasher's family, in input order.
    ///
    /// Stored hash values are untouched. Every vector is checked before any
    /// is hashed, so a dimension error leaves no partial work behind.
    pub fn hash_batch<V>(&self, vectors: &[V]) -> Result<Vec<HashValues>, PStableError>
    where
        V: AsRef<[f64]> + Sync,
    {
        if let Some(bad) = vectors
            .iter()
            .map(AsRef::as_ref)
            .find(|v| v.len() != self.config.dim)
        {
            return Err(PStableError::DimensionMismatch {
                expected: self.config.dim,
                actual: bad.len(),
            });
        }

        let mut result = Vec::with_capacity(vectors.len());
        if self.config.use_parallel {
            vectors
                .par_iter()
                .map(|v| HashValues(self.family.buckets(v.as_ref(), false)))
                .collect_into_vec(&mut result);
        } else {
            result.extend(
                vectors
                    .iter()
                    .map(|v| HashValues(self.family.buckets(v.as_ref(), false))),
            );
        }
        Ok(result)
    }
}
